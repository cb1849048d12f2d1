//! Name to template lookup for cross-template calls.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::Template;

/// Immutable-once-shared mapping from names to compiled templates.
///
/// Built with [`register`](Self::register), then frozen behind an `Arc`.
/// Templates that call by name hold a `Weak` back-reference, so the caller
/// owns the registry's lifetime.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: FxHashMap<String, Arc<Template>>,
    order: Vec<String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template.
    pub fn register(&mut self, name: impl Into<String>, template: Arc<Template>) {
        let name = name.into();
        if self.templates.insert(name.clone(), template).is_none() {
            self.order.push(name);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
