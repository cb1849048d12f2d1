//! Execution context.
//!
//! Per-invocation mutable state bound to exactly one [`Template`]: one value
//! per slot, the operation target used by `exec`, an optional debug trigger,
//! and a cache of sub-contexts keyed by call site.
//!
//! A context is single-owner. Rendering one template from many threads means
//! one context per thread; the template itself is shared.

use std::fmt;
use std::sync::Arc;

use otx_ir::{CallSiteId, SlotId, SlotMap, Template, TemplateId, Value};

/// Failure to bind a value into a context.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("template `{template}` has no parameter or variable `{name}`")]
    UnknownParameter { template: String, name: String },
    #[error("slot {slot} is out of range for template `{template}`")]
    SlotOutOfRange { template: String, slot: u32 },
}

/// What a `<:debug...>` instruction reports to its trigger.
#[derive(Debug)]
pub struct DebugEvent<'a> {
    pub template: &'a str,
    /// Instruction index of the debug marker.
    pub index: usize,
    pub value: Option<&'a Value>,
    pub compare: Option<&'a str>,
}

/// Development hook fired by `<:debug...>` instructions.
///
/// Carried by the context rather than held globally, so two renders can
/// debug independently.
#[derive(Clone)]
pub struct DebugTrigger(Arc<dyn Fn(&DebugEvent<'_>) + Send + Sync>);

impl DebugTrigger {
    pub fn new(f: impl Fn(&DebugEvent<'_>) + Send + Sync + 'static) -> Self {
        DebugTrigger(Arc::new(f))
    }

    pub(crate) fn fire(&self, event: &DebugEvent<'_>) {
        (self.0)(event);
    }
}

impl fmt::Debug for DebugTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DebugTrigger(..)")
    }
}

/// Mutable state for one invocation of one template.
#[derive(Debug)]
pub struct Context {
    template: TemplateId,
    name: Arc<str>,
    slot_map: Arc<SlotMap>,
    values: Vec<Value>,
    /// Lazily created, indexed by `CallSiteId`.
    sub_contexts: Vec<Option<Box<Context>>>,
    target: Value,
    debug: Option<DebugTrigger>,
}

impl Context {
    /// A fresh context for `template`: every slot null, no cached sub-contexts.
    pub fn new(template: &Template) -> Self {
        Context {
            template: template.id(),
            name: Arc::from(template.name()),
            slot_map: Arc::clone(template.slots()),
            values: vec![Value::Null; template.slot_count()],
            sub_contexts: std::iter::repeat_with(|| None)
                .take(template.call_site_count())
                .collect(),
            target: Value::Null,
            debug: None,
        }
    }

    /// Id of the template this context was created for.
    #[inline]
    pub fn template_id(&self) -> TemplateId {
        self.template
    }

    pub fn is_for(&self, template: &Template) -> bool {
        self.template == template.id()
    }

    pub fn set_slot(&mut self, slot: SlotId, value: impl Into<Value>) -> Result<(), ContextError> {
        match self.values.get_mut(slot.index()) {
            Some(cell) => {
                *cell = value.into();
                Ok(())
            }
            None => Err(ContextError::SlotOutOfRange {
                template: self.name.to_string(),
                slot: slot.raw(),
            }),
        }
    }

    /// Bind by name: a parameter, loop variable or `set` target.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ContextError> {
        let Some(slot) = self.slot_map.lookup(name) else {
            return Err(ContextError::UnknownParameter {
                template: self.name.to_string(),
                name: name.to_string(),
            });
        };
        self.set_slot(slot, value)
    }

    /// Chaining form of [`set`](Self::set).
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, ContextError> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn slot(&self, slot: SlotId) -> Option<&Value> {
        self.values.get(slot.index())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slot_map.lookup(name).and_then(|slot| self.slot(slot))
    }

    /// Receiver for `exec` instructions (and `this` in data paths).
    pub fn bind_operation_target(&mut self, target: impl Into<Value>) {
        self.target = target.into();
    }

    pub fn operation_target(&self) -> &Value {
        &self.target
    }

    pub fn set_debug_trigger(&mut self, trigger: DebugTrigger) {
        self.debug = Some(trigger);
    }

    pub fn clear_debug_trigger(&mut self) {
        self.debug = None;
    }

    pub(crate) fn debug_trigger(&self) -> Option<&DebugTrigger> {
        self.debug.as_ref()
    }

    /// Clear every slot and drop cached sub-contexts. The operation target
    /// and debug trigger stay bound.
    pub fn reset(&mut self) {
        self.clear_slots();
        self.sub_contexts.iter_mut().for_each(|sub| *sub = None);
    }

    fn clear_slots(&mut self) {
        self.values.iter_mut().for_each(|v| *v = Value::Null);
    }

    /// Slot ids come from the owning template, so they are always in range.
    pub(crate) fn store(&mut self, slot: SlotId, value: Value) {
        if let Some(cell) = self.values.get_mut(slot.index()) {
            *cell = value;
        }
    }

    /// The cached context for call site `site`, ready for argument binding.
    ///
    /// Created on first use and recreated when the site's callee changes
    /// (dynamic targets). Slots are cleared on every call; the caller's
    /// operation target and debug trigger are inherited.
    pub(crate) fn sub_context(&mut self, site: CallSiteId, callee: &Template) -> &mut Context {
        let index = site.index();
        if index >= self.sub_contexts.len() {
            self.sub_contexts.resize_with(index + 1, || None);
        }
        let target = self.target.clone();
        let debug = self.debug.clone();

        let cached = &mut self.sub_contexts[index];
        if cached.as_ref().is_some_and(|sub| sub.template == callee.id()) {
            if let Some(sub) = cached.as_mut() {
                sub.clear_slots();
            }
        } else {
            *cached = None;
        }
        let sub = cached.get_or_insert_with(|| Box::new(Context::new(callee)));
        sub.target = target;
        sub.debug = debug;
        sub
    }
}
