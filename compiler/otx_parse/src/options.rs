//! Compilation options.

use std::sync::{Arc, Weak};

use otx_ir::{OperationTable, TemplateRegistry, Value};
use rustc_hash::{FxHashMap, FxHashSet};

/// Everything a template is compiled against besides its own source.
///
/// Built with chained setters:
///
/// ```text
/// let options = CompileOptions::new()
///     .params(["title", "rows"])
///     .constant("VERSION", "1.2")
///     .registry(&registry);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CompileOptions<'a> {
    pub(crate) params: Vec<String>,
    pub(crate) constants: FxHashMap<String, Value>,
    pub(crate) registry: Option<&'a TemplateRegistry>,
    pub(crate) runtime_registry: Option<Weak<TemplateRegistry>>,
    pub(crate) forward_names: FxHashSet<String>,
    pub(crate) operations: Option<Arc<OperationTable>>,
}

impl<'a> CompileOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared parameter names; they take the first slots in this order.
    #[must_use]
    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// A named compile-time constant.
    #[must_use]
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    /// Replace the whole constant table.
    #[must_use]
    pub fn constants(mut self, constants: FxHashMap<String, Value>) -> Self {
        self.constants = constants;
        self
    }

    /// Already-compiled templates that `call` can bind to statically.
    #[must_use]
    pub fn registry(mut self, registry: &'a TemplateRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Registry used to resolve `call` targets by name at run time.
    #[must_use]
    pub fn runtime_registry(mut self, registry: Weak<TemplateRegistry>) -> Self {
        self.runtime_registry = Some(registry);
        self
    }

    /// Template names that will exist in the run-time registry.
    #[must_use]
    pub fn forward_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forward_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Host operations reachable from `exec`.
    #[must_use]
    pub fn operations(mut self, operations: Arc<OperationTable>) -> Self {
        self.operations = Some(operations);
        self
    }
}
