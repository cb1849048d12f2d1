//! Host operations invoked by `<:exec:...>`.
//!
//! An [`OperationTable`] describes the operations a host type exposes. The
//! compiler resolves `exec` markers against it by name; the interpreter calls
//! the resolved [`Operation`] with the context's bound operation target.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::Value;

/// Host operation signature: `(target, argument) -> result`.
///
/// The argument is `Some` exactly when the operation is [`Arity::Unary`].
pub type OperationFn = dyn Fn(&Value, Option<&Value>) -> Result<Value, String> + Send + Sync;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    Nullary,
    Unary,
}

/// A named, pre-resolved host operation.
#[derive(Clone)]
pub struct Operation {
    name: Arc<str>,
    arity: Arity,
    func: Arc<OperationFn>,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Invoke against `target`.
    pub fn invoke(&self, target: &Value, arg: Option<&Value>) -> Result<Value, String> {
        (self.func)(target, arg)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Operation descriptor of one host type.
#[derive(Clone, Debug)]
pub struct OperationTable {
    type_name: String,
    ops: FxHashMap<String, Operation>,
}

impl OperationTable {
    pub fn new(type_name: impl Into<String>) -> Self {
        OperationTable {
            type_name: type_name.into(),
            ops: FxHashMap::default(),
        }
    }

    /// Register an operation, replacing any previous one with the same name.
    #[must_use]
    pub fn register<F>(mut self, name: &str, arity: Arity, func: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        let op = Operation {
            name: Arc::from(name),
            arity,
            func: Arc::new(func),
        };
        self.ops.insert(name.to_string(), op);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Operation> {
        self.ops.get(name)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}
