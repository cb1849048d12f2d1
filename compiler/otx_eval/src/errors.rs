//! Run-time errors.
//!
//! Two tiers:
//! - [`RunError`]: fatal, aborts [`Interpreter::run`](crate::Interpreter::run).
//! - [`DataError`]: a single value could not be produced. Never propagated;
//!   the interpreter renders it as an inline placeholder and moves on.

use std::fmt;

use otx_ir::{placeholder, TemplateId};

/// Fatal failure of a `run`.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The context was created for a different template. Nothing was written.
    #[error("context belongs to template {found}, cannot run `{template}` ({expected})")]
    ContextMismatch {
        template: String,
        expected: TemplateId,
        found: TemplateId,
    },
    /// Nested `call`s went deeper than the configured ceiling.
    #[error("call depth limit of {limit} exceeded: {}", .chain.join(" -> "))]
    RecursionLimitExceeded { limit: usize, chain: Vec<String> },
    /// The output sink refused a write.
    #[error("output sink failed")]
    Output(#[from] fmt::Error),
}

/// Why a value could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DataErrorKind {
    #[error("no field `{field}` on {type_name}")]
    NoField { field: String, type_name: String },
    #[error("no key {key:?} in map")]
    NoKey { key: String },
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("no element at index {index} in {type_name}")]
    NoElement { index: i64, type_name: String },
    #[error("cannot index into {0}")]
    NotIndexable(String),
    #[error("no method `{method}` on {type_name}")]
    NoMethod { method: String, type_name: String },
    #[error("`{method}` takes {expected} argument(s), got {found}")]
    WrongArgCount {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("`{method}` expects {expected}, got {found}")]
    WrongArgType {
        method: String,
        expected: &'static str,
        found: String,
    },
    #[error("`{method}` failed: {message}")]
    MethodFailed { method: String, message: String },
    #[error("cannot apply `{op}` to {lhs} and {rhs}")]
    BinaryTypeMismatch {
        op: &'static str,
        lhs: String,
        rhs: String,
    },
    #[error("cannot apply `{op}` to {operand}")]
    UnaryTypeMismatch { op: &'static str, operand: String },
    /// The value resolved but is absent (null).
    #[error("no value")]
    NoValue,
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("cannot iterate over {0}")]
    NotAContainer(String),
    #[error("expected a template, found {0}")]
    NotATemplate(String),
    #[error("no template with this name")]
    UnknownTemplate,
    #[error("template registry is no longer alive")]
    RegistryDropped,
    #[error("template `{template}` has no parameter `{param}`")]
    UnknownParameter { template: String, param: String },
    #[error("operation target must be {expected}, found {found}")]
    OperationTarget { expected: String, found: String },
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// A recoverable resolution failure: what was being resolved, and why it failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{subject}: {kind}")]
pub struct DataError {
    pub subject: String,
    pub kind: DataErrorKind,
}

impl DataError {
    pub fn new(subject: impl Into<String>, kind: DataErrorKind) -> Self {
        DataError {
            subject: subject.into(),
            kind,
        }
    }

    /// The inline text that replaces the failed value in the output.
    pub fn placeholder(&self) -> String {
        placeholder(&self.subject, &self.kind.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn placeholder_names_subject_and_reason() {
        let err = DataError::new(
            "user.zip",
            DataErrorKind::NoField {
                field: "zip".to_string(),
                type_name: "map".to_string(),
            },
        );
        assert_eq!(err.placeholder(), "[?user.zip: no field `zip` on map]");
        assert_eq!(err.to_string(), "user.zip: no field `zip` on map");
    }

    #[test]
    fn recursion_message_shows_chain() {
        let err = RunError::RecursionLimitExceeded {
            limit: 2,
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "call depth limit of 2 exceeded: a -> b -> a");
    }
}
