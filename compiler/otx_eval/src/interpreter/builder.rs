//! `InterpreterBuilder` for configuring execution policy.

use super::Interpreter;

/// Default ceiling on nested `call` depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

/// Builder for [`Interpreter`].
///
/// ```text
/// let interpreter = Interpreter::builder()
///     .max_call_depth(32)
///     .placeholders(false)
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct InterpreterBuilder {
    max_call_depth: usize,
    placeholders: bool,
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        InterpreterBuilder {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            placeholders: true,
        }
    }

    /// How many `call`s may be nested before `run` fails with
    /// `RecursionLimitExceeded`.
    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Whether data-resolution failures render as `[?subject: reason]`.
    /// When off they render nothing; they are still logged.
    #[must_use]
    pub fn placeholders(mut self, enabled: bool) -> Self {
        self.placeholders = enabled;
        self
    }

    pub fn build(self) -> Interpreter {
        Interpreter {
            max_call_depth: self.max_call_depth,
            placeholders: self.placeholders,
        }
    }
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
