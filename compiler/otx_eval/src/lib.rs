//! otx Eval - execution context and interpreter for otx templates.
//!
//! # Architecture
//!
//! - [`Context`]: per-invocation slot storage bound to one template, with a
//!   call-site keyed cache of sub-contexts for `call`
//! - [`Interpreter`]: walks a template's flat instruction list, configured
//!   through [`InterpreterBuilder`]
//! - value resolution: data paths, expressions, built-in methods
//! - output: any [`std::fmt::Write`]; [`IoSink`] and [`BufferSink`] adapters
//!
//! # Errors
//!
//! Data problems ([`DataError`]) are rendered inline as placeholders and never
//! abort a run. [`RunError`] covers what does: a context built for another
//! template, runaway call recursion, and a failing output sink.

mod context;
mod diagnostics;
pub mod errors;
mod interpreter;
mod methods;
mod operators;
mod output;
mod resolve;
mod stack;

pub use context::{Context, ContextError, DebugEvent, DebugTrigger};
pub use errors::{DataError, DataErrorKind, RunError};
pub use interpreter::{Interpreter, InterpreterBuilder, DEFAULT_MAX_CALL_DEPTH};
pub use output::{BufferSink, IoSink};
