//! otxc - the otx template engine.
//!
//! Facade over the engine crates plus the pieces behind the `otx` binary:
//!
//! - `otx_parse`: marker scanning, compilation, multi-template files
//! - `otx_ir`: templates, values, registries, operation tables
//! - `otx_eval`: contexts and the interpreter
//!
//! # Example
//!
//! ```
//! use otxc::{compile, CompileOptions, Context, Interpreter};
//!
//! let options = CompileOptions::new().params(["name"]);
//! let template = compile("hello", "Hello, <&name>!", &options).unwrap();
//! let mut ctx = Context::new(&template);
//! ctx.set("name", "world").unwrap();
//! let out = Interpreter::new().render(&template, &mut ctx).unwrap();
//! assert_eq!(out, "Hello, world!");
//! ```

pub mod commands;
pub mod report;

use std::sync::Once;

pub use otx_eval::{
    BufferSink, Context, ContextError, DataError, DataErrorKind, DebugEvent, DebugTrigger,
    Interpreter, InterpreterBuilder, IoSink, RunError, DEFAULT_MAX_CALL_DEPTH,
};
pub use otx_ir::{
    placeholder, Arity, Operation, OperationTable, Structural, Template, TemplateId,
    TemplateRegistry, Value,
};
pub use otx_parse::{
    compile, line_col, read_templates, split_segments, CompileOptions, MalformedKind,
    MalformedTemplate, ReaderOptions, Segment, Span,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=otx_eval=debug` or `RUST_LOG=otx_parse=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
