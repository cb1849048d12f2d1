//! otx Parse - template compiler.
//!
//! Turns template source into an immutable [`otx_ir::Template`]:
//!
//! ```text
//! source ──scanner──▶ markers ──compiler──▶ Vec<Instr> + slots ──▶ Template
//! ```
//!
//! - [`compile`]: single template from source + [`CompileOptions`]
//! - [`read_templates`]: two-pass reader for multi-template sources
//!
//! Structural problems (unbalanced blocks, unresolvable `call`/`exec`
//! targets, bad syntax inside a marker) fail with [`MalformedTemplate`].
//! Unknown variable names do not: they compile to inline placeholders.

mod compiler;
mod error;
mod expr;
mod marker;
mod options;
mod reader;
mod scanner;

pub use compiler::compile;
pub use error::{line_col, MalformedKind, MalformedTemplate, Span};
pub use options::CompileOptions;
pub use reader::{read_templates, split_segments, ReaderOptions, Segment};
