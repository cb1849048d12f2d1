//! otx IR - command model for the otx template engine.
//!
//! This crate holds the data shared by the compiler (`otx_parse`, the writer)
//! and the interpreter (`otx_eval`, the reader):
//! - [`Instr`]: one tagged instruction of a flat, backpatched program
//! - [`Template`]: an immutable instruction list plus its slot map
//! - [`Value`] and [`Structural`]: runtime values and host data access
//! - [`TemplateRegistry`]: name lookup for cross-template calls
//! - [`OperationTable`]: host operations reachable from `exec`
//!
//! # Design
//!
//! - **Flat**: instructions and expressions live in index-addressed arrays;
//!   jumps are offsets relative to the jumping instruction.
//! - **Immutable**: nothing in a built `Template` changes, so it is shared
//!   across threads without locks. All mutable state lives in contexts.

mod expr;
mod ids;
mod instr;
mod operation;
mod placeholder;
mod registry;
mod slots;
mod template;
mod value;

pub use expr::{BinaryOp, DataPath, Expr, ExprArena, PathRoot, PathStep, UnaryOp};
pub use ids::{CallSiteId, ExprId, SlotId, TemplateId};
pub use instr::{ArgBinding, Branch, CallInstr, CallTarget, Instr, Loop, ValueSource};
pub use operation::{Arity, Operation, OperationFn, OperationTable};
pub use placeholder::placeholder;
pub use registry::TemplateRegistry;
pub use slots::SlotMap;
pub use template::{Template, TemplateParts};
pub use value::{Structural, Value};
