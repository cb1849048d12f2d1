//! The instruction set.
//!
//! A compiled template is a flat `Vec<Instr>`. Block headers carry jump
//! offsets relative to their own index; the compiler backpatches them when
//! the block closes, so the interpreter never searches for a matching closer.

use std::sync::Arc;

use crate::{CallSiteId, DataPath, ExprId, Operation, SlotId, Template, Value};

/// Where an instruction gets its value from.
///
/// Chosen once at compile time so the interpreter never re-inspects source
/// syntax.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueSource {
    Constant(Value),
    Slot(SlotId),
    Path(DataPath),
    Expr(ExprId),
}

/// Header of one `if`/`elsif` link.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub cond: ValueSource,
    /// Offset to the next `elsif`/`else`, or to the end when this is the last link.
    pub next: u32,
    /// Offset to the first instruction after the whole chain.
    pub end: u32,
}

/// Header of a `for` block.
#[derive(Clone, Debug, PartialEq)]
pub struct Loop {
    pub container: ValueSource,
    /// Holds the current element during the body.
    pub entry: SlotId,
    /// Holds the following element, or null on the last pass.
    pub entry_next: SlotId,
    /// Offset to the first instruction after the paired `EndFor`.
    pub end: u32,
}

/// Who a `call` invokes.
#[derive(Clone, Debug)]
pub enum CallTarget {
    /// Known at compile time; argument slots are pre-resolved.
    Static(Arc<Template>),
    /// Looked up in the template's registry at run time; arguments bind by name.
    Named(String),
    /// Read from a slot at run time; the value must be a template.
    Slot(SlotId),
}

/// One `name=expr` argument of a call.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgBinding {
    pub name: String,
    /// Callee slot, when the callee was known at compile time.
    pub slot: Option<SlotId>,
    pub value: ValueSource,
}

#[derive(Clone, Debug)]
pub struct CallInstr {
    pub target: CallTarget,
    pub args: Vec<ArgBinding>,
    pub site: CallSiteId,
}

/// One compiled instruction.
#[derive(Clone, Debug)]
pub enum Instr {
    Literal(Box<str>),
    Variable(ValueSource),
    If(Branch),
    Elsif(Branch),
    Else,
    For(Loop),
    /// Block-closing marker only; never executed for effect.
    EndFor,
    Set {
        value: ValueSource,
        target: SlotId,
    },
    Call(CallInstr),
    Exec {
        op: Operation,
        arg: Option<ValueSource>,
    },
    Debug {
        value: Option<ValueSource>,
        compare: Option<String>,
    },
}

impl Instr {
    /// Short mnemonic used by the disassembler and trace logs.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instr::Literal(_) => "literal",
            Instr::Variable(_) => "variable",
            Instr::If(_) => "if",
            Instr::Elsif(_) => "elsif",
            Instr::Else => "else",
            Instr::For(_) => "for",
            Instr::EndFor => "endfor",
            Instr::Set { .. } => "set",
            Instr::Call(_) => "call",
            Instr::Exec { .. } => "exec",
            Instr::Debug { .. } => "debug",
        }
    }
}
