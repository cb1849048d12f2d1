//! Compiled expressions and data paths.
//!
//! Expressions live in a per-template arena and reference each other by
//! [`ExprId`], the same flat layout the instruction list uses. Only
//! conditions, assignments and arguments that are more than a bare name,
//! literal or path ever allocate here.

use std::fmt;

use smallvec::SmallVec;

use crate::{ExprId, SlotId, Value};

/// Start of a data path.
#[derive(Clone, Debug, PartialEq)]
pub enum PathRoot {
    /// A template slot (parameter, loop variable, `set` target).
    Slot(SlotId),
    /// A compile-time constant.
    Constant(Value),
    /// The context's bound operation target (`this` in source).
    Target,
}

/// One access step applied to the current value.
#[derive(Clone, Debug, PartialEq)]
pub enum PathStep {
    /// `.name`
    Field(String),
    /// `[3]`
    Index(i64),
    /// `["key"]`
    Key(String),
    /// `.name(args...)`
    Call { name: String, args: Vec<ExprId> },
}

/// A dotted/indexed access path, resolved at compile time to a root.
#[derive(Clone, Debug, PartialEq)]
pub struct DataPath {
    pub root: PathRoot,
    pub steps: SmallVec<[PathStep; 4]>,
}

impl DataPath {
    pub fn new(root: PathRoot) -> Self {
        DataPath {
            root,
            steps: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_step(mut self, step: PathStep) -> Self {
        self.steps.push(step);
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(Value),
    Path(DataPath),
    Unary(UnaryOp, ExprId),
    Binary(BinaryOp, ExprId, ExprId),
}

/// Flat storage for a template's expressions.
#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an expression and return its id.
    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = u32::try_from(self.exprs.len()).unwrap_or(u32::MAX);
        self.exprs.push(expr);
        ExprId::new(id)
    }

    /// Get an expression by id.
    ///
    /// Ids are only ever produced by `alloc` on the same arena.
    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}
