//! Value resolution: value sources, data paths and expressions.
//!
//! Every failure becomes a [`DataError`] whose subject is the source text of
//! what was being resolved (`user.address.zip`, `total / count`), rebuilt
//! from the compiled form using the template's slot names.

use std::fmt::Write;

use otx_ir::{
    BinaryOp, DataPath, Expr, ExprId, PathRoot, PathStep, SlotId, Template, UnaryOp, Value,
    ValueSource,
};
use smallvec::SmallVec;

use crate::context::Context;
use crate::errors::{DataError, DataErrorKind};
use crate::methods::dispatch_method;
use crate::operators::{evaluate_binary, evaluate_unary};

/// Read-only view used while resolving one instruction operand.
pub(crate) struct Resolver<'a> {
    template: &'a Template,
    ctx: &'a Context,
}

impl<'a> Resolver<'a> {
    pub fn new(template: &'a Template, ctx: &'a Context) -> Self {
        Resolver { template, ctx }
    }

    pub fn source(&self, source: &ValueSource) -> Result<Value, DataError> {
        match source {
            ValueSource::Constant(value) => Ok(value.clone()),
            ValueSource::Slot(slot) => Ok(self.slot(*slot)),
            ValueSource::Path(path) => self.path(path),
            ValueSource::Expr(id) => self.expr(*id),
        }
    }

    fn slot(&self, slot: SlotId) -> Value {
        self.ctx.slot(slot).cloned().unwrap_or_default()
    }

    fn path(&self, path: &DataPath) -> Result<Value, DataError> {
        let mut value = match &path.root {
            PathRoot::Slot(slot) => self.slot(*slot),
            PathRoot::Constant(value) => value.clone(),
            PathRoot::Target => self.ctx.operation_target().clone(),
        };
        for step in &path.steps {
            value = self
                .step(&value, step)
                .map_err(|kind| DataError::new(self.path_text(path), kind))?;
        }
        Ok(value)
    }

    /// The error's subject is filled in by the caller.
    fn step(&self, value: &Value, step: &PathStep) -> Result<Value, DataErrorKind> {
        match step {
            PathStep::Field(name) => field(value, name),
            PathStep::Key(key) => match value {
                Value::Map(entries) => entries
                    .get(key)
                    .cloned()
                    .ok_or_else(|| DataErrorKind::NoKey { key: key.clone() }),
                Value::Object(_) => field(value, key),
                other => Err(DataErrorKind::NotIndexable(other.type_name().to_string())),
            },
            PathStep::Index(index) => index_into(value, *index),
            PathStep::Call { name, args } => {
                let mut values: SmallVec<[Value; 4]> = SmallVec::with_capacity(args.len());
                for arg in args {
                    values.push(self.expr(*arg).map_err(|e| e.kind)?);
                }
                dispatch_method(value, name, &values)
            }
        }
    }

    pub fn expr(&self, id: ExprId) -> Result<Value, DataError> {
        match self.template.exprs().get(id) {
            Expr::Const(value) => Ok(value.clone()),
            Expr::Path(path) => self.path(path),
            Expr::Unary(op, operand) => {
                let operand = self.expr(*operand)?;
                evaluate_unary(*op, &operand).map_err(|kind| DataError::new(self.expr_text(id), kind))
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                if !self.expr(*lhs)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.expr(*rhs)?.is_truthy()))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                if self.expr(*lhs)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.expr(*rhs)?.is_truthy()))
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.expr(*lhs)?;
                let rhs = self.expr(*rhs)?;
                evaluate_binary(*op, &lhs, &rhs).map_err(|kind| DataError::new(self.expr_text(id), kind))
            }
        }
    }

    // Source text reconstruction

    pub fn source_text(&self, source: &ValueSource) -> String {
        match source {
            ValueSource::Constant(value) => literal_text(value),
            ValueSource::Slot(slot) => self.slot_name(*slot).to_string(),
            ValueSource::Path(path) => self.path_text(path),
            ValueSource::Expr(id) => self.expr_text(*id),
        }
    }

    fn slot_name(&self, slot: SlotId) -> &str {
        self.template.slots().name_of(slot).unwrap_or("?")
    }

    fn path_text(&self, path: &DataPath) -> String {
        let mut text = match &path.root {
            PathRoot::Slot(slot) => self.slot_name(*slot).to_string(),
            PathRoot::Constant(value) => literal_text(value),
            PathRoot::Target => "this".to_string(),
        };
        for step in &path.steps {
            let _ = match step {
                PathStep::Field(name) => write!(text, ".{name}"),
                PathStep::Index(i) => write!(text, "[{i}]"),
                PathStep::Key(key) => write!(text, "[{key:?}]"),
                PathStep::Call { name, args } => {
                    let args: Vec<String> = args.iter().map(|a| self.expr_text(*a)).collect();
                    write!(text, ".{name}({})", args.join(", "))
                }
            };
        }
        text
    }

    fn expr_text(&self, id: ExprId) -> String {
        match self.template.exprs().get(id) {
            Expr::Const(value) => literal_text(value),
            Expr::Path(path) => self.path_text(path),
            Expr::Unary(UnaryOp::Not, operand) => format!("!{}", self.expr_text(*operand)),
            Expr::Unary(UnaryOp::Neg, operand) => format!("-{}", self.expr_text(*operand)),
            Expr::Binary(op, lhs, rhs) => {
                format!("{} {op} {}", self.expr_text(*lhs), self.expr_text(*rhs))
            }
        }
    }
}

fn literal_text(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{:?}", &**s),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn field(value: &Value, name: &str) -> Result<Value, DataErrorKind> {
    let found = match value {
        Value::Map(entries) => entries.get(name).cloned(),
        Value::Object(obj) => obj.field(name),
        _ => None,
    };
    found.ok_or_else(|| DataErrorKind::NoField {
        field: name.to_string(),
        type_name: value.type_name().to_string(),
    })
}

/// Negative indices count from the end.
fn index_into(value: &Value, index: i64) -> Result<Value, DataErrorKind> {
    match value {
        Value::List(items) => {
            let len = items.len();
            let position = if index < 0 {
                usize::try_from(index.unsigned_abs())
                    .ok()
                    .and_then(|back| len.checked_sub(back))
            } else {
                usize::try_from(index).ok()
            };
            position
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or(DataErrorKind::IndexOutOfRange { index, len })
        }
        Value::Object(obj) => obj.index(index).ok_or_else(|| DataErrorKind::NoElement {
            index,
            type_name: obj.type_name().to_string(),
        }),
        other => Err(DataErrorKind::NotIndexable(other.type_name().to_string())),
    }
}
