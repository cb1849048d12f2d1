//! Unary and binary operators.
//!
//! Direct enum-based dispatch over the fixed value set. `&&` and `||` are
//! not here: they short-circuit, so the resolver handles them before either
//! operand is known.

use std::cmp::Ordering;

use otx_ir::{BinaryOp, UnaryOp, Value};

use crate::errors::DataErrorKind;

type OpResult = Result<Value, DataErrorKind>;

#[inline]
fn checked_int(result: Option<i64>) -> OpResult {
    result.map(Value::Int).ok_or(DataErrorKind::Overflow)
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> DataErrorKind {
    DataErrorKind::BinaryTypeMismatch {
        op: op.as_symbol(),
        lhs: lhs.type_name().to_string(),
        rhs: rhs.type_name().to_string(),
    }
}

#[allow(clippy::cast_precision_loss, reason = "int/float mixing follows float semantics")]
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

pub(crate) fn evaluate_unary(op: UnaryOp, operand: &Value) -> OpResult {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Int(n)) => checked_int(n.checked_neg()),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Neg, v) => Err(DataErrorKind::UnaryTypeMismatch {
            op: "-",
            operand: v.type_name().to_string(),
        }),
    }
}

/// Evaluate a non-short-circuiting binary operator.
pub(crate) fn evaluate_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> OpResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotEq => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(lhs, rhs).ok_or_else(|| mismatch(op, lhs, rhs))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => arithmetic(op, lhs, rhs),
        // Eager forms; the resolver short-circuits before getting here.
        BinaryOp::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => as_float(lhs)?.partial_cmp(&as_float(rhs)?),
    }
}

fn add(lhs: &Value, rhs: &Value) -> OpResult {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => checked_int(a.checked_add(*b)),
        (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::string(format!("{lhs}{rhs}"))),
        (Value::List(a), Value::List(b)) => {
            Ok(Value::list(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => match (as_float(lhs), as_float(rhs)) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(mismatch(BinaryOp::Add, lhs, rhs)),
        },
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> OpResult {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let (a, b) = (*a, *b);
        return match op {
            BinaryOp::Sub => checked_int(a.checked_sub(b)),
            BinaryOp::Mul => checked_int(a.checked_mul(b)),
            BinaryOp::Div if b == 0 => Err(DataErrorKind::DivisionByZero),
            BinaryOp::Div => checked_int(a.checked_div(b)),
            BinaryOp::Mod if b == 0 => Err(DataErrorKind::DivisionByZero),
            _ => checked_int(a.checked_rem(b)),
        };
    }
    let (Some(a), Some(b)) = (as_float(lhs), as_float(rhs)) else {
        return Err(mismatch(op, lhs, rhs));
    };
    Ok(Value::Float(match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    }))
}
