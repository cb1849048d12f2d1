//! Runtime values.
//!
//! `Value` is what slots hold, what expressions produce, and what the
//! interpreter renders. Heap payloads sit behind `Arc`, so cloning a value is
//! always cheap and a compiled template (which embeds constant values) stays
//! `Send + Sync`.
//!
//! Host data enters the engine as [`Value::Object`], wrapping anything that
//! implements [`Structural`]. The engine never reflects over host types; it
//! only asks for fields, indices, method calls and element sequences.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::template::Template;

/// Structural access to host data.
///
/// Implement this for any host type that templates should be able to walk
/// with data paths (`<&order.customer.name>`, `<&rows[2]>`, `<&item.total()>`)
/// or iterate with `<:for:...>`.
pub trait Structural: Send + Sync + fmt::Debug {
    /// Short type name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Named field lookup.
    fn field(&self, name: &str) -> Option<Value>;

    /// Positional lookup.
    fn index(&self, _index: i64) -> Option<Value> {
        None
    }

    /// Invoke a named method with already-evaluated arguments.
    fn call(&self, name: &str, _args: &[Value]) -> Result<Value, String> {
        Err(format!("no method `{name}` on {}", self.type_name()))
    }

    /// Element sequence, if this object can be iterated by `<:for:...>`.
    fn elements(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        None
    }

    /// Text rendering used by `<&...>`.
    fn render(&self) -> String {
        format!("<{}>", self.type_name())
    }
}

/// Runtime value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value. Renders as nothing, tests false.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<Vec<Value>>),
    /// Ordered key-value map; iterated by value in key order.
    Map(Arc<BTreeMap<String, Value>>),
    /// Host data.
    Object(Arc<dyn Structural>),
    /// A compiled template passed around as data (dynamic `call` target).
    Template(Arc<Template>),
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Arc::new(entries))
    }

    pub fn object(obj: impl Structural + 'static) -> Self {
        Value::Object(Arc::new(obj))
    }

    pub fn template(template: Arc<Template>) -> Self {
        Value::Template(template)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by `if`/`elsif` and the logical operators.
    ///
    /// Null is false, booleans are themselves, numbers are true iff nonzero,
    /// every other present value is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(_)
            | Value::List(_)
            | Value::Map(_)
            | Value::Object(_)
            | Value::Template(_) => true,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(obj) => obj.type_name(),
            Value::Template(_) => "template",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_template(&self) -> Option<&Arc<Template>> {
        match self {
            Value::Template(t) => Some(t),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            #[allow(clippy::cast_precision_loss, reason = "numeric cross-type equality")]
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Template(a), Value::Template(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Object(obj) => f.write_str(&obj.render()),
            Value::Template(t) => write!(f, "<template {}>", t.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Str(s) => write!(f, "Str({:?})", &**s),
            Value::List(items) => f.debug_tuple("List").field(&**items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(&**entries).finish(),
            Value::Object(obj) => write!(f, "Object({obj:?})"),
            Value::Template(t) => write!(f, "Template({})", t.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::map(entries)
    }
}

impl From<Arc<Template>> for Value {
    fn from(template: Arc<Template>) -> Self {
        Value::Template(template)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
