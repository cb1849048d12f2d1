//! Built-in methods callable from data paths (`<&name.upper()>`).
//!
//! Direct enum-based dispatch on the receiver. Host objects get no built-ins;
//! their calls go straight to [`Structural::call`](otx_ir::Structural::call).

use otx_ir::Value;

use crate::errors::DataErrorKind;

type MethodResult = Result<Value, DataErrorKind>;

#[inline]
fn require_args(method: &str, expected: usize, args: &[Value]) -> Result<(), DataErrorKind> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(DataErrorKind::WrongArgCount {
            method: method.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn require_str_arg<'a>(method: &str, args: &'a [Value]) -> Result<&'a str, DataErrorKind> {
    require_args(method, 1, args)?;
    args[0].as_str().ok_or_else(|| DataErrorKind::WrongArgType {
        method: method.to_string(),
        expected: "a string",
        found: args[0].type_name().to_string(),
    })
}

fn no_such_method(method: &str, receiver: &Value) -> DataErrorKind {
    DataErrorKind::NoMethod {
        method: method.to_string(),
        type_name: receiver.type_name().to_string(),
    }
}

/// Call `method` on `receiver`.
pub(crate) fn dispatch_method(receiver: &Value, method: &str, args: &[Value]) -> MethodResult {
    match receiver {
        Value::Str(s) => dispatch_str(receiver, s, method, args),
        Value::List(items) => dispatch_list(receiver, items, method, args),
        Value::Map(entries) => match method {
            "len" => {
                require_args(method, 0, args)?;
                Ok(Value::from(entries.len()))
            }
            "is_empty" => {
                require_args(method, 0, args)?;
                Ok(Value::Bool(entries.is_empty()))
            }
            "keys" => {
                require_args(method, 0, args)?;
                Ok(Value::list(entries.keys().map(|k| Value::from(k.as_str())).collect()))
            }
            "values" => {
                require_args(method, 0, args)?;
                Ok(Value::list(entries.values().cloned().collect()))
            }
            "contains_key" => {
                let key = require_str_arg(method, args)?;
                Ok(Value::Bool(entries.contains_key(key)))
            }
            _ => Err(no_such_method(method, receiver)),
        },
        Value::Object(obj) => obj.call(method, args).map_err(|message| DataErrorKind::MethodFailed {
            method: method.to_string(),
            message,
        }),
        _ => Err(no_such_method(method, receiver)),
    }
}

fn dispatch_str(receiver: &Value, s: &str, method: &str, args: &[Value]) -> MethodResult {
    match method {
        "len" => {
            require_args(method, 0, args)?;
            Ok(Value::from(s.chars().count()))
        }
        "is_empty" => {
            require_args(method, 0, args)?;
            Ok(Value::Bool(s.is_empty()))
        }
        "upper" => {
            require_args(method, 0, args)?;
            Ok(Value::from(s.to_uppercase()))
        }
        "lower" => {
            require_args(method, 0, args)?;
            Ok(Value::from(s.to_lowercase()))
        }
        "trim" => {
            require_args(method, 0, args)?;
            Ok(Value::from(s.trim()))
        }
        "contains" => Ok(Value::Bool(s.contains(require_str_arg(method, args)?))),
        "starts_with" => Ok(Value::Bool(s.starts_with(require_str_arg(method, args)?))),
        "ends_with" => Ok(Value::Bool(s.ends_with(require_str_arg(method, args)?))),
        _ => Err(no_such_method(method, receiver)),
    }
}

fn dispatch_list(receiver: &Value, items: &[Value], method: &str, args: &[Value]) -> MethodResult {
    match method {
        "len" => {
            require_args(method, 0, args)?;
            Ok(Value::from(items.len()))
        }
        "is_empty" => {
            require_args(method, 0, args)?;
            Ok(Value::Bool(items.is_empty()))
        }
        "first" => {
            require_args(method, 0, args)?;
            Ok(items.first().cloned().unwrap_or_default())
        }
        "last" => {
            require_args(method, 0, args)?;
            Ok(items.last().cloned().unwrap_or_default())
        }
        "contains" => {
            require_args(method, 1, args)?;
            Ok(Value::Bool(items.contains(&args[0])))
        }
        "join" => {
            let sep = require_str_arg(method, args)?;
            let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
            Ok(Value::from(parts.join(sep)))
        }
        _ => Err(no_such_method(method, receiver)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn call(receiver: impl Into<Value>, method: &str, args: &[Value]) -> MethodResult {
        dispatch_method(&receiver.into(), method, args)
    }

    #[test]
    fn string_methods() {
        assert_eq!(call("héllo", "len", &[]), Ok(Value::Int(5)));
        assert_eq!(call("abc", "upper", &[]), Ok(Value::from("ABC")));
        assert_eq!(call(" x ", "trim", &[]), Ok(Value::from("x")));
        assert_eq!(call("abc", "starts_with", &[Value::from("ab")]), Ok(Value::Bool(true)));
        assert_eq!(call("", "is_empty", &[]), Ok(Value::Bool(true)));
    }

    #[test]
    fn list_methods() {
        let list = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        assert_eq!(call(list.clone(), "len", &[]), Ok(Value::Int(3)));
        assert_eq!(call(list.clone(), "last", &[]), Ok(Value::Int(3)));
        assert_eq!(call(list.clone(), "contains", &[Value::Int(2)]), Ok(Value::Bool(true)));
        assert_eq!(call(list, "join", &[Value::from("-")]), Ok(Value::from("1-2-3")));
        assert_eq!(call(Vec::<Value>::new(), "first", &[]), Ok(Value::Null));
    }

    #[test]
    fn map_methods() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), Value::Int(2));
        map.insert("a".to_string(), Value::Int(1));
        assert_eq!(
            call(map.clone(), "keys", &[]),
            Ok(Value::list(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(call(map, "contains_key", &[Value::from("a")]), Ok(Value::Bool(true)));
    }

    #[test]
    fn argument_errors() {
        assert_eq!(
            call("abc", "upper", &[Value::Int(1)]),
            Err(DataErrorKind::WrongArgCount {
                method: "upper".to_string(),
                expected: 0,
                found: 1
            })
        );
        assert_eq!(
            call("abc", "contains", &[Value::Int(1)]),
            Err(DataErrorKind::WrongArgType {
                method: "contains".to_string(),
                expected: "a string",
                found: "int".to_string()
            })
        );
        assert_eq!(
            call(1, "len", &[]),
            Err(DataErrorKind::NoMethod {
                method: "len".to_string(),
                type_name: "int".to_string()
            })
        );
    }
}
