//! The `render` command: run one template with parameters from the command line.

use std::fmt;

use otx_eval::{Context, Interpreter};
use otx_ir::Value;

use super::{load, CliError};

/// Render `template` from `path` into `out`.
///
/// Each binding is `name=value`; see [`parse_param_value`] for how values
/// are typed.
#[tracing::instrument(level = "debug", skip(bindings, out))]
pub fn render_file(
    path: &str,
    template: &str,
    bindings: &[String],
    out: &mut dyn fmt::Write,
) -> Result<(), CliError> {
    let registry = load(path)?;
    let Some(compiled) = registry.resolve(template) else {
        return Err(CliError::UnknownTemplate {
            path: path.to_string(),
            name: template.to_string(),
        });
    };

    let mut ctx = Context::new(&compiled);
    for binding in bindings {
        let (name, value) = parse_binding(binding)?;
        ctx.set(name, value)?;
    }
    Interpreter::new().run(&compiled, &mut ctx, out)?;
    Ok(())
}

/// Split `name=value`. Only the first `=` separates.
pub fn parse_binding(binding: &str) -> Result<(&str, Value), CliError> {
    match binding.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim(), parse_param_value(value)))
        }
        _ => Err(CliError::InvalidBinding(binding.to_string())),
    }
}

/// Type a command-line value: integer, float, `true`/`false`, `null`, a
/// quoted string (quotes stripped), otherwise the raw text.
pub fn parse_param_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if raw.bytes().any(|b| b.is_ascii_digit()) {
            return Value::Float(f);
        }
    }
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    for quote in ['"', '\''] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Value::from(inner);
        }
    }
    Value::from(raw)
}
