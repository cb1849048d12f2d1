//! Lowering parsed operands to value sources.
//!
//! Names resolve against the slot map first, then the constant table; `this`
//! is the context's operation target. Whatever is left over is reported back
//! as unknown and replaced with null, so the caller can emit a placeholder.

use otx_ir::{DataPath, Expr, ExprId, PathRoot, PathStep, Value, ValueSource};

use super::Compiler;
use crate::error::{MalformedKind, MalformedTemplate};
use crate::expr::{parse_expr, Ast, AstStep, PathHead};

impl Compiler<'_, '_> {
    /// Parse and lower one operand.
    ///
    /// Returns the cheapest value source for it plus every unknown name it
    /// referenced (each rendered as its full path text).
    pub(super) fn source_of(
        &mut self,
        text: &str,
    ) -> Result<(ValueSource, Vec<String>), MalformedTemplate> {
        let text = text.trim();
        let ast = parse_expr(text).map_err(|reason| {
            self.error(MalformedKind::InvalidExpression {
                text: text.to_string(),
                reason,
            })
        })?;
        let mut unknowns = Vec::new();
        let source = self.lower_source(ast, text, &mut unknowns);
        Ok((source, unknowns))
    }

    fn lower_source(&mut self, ast: Ast, text: &str, unknowns: &mut Vec<String>) -> ValueSource {
        match ast {
            Ast::Const(value) => ValueSource::Constant(value),
            Ast::Path { head, steps } => match self.lower_path(head, steps, text, unknowns) {
                Some(path) if path.steps.is_empty() => match path.root {
                    PathRoot::Slot(slot) => ValueSource::Slot(slot),
                    PathRoot::Constant(value) => ValueSource::Constant(value),
                    PathRoot::Target => ValueSource::Path(path),
                },
                Some(path) => ValueSource::Path(path),
                None => ValueSource::Constant(Value::Null),
            },
            ast @ (Ast::Unary(..) | Ast::Binary(..)) => {
                ValueSource::Expr(self.lower_expr(ast, text, unknowns))
            }
        }
    }

    fn lower_expr(&mut self, ast: Ast, text: &str, unknowns: &mut Vec<String>) -> ExprId {
        let expr = match ast {
            Ast::Const(value) => Expr::Const(value),
            Ast::Path { head, steps } => match self.lower_path(head, steps, text, unknowns) {
                Some(path) => Expr::Path(path),
                None => Expr::Const(Value::Null),
            },
            Ast::Unary(op, operand) => {
                let operand = self.lower_expr(*operand, text, unknowns);
                Expr::Unary(op, operand)
            }
            Ast::Binary(op, lhs, rhs) => {
                let lhs = self.lower_expr(*lhs, text, unknowns);
                let rhs = self.lower_expr(*rhs, text, unknowns);
                Expr::Binary(op, lhs, rhs)
            }
        };
        self.exprs.alloc(expr)
    }

    /// `None` when the root name is unknown; the name is pushed to `unknowns`.
    fn lower_path(
        &mut self,
        head: PathHead,
        steps: Vec<AstStep>,
        text: &str,
        unknowns: &mut Vec<String>,
    ) -> Option<DataPath> {
        let root = match head {
            PathHead::This => PathRoot::Target,
            PathHead::Literal(value) => PathRoot::Constant(value),
            PathHead::Name(name) => {
                if let Some(slot) = self.slots.lookup(&name) {
                    PathRoot::Slot(slot)
                } else if let Some(value) = self.options.constants.get(&name) {
                    PathRoot::Constant(value.clone())
                } else {
                    // A bare operand reports its full text (`missing.field`),
                    // a name nested in a larger expression reports itself.
                    let shown = if text.starts_with(name.as_str())
                        && text[name.len()..].chars().all(|c| c.is_alphanumeric() || "_.[]\"'".contains(c))
                    {
                        text.to_string()
                    } else {
                        name
                    };
                    unknowns.push(shown);
                    return None;
                }
            }
        };
        let mut path = DataPath::new(root);
        for step in steps {
            let step = match step {
                AstStep::Field(name) => PathStep::Field(name),
                AstStep::Index(i) => PathStep::Index(i),
                AstStep::Key(key) => PathStep::Key(key),
                AstStep::Call { name, args } => {
                    let args = args
                        .into_iter()
                        .map(|arg| self.lower_expr(arg, text, unknowns))
                        .collect();
                    PathStep::Call { name, args }
                }
            };
            path.steps.push(step);
        }
        Some(path)
    }
}
