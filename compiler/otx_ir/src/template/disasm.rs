use std::fmt::Write;

use crate::{CallTarget, DataPath, Expr, ExprId, Instr, PathRoot, PathStep, SlotId, Template, UnaryOp, ValueSource};

/// One line per instruction, jump offsets shown as absolute targets.
pub(super) fn disassemble(template: &Template) -> String {
    let d = Disasm { template };
    let mut out = String::new();
    let params: Vec<&str> = template.params().map(|(_, name)| name).collect();
    let _ = writeln!(
        out,
        "template {} ({} params: [{}], {} slots, {} call sites)",
        template.name(),
        params.len(),
        params.join(", "),
        template.slot_count(),
        template.call_site_count(),
    );
    for (index, instr) in template.instrs().iter().enumerate() {
        let _ = write!(out, "{index:04} {:<8}", instr.mnemonic());
        let operands = d.operands(index, instr);
        if !operands.is_empty() {
            let _ = write!(out, " {operands}");
        }
        out.truncate(out.trim_end().len());
        out.push('\n');
    }
    out
}

struct Disasm<'a> {
    template: &'a Template,
}

impl Disasm<'_> {
    fn operands(&self, index: usize, instr: &Instr) -> String {
        let target = |offset: u32| index + offset as usize;
        match instr {
            Instr::Literal(text) => format!("{:?}", &**text),
            Instr::Variable(src) => self.source(src),
            Instr::If(branch) | Instr::Elsif(branch) => format!(
                "{} next={:04} end={:04}",
                self.source(&branch.cond),
                target(branch.next),
                target(branch.end)
            ),
            Instr::Else | Instr::EndFor => String::new(),
            Instr::For(lp) => format!(
                "{} in {} end={:04}",
                self.slot(lp.entry),
                self.source(&lp.container),
                target(lp.end)
            ),
            Instr::Set { value, target } => format!("{} = {}", self.slot(*target), self.source(value)),
            Instr::Call(call) => {
                let callee = match &call.target {
                    CallTarget::Static(t) => format!("static {}", t.name()),
                    CallTarget::Named(name) => format!("named {name}"),
                    CallTarget::Slot(slot) => format!("dynamic {}", self.slot(*slot)),
                };
                let args: Vec<String> = call
                    .args
                    .iter()
                    .map(|arg| match arg.slot {
                        Some(slot) => format!("{}@{}={}", arg.name, slot.raw(), self.source(&arg.value)),
                        None => format!("{}={}", arg.name, self.source(&arg.value)),
                    })
                    .collect();
                format!("{callee} site={} ({})", call.site.raw(), args.join(", "))
            }
            Instr::Exec { op, arg } => match arg {
                Some(arg) => format!("{}({})", op.name(), self.source(arg)),
                None => format!("{}()", op.name()),
            },
            Instr::Debug { value, compare } => {
                let mut s = value.as_ref().map(|v| self.source(v)).unwrap_or_default();
                if let Some(cmp) = compare {
                    let _ = write!(s, " == {cmp:?}");
                }
                s
            }
        }
    }

    fn slot(&self, slot: SlotId) -> String {
        let name = self.template.slots().name_of(slot).unwrap_or("?");
        format!("${}:{name}", slot.raw())
    }

    fn source(&self, src: &ValueSource) -> String {
        match src {
            ValueSource::Constant(v) => format!("const {v:?}"),
            ValueSource::Slot(slot) => self.slot(*slot),
            ValueSource::Path(path) => self.path(path),
            ValueSource::Expr(id) => self.expr(*id),
        }
    }

    fn path(&self, path: &DataPath) -> String {
        let mut s = match &path.root {
            PathRoot::Slot(slot) => self.slot(*slot),
            PathRoot::Constant(v) => format!("{v:?}"),
            PathRoot::Target => "this".to_string(),
        };
        for step in &path.steps {
            match step {
                PathStep::Field(name) => {
                    let _ = write!(s, ".{name}");
                }
                PathStep::Index(i) => {
                    let _ = write!(s, "[{i}]");
                }
                PathStep::Key(key) => {
                    let _ = write!(s, "[{key:?}]");
                }
                PathStep::Call { name, args } => {
                    let args: Vec<String> = args.iter().map(|a| self.expr(*a)).collect();
                    let _ = write!(s, ".{name}({})", args.join(", "));
                }
            }
        }
        s
    }

    fn expr(&self, id: ExprId) -> String {
        match self.template.exprs().get(id) {
            Expr::Const(v) => format!("{v:?}"),
            Expr::Path(path) => self.path(path),
            Expr::Unary(UnaryOp::Not, operand) => format!("!{}", self.expr(*operand)),
            Expr::Unary(UnaryOp::Neg, operand) => format!("-{}", self.expr(*operand)),
            Expr::Binary(op, lhs, rhs) => format!("({} {op} {})", self.expr(*lhs), self.expr(*rhs)),
        }
    }
}
