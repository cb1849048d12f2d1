//! Single-pass template compiler.
//!
//! One left-to-right scan: text accumulates until a marker opener, markers
//! are classified by [`parse_marker`](crate::marker::parse_marker), and block
//! markers push onto a stack of open blocks. Closers pop the stack and
//! backpatch the jump offsets of every header in the block, so the emitted
//! program is final as soon as the scan ends.

mod lower;

use otx_ir::{
    placeholder, ArgBinding, Arity, Branch, CallInstr, CallSiteId, CallTarget, ExprArena, Instr,
    Loop, SlotId, SlotMap, Template, TemplateParts, Value, ValueSource,
};
use smallvec::SmallVec;
use tracing::trace;

use crate::error::{line_col, MalformedKind, MalformedTemplate, Span};
use crate::expr::{is_identifier, split_top_level};
use crate::marker::{decode_code_point, parse_marker, Marker};
use crate::scanner::Scanner;
use crate::CompileOptions;

/// Compile template source into an immutable [`Template`].
///
/// Structural problems fail with [`MalformedTemplate`]; unknown names are
/// compiled into inline placeholders.
#[tracing::instrument(level = "debug", skip_all, fields(template = name, len = source.len()))]
pub fn compile(
    name: &str,
    source: &str,
    options: &CompileOptions<'_>,
) -> Result<Template, MalformedTemplate> {
    let mut compiler = Compiler::new(name, source, options)?;
    compiler.run()?;
    let template = compiler.finish();
    tracing::debug!(
        instrs = template.instrs().len(),
        slots = template.slot_count(),
        "compiled template"
    );
    Ok(template)
}

/// A block whose closer has not been seen yet.
enum OpenBlock {
    If {
        /// Indices of the `If` and every `Elsif` link.
        links: SmallVec<[usize; 4]>,
        has_else: bool,
        opened: Span,
    },
    For {
        header: usize,
        opened: Span,
    },
}

impl OpenBlock {
    fn construct(&self) -> &'static str {
        match self {
            OpenBlock::If { .. } => "if",
            OpenBlock::For { .. } => "for",
        }
    }
}

pub(crate) struct Compiler<'a, 'o> {
    name: &'a str,
    source: &'a str,
    options: &'a CompileOptions<'o>,
    instrs: Vec<Instr>,
    exprs: ExprArena,
    slots: SlotMap,
    call_sites: u32,
    blocks: Vec<OpenBlock>,
    /// Text not yet flushed into a `Literal`.
    text: String,
    /// The last thing scanned was `<: >` (plus the whitespace it skipped).
    after_space_skip: bool,
    /// Span of the marker being compiled, for error reporting.
    span: Span,
}

impl<'a, 'o> Compiler<'a, 'o> {
    fn new(
        name: &'a str,
        source: &'a str,
        options: &'a CompileOptions<'o>,
    ) -> Result<Self, MalformedTemplate> {
        let mut compiler = Compiler {
            name,
            source,
            options,
            instrs: Vec::new(),
            exprs: ExprArena::new(),
            slots: SlotMap::new(),
            call_sites: 0,
            blocks: Vec::new(),
            text: String::new(),
            after_space_skip: false,
            span: Span::default(),
        };
        for param in &options.params {
            let param = param.trim();
            if !is_identifier(param) {
                return Err(compiler.error(MalformedKind::InvalidName(param.to_string())));
            }
            if compiler.slots.lookup(param).is_some() {
                return Err(compiler.error(MalformedKind::DuplicateParameter(param.to_string())));
            }
            compiler.slots.intern(param);
        }
        Ok(compiler)
    }

    fn run(&mut self) -> Result<(), MalformedTemplate> {
        let source = self.source;
        let mut scanner = Scanner::new(source);
        while !scanner.is_eof() {
            let (text, opener) = scanner.next_opener();
            self.push_text(text);
            let Some((opener, start)) = opener else {
                break;
            };
            let Some(end) = scanner.marker_end() else {
                self.span = Span::new(start, source.len());
                return Err(self.error(MalformedKind::UnterminatedMarker));
            };
            self.span = Span::new(start, end + 1);
            let body = &source[start + 2..end];
            let Some(marker) = parse_marker(opener, body) else {
                let raw = &source[start + 1..end];
                return Err(self.error(MalformedKind::UnknownMarker(raw.to_string())));
            };
            scanner.seek(end + 1);
            self.marker(marker, &mut scanner)?;
        }
        self.flush();
        let innermost = self.blocks.last().map(|block| match block {
            OpenBlock::If { opened, .. } | OpenBlock::For { opened, .. } => (block.construct(), *opened),
        });
        if let Some((construct, opened)) = innermost {
            let (line, column) = line_col(source, opened.start);
            self.span = opened;
            return Err(self.error(MalformedKind::UnclosedBlock {
                construct,
                line,
                column,
            }));
        }
        Ok(())
    }

    fn finish(self) -> Template {
        Template::new(TemplateParts {
            name: self.name.to_string(),
            params: self.options.params.len(),
            instrs: self.instrs,
            exprs: self.exprs,
            slots: self.slots,
            call_sites: self.call_sites,
            registry: self.options.runtime_registry.clone(),
            operations: self.options.operations.clone(),
        })
    }

    fn marker(&mut self, marker: Marker<'_>, scanner: &mut Scanner<'_>) -> Result<(), MalformedTemplate> {
        if marker != Marker::SkipSpace {
            self.after_space_skip = false;
        }
        match marker {
            Marker::Variable(path) => self.variable(path)?,
            Marker::If(cond) => self.open_if(cond)?,
            Marker::Elsif(cond) => self.elsif(cond)?,
            Marker::Else => self.else_()?,
            Marker::EndIf => self.close_if()?,
            Marker::For { var, container } => self.open_for(var, container)?,
            Marker::EndFor => self.close_for()?,
            Marker::Set { var, value } => self.set(var, value)?,
            Marker::Call { name, args } => self.call(name, args)?,
            Marker::Exec { op, arg } => self.exec(op, arg)?,
            Marker::Debug { value, compare } => self.debug(value, compare)?,
            Marker::SkipSpace => {
                if self.after_space_skip {
                    self.text.push(' ');
                }
                scanner.skip_whitespace();
                self.after_space_skip = true;
            }
            Marker::SkipNewline => scanner.skip_newline(),
            Marker::SkipBlanks => scanner.skip_blanks(),
            Marker::Escape(c) => self.text.push(c),
            Marker::CodePoint(hex) => {
                let Some(c) = decode_code_point(hex.trim()) else {
                    return Err(self.error(MalformedKind::InvalidCodePoint(hex.to_string())));
                };
                self.text.push(c);
            }
            Marker::Comment => {}
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.after_space_skip = false;
            self.text.push_str(text);
        }
    }

    /// Emit pending text as a `Literal`.
    fn flush(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.emit(Instr::Literal(text.into_boxed_str()));
        }
    }

    fn emit(&mut self, instr: Instr) -> usize {
        let index = self.instrs.len();
        trace!(index, op = instr.mnemonic(), "emit");
        self.instrs.push(instr);
        index
    }

    /// Emit one placeholder literal per unknown name.
    fn emit_unknowns(&mut self, unknowns: Vec<String>) {
        for name in unknowns {
            tracing::debug!(template = self.name, name = %name, "unknown variable");
            self.emit(Instr::Literal(placeholder(&name, "unknown variable").into_boxed_str()));
        }
    }

    fn error(&self, kind: MalformedKind) -> MalformedTemplate {
        MalformedTemplate::new(self.name, self.source, self.span, kind)
    }

    fn offset(from: usize, to: usize) -> u32 {
        u32::try_from(to - from).unwrap_or(u32::MAX)
    }

    fn declare(&mut self, name: &str) -> Result<SlotId, MalformedTemplate> {
        let name = name.trim();
        if !is_identifier(name) {
            return Err(self.error(MalformedKind::InvalidName(name.to_string())));
        }
        Ok(self.slots.intern(name))
    }

    // Markers

    fn variable(&mut self, path: &str) -> Result<(), MalformedTemplate> {
        let (source, unknowns) = self.source_of(path)?;
        self.flush();
        if unknowns.is_empty() {
            self.emit(Instr::Variable(source));
        } else {
            self.emit_unknowns(unknowns);
        }
        Ok(())
    }

    /// A block-header operand: unknown names make the whole header false/empty.
    fn header_operand(&mut self, text: &str) -> Result<(ValueSource, Vec<String>), MalformedTemplate> {
        let (source, unknowns) = self.source_of(text)?;
        if unknowns.is_empty() {
            Ok((source, unknowns))
        } else {
            Ok((ValueSource::Constant(Value::Null), unknowns))
        }
    }

    fn open_if(&mut self, cond: &str) -> Result<(), MalformedTemplate> {
        let (cond, unknowns) = self.header_operand(cond)?;
        self.flush();
        self.emit_unknowns(unknowns);
        let header = self.emit(Instr::If(Branch { cond, next: 0, end: 0 }));
        let mut links = SmallVec::new();
        links.push(header);
        self.blocks.push(OpenBlock::If {
            links,
            has_else: false,
            opened: self.span,
        });
        Ok(())
    }

    /// Point the last link of the innermost `if` at the current position.
    fn close_link(&mut self, branch: &'static str) -> Result<(), MalformedTemplate> {
        self.flush();
        let here = self.instrs.len();
        let last = match self.blocks.last() {
            Some(OpenBlock::If { has_else: true, .. }) => {
                return Err(self.error(MalformedKind::BranchAfterElse(branch)));
            }
            Some(OpenBlock::If { links, .. }) => links.last().copied(),
            Some(OpenBlock::For { .. }) | None => None,
        };
        let Some(last) = last else {
            return Err(self.error(MalformedKind::BranchOutsideIf(branch)));
        };
        if let Instr::If(b) | Instr::Elsif(b) = &mut self.instrs[last] {
            b.next = Self::offset(last, here);
        }
        Ok(())
    }

    fn elsif(&mut self, cond: &str) -> Result<(), MalformedTemplate> {
        self.close_link("elsif")?;
        let (cond, unknowns) = self.header_operand(cond)?;
        // Placeholders sit between the links: only reached when the previous
        // link was false.
        self.emit_unknowns(unknowns);
        let link = self.emit(Instr::Elsif(Branch { cond, next: 0, end: 0 }));
        if let Some(OpenBlock::If { links, .. }) = self.blocks.last_mut() {
            links.push(link);
        }
        Ok(())
    }

    fn else_(&mut self) -> Result<(), MalformedTemplate> {
        self.close_link("else")?;
        self.emit(Instr::Else);
        if let Some(OpenBlock::If { has_else, .. }) = self.blocks.last_mut() {
            *has_else = true;
        }
        Ok(())
    }

    fn close_if(&mut self) -> Result<(), MalformedTemplate> {
        self.flush();
        let (links, has_else) = match self.blocks.pop() {
            Some(OpenBlock::If { links, has_else, .. }) => (links, has_else),
            Some(block @ OpenBlock::For { .. }) => {
                let expected = block.construct();
                self.blocks.push(block);
                return Err(self.error(MalformedKind::MismatchedCloser {
                    expected,
                    found: "if",
                }));
            }
            None => return Err(self.error(MalformedKind::UnmatchedCloser("if"))),
        };
        let end = self.instrs.len();
        let last = links.last().copied();
        for link in links {
            if let Instr::If(b) | Instr::Elsif(b) = &mut self.instrs[link] {
                b.end = Self::offset(link, end);
                if !has_else && Some(link) == last {
                    b.next = Self::offset(link, end);
                }
            }
        }
        Ok(())
    }

    fn open_for(&mut self, var: &str, container: &str) -> Result<(), MalformedTemplate> {
        let (container, unknowns) = self.header_operand(container)?;
        let var = var.trim();
        let entry = self.declare(var)?;
        let entry_next = self.declare(&format!("{var}_next"))?;
        self.flush();
        self.emit_unknowns(unknowns);
        let header = self.emit(Instr::For(Loop {
            container,
            entry,
            entry_next,
            end: 0,
        }));
        self.blocks.push(OpenBlock::For {
            header,
            opened: self.span,
        });
        Ok(())
    }

    fn close_for(&mut self) -> Result<(), MalformedTemplate> {
        self.flush();
        let header = match self.blocks.pop() {
            Some(OpenBlock::For { header, .. }) => header,
            Some(block @ OpenBlock::If { .. }) => {
                let expected = block.construct();
                self.blocks.push(block);
                return Err(self.error(MalformedKind::MismatchedCloser {
                    expected,
                    found: "for",
                }));
            }
            None => return Err(self.error(MalformedKind::UnmatchedCloser("for"))),
        };
        self.emit(Instr::EndFor);
        let end = self.instrs.len();
        if let Instr::For(lp) = &mut self.instrs[header] {
            lp.end = Self::offset(header, end);
        }
        Ok(())
    }

    fn set(&mut self, var: &str, value: &str) -> Result<(), MalformedTemplate> {
        // The value is resolved before the target is declared, so
        // `<:set:x=x>` reads the previous binding of `x`, if any.
        let (value, unknowns) = self.source_of(value)?;
        let target = self.declare(var)?;
        self.flush();
        self.emit_unknowns(unknowns);
        self.emit(Instr::Set { value, target });
        Ok(())
    }

    fn call(&mut self, name: &str, args: Option<&str>) -> Result<(), MalformedTemplate> {
        let name = name.trim();
        let target = if let Some(slot) = self.slots.lookup(name) {
            CallTarget::Slot(slot)
        } else if let Some(template) = self.options.registry.and_then(|r| r.resolve(name)) {
            CallTarget::Static(template)
        } else if self.options.forward_names.contains(name) {
            CallTarget::Named(name.to_string())
        } else {
            return Err(self.error(MalformedKind::UnknownCallTarget(name.to_string())));
        };

        let mut bindings = Vec::new();
        let mut unknowns = Vec::new();
        for arg in args.map(split_top_level).unwrap_or_default() {
            if arg.trim().is_empty() {
                continue;
            }
            let Some((param, expr)) = arg.split_once('=') else {
                return Err(self.error(MalformedKind::InvalidExpression {
                    text: arg.trim().to_string(),
                    reason: "expected `name=value`".to_string(),
                }));
            };
            let param = param.trim();
            if !is_identifier(param) {
                return Err(self.error(MalformedKind::InvalidName(param.to_string())));
            }
            let slot = match &target {
                CallTarget::Static(callee) => match callee.slots().lookup(param) {
                    Some(slot) => Some(slot),
                    None => {
                        return Err(self.error(MalformedKind::UnknownCallParameter {
                            template: callee.name().to_string(),
                            param: param.to_string(),
                        }))
                    }
                },
                CallTarget::Named(_) | CallTarget::Slot(_) => None,
            };
            let (value, mut missing) = self.source_of(expr)?;
            unknowns.append(&mut missing);
            bindings.push(ArgBinding {
                name: param.to_string(),
                slot,
                value,
            });
        }

        self.flush();
        self.emit_unknowns(unknowns);
        let site = CallSiteId::new(self.call_sites);
        self.call_sites += 1;
        self.emit(Instr::Call(CallInstr {
            target,
            args: bindings,
            site,
        }));
        Ok(())
    }

    fn exec(&mut self, op: &str, arg: Option<&str>) -> Result<(), MalformedTemplate> {
        let op_name = op.trim();
        let Some(table) = self.options.operations.as_ref() else {
            return Err(self.error(MalformedKind::NoOperationProvider));
        };
        let Some(op) = table.lookup(op_name).cloned() else {
            return Err(self.error(MalformedKind::UnknownOperation(op_name.to_string())));
        };
        let arg = arg.filter(|a| !a.trim().is_empty());
        match (op.arity(), arg.is_some()) {
            (Arity::Unary, false) => {
                return Err(self.error(MalformedKind::OperationArity {
                    name: op_name.to_string(),
                    requirement: "requires an argument",
                }))
            }
            (Arity::Nullary, true) => {
                return Err(self.error(MalformedKind::OperationArity {
                    name: op_name.to_string(),
                    requirement: "takes no argument",
                }))
            }
            _ => {}
        }
        let (arg, unknowns) = match arg {
            Some(text) => {
                let (source, unknowns) = self.source_of(text)?;
                (Some(source), unknowns)
            }
            None => (None, Vec::new()),
        };
        self.flush();
        self.emit_unknowns(unknowns);
        self.emit(Instr::Exec { op, arg });
        Ok(())
    }

    fn debug(&mut self, value: Option<&str>, compare: Option<&str>) -> Result<(), MalformedTemplate> {
        let value = match value.filter(|v| !v.trim().is_empty()) {
            Some(text) => {
                let (source, unknowns) = self.source_of(text)?;
                if !unknowns.is_empty() {
                    self.flush();
                    self.emit_unknowns(unknowns);
                }
                Some(source)
            }
            None => None,
        };
        self.flush();
        self.emit(Instr::Debug {
            value,
            compare: compare.map(|c| c.trim().to_string()),
        });
        Ok(())
    }
}
