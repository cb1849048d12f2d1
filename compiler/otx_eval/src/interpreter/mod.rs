//! The interpreter.
//!
//! Walks a template's instruction list by index. Control instructions carry
//! backpatched offsets, so branches and loops are plain index arithmetic:
//!
//! - `If`/`Elsif` true: run `[i + 1, i + next)`, then continue at `i + end`.
//! - `If`/`Elsif` false: continue at `i + next` (the following link, the
//!   `Else`, or the end of the chain).
//! - `For`: run `[i + 1, i + end - 1)` once per element (the last
//!   instruction of the range is `EndFor`), then continue at `i + end`.
//!
//! Data problems never abort a run; they render as placeholders. Only a
//! context mismatch, the call-depth ceiling, and a failing sink do.

mod builder;

pub use builder::{InterpreterBuilder, DEFAULT_MAX_CALL_DEPTH};

use std::fmt;
use std::sync::Arc;

use otx_ir::{CallInstr, CallTarget, Instr, Loop, Operation, SlotId, Template, Value, ValueSource};
use smallvec::SmallVec;
use tracing::debug;

use crate::context::{Context, DebugEvent};
use crate::diagnostics::{CallFrame, CallStack};
use crate::errors::{DataError, DataErrorKind, RunError};
use crate::resolve::Resolver;
use crate::stack::ensure_sufficient_stack;

/// Executes compiled templates. Holds only policy, so one interpreter can
/// serve any number of concurrent runs.
#[derive(Clone, Debug)]
pub struct Interpreter {
    max_call_depth: usize,
    placeholders: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Run `template` against `ctx`, writing to `out`.
    ///
    /// Fails with [`RunError::ContextMismatch`] before writing anything if
    /// `ctx` was not created for `template`.
    #[tracing::instrument(level = "debug", skip_all, fields(template = template.name()))]
    pub fn run(
        &self,
        template: &Template,
        ctx: &mut Context,
        out: &mut dyn fmt::Write,
    ) -> Result<(), RunError> {
        if !ctx.is_for(template) {
            return Err(RunError::ContextMismatch {
                template: template.name().to_string(),
                expected: template.id(),
                found: ctx.template_id(),
            });
        }
        let mut machine = Machine {
            config: self,
            out,
            stack: CallStack::new(template.name(), self.max_call_depth),
        };
        machine.exec_range(template, ctx, 0, template.instrs().len())
    }

    /// Run into a fresh `String`.
    pub fn render(&self, template: &Template, ctx: &mut Context) -> Result<String, RunError> {
        let mut out = String::new();
        self.run(template, ctx, &mut out)?;
        Ok(out)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one `run`.
struct Machine<'a> {
    config: &'a Interpreter,
    out: &'a mut dyn fmt::Write,
    stack: CallStack<'a>,
}

impl Machine<'_> {
    fn exec_range(
        &mut self,
        t: &Template,
        ctx: &mut Context,
        start: usize,
        end: usize,
    ) -> Result<(), RunError> {
        let instrs = t.instrs();
        let end = end.min(instrs.len());
        let mut pc = start;
        while pc < end {
            match &instrs[pc] {
                Instr::Literal(text) => self.out.write_str(text)?,
                Instr::Variable(source) => self.variable(t, ctx, source)?,
                Instr::If(branch) | Instr::Elsif(branch) => {
                    let next = pc + branch.next as usize;
                    if self.condition(t, ctx, &branch.cond)? {
                        self.exec_range(t, ctx, pc + 1, next)?;
                        pc += branch.end as usize;
                    } else {
                        pc = next;
                    }
                    continue;
                }
                // Fall-through from the last false link; the body follows.
                Instr::Else | Instr::EndFor => {}
                Instr::For(lp) => {
                    self.for_loop(t, ctx, pc, lp)?;
                    pc += lp.end as usize;
                    continue;
                }
                Instr::Set { value, target } => {
                    let value = match Resolver::new(t, ctx).source(value) {
                        Ok(value) => value,
                        Err(err) => {
                            self.data_error(t, &err)?;
                            Value::Null
                        }
                    };
                    ctx.store(*target, value);
                }
                Instr::Call(call) => self.call(t, ctx, call)?,
                Instr::Exec { op, arg } => self.exec_operation(t, ctx, op, arg.as_ref())?,
                Instr::Debug { value, compare } => {
                    Self::debug_hook(t, ctx, pc, value.as_ref(), compare.as_deref());
                }
            }
            pc += 1;
        }
        Ok(())
    }

    /// An absent value is reported like a failed lookup.
    fn variable(&mut self, t: &Template, ctx: &Context, source: &ValueSource) -> Result<(), RunError> {
        let resolver = Resolver::new(t, ctx);
        match resolver.source(source) {
            Ok(Value::Null) => {
                let err = DataError::new(resolver.source_text(source), DataErrorKind::NoValue);
                self.data_error(t, &err)
            }
            Ok(value) => {
                write!(self.out, "{value}")?;
                Ok(())
            }
            Err(err) => self.data_error(t, &err),
        }
    }

    /// A failed condition counts as false.
    fn condition(&mut self, t: &Template, ctx: &Context, cond: &ValueSource) -> Result<bool, RunError> {
        match Resolver::new(t, ctx).source(cond) {
            Ok(value) => Ok(value.is_truthy()),
            Err(err) => {
                self.data_error(t, &err)?;
                Ok(false)
            }
        }
    }

    /// Lookahead iteration: `entry_next` holds the element after `entry`, or
    /// null on the last pass.
    fn for_loop(&mut self, t: &Template, ctx: &mut Context, pc: usize, lp: &Loop) -> Result<(), RunError> {
        let container = match Resolver::new(t, ctx).source(&lp.container) {
            Ok(value) => value,
            Err(err) => return self.data_error(t, &err),
        };
        let mut elements: Box<dyn Iterator<Item = Value> + '_> = match &container {
            // Unknown container names lower to null and are reported at
            // compile time, so null iterates zero times without a placeholder.
            Value::Null => return Ok(()),
            Value::List(items) => Box::new(items.iter().cloned()),
            Value::Map(entries) => Box::new(entries.values().cloned()),
            Value::Object(obj) => match obj.elements() {
                Some(elements) => elements,
                None => return self.not_a_container(t, ctx, lp, &container),
            },
            other => return self.not_a_container(t, ctx, lp, other),
        };

        let body_start = pc + 1;
        let body_end = (pc + lp.end as usize).saturating_sub(1);
        let mut next = elements.next();
        while let Some(entry) = next.take() {
            next = elements.next();
            ctx.store(lp.entry, entry);
            ctx.store(lp.entry_next, next.clone().unwrap_or_default());
            self.exec_range(t, ctx, body_start, body_end)?;
        }
        Ok(())
    }

    fn not_a_container(
        &mut self,
        t: &Template,
        ctx: &Context,
        lp: &Loop,
        value: &Value,
    ) -> Result<(), RunError> {
        let subject = Resolver::new(t, ctx).source_text(&lp.container);
        let err = DataError::new(subject, DataErrorKind::NotAContainer(value.type_name().to_string()));
        self.data_error(t, &err)
    }

    fn call(&mut self, t: &Template, ctx: &mut Context, call: &CallInstr) -> Result<(), RunError> {
        let callee = match self.callee(t, ctx, &call.target) {
            Ok(callee) => callee,
            Err(err) => return self.data_error(t, &err),
        };

        // Arguments are evaluated in the caller before the callee's context
        // is touched.
        let mut args: SmallVec<[(Option<SlotId>, &str, Value); 4]> = SmallVec::new();
        for arg in &call.args {
            let value = match Resolver::new(t, ctx).source(&arg.value) {
                Ok(value) => value,
                Err(err) => {
                    self.data_error(t, &err)?;
                    Value::Null
                }
            };
            args.push((arg.slot, arg.name.as_str(), value));
        }

        self.stack.push(CallFrame {
            callee: Arc::clone(&callee),
            site: call.site,
        })?;
        let sub = ctx.sub_context(call.site, &callee);
        let mut result = Ok(());
        for (slot, name, value) in args {
            match slot {
                Some(slot) => sub.store(slot, value),
                None => {
                    if sub.set(name, value).is_err() {
                        let err = DataError::new(
                            name,
                            DataErrorKind::UnknownParameter {
                                template: callee.name().to_string(),
                                param: name.to_string(),
                            },
                        );
                        result = self.data_error(t, &err);
                        if result.is_err() {
                            break;
                        }
                    }
                }
            }
        }
        if result.is_ok() {
            result = ensure_sufficient_stack(|| self.exec_range(&callee, sub, 0, callee.instrs().len()));
        }
        self.stack.pop();
        result
    }

    fn callee(&self, t: &Template, ctx: &Context, target: &CallTarget) -> Result<Arc<Template>, DataError> {
        match target {
            CallTarget::Static(callee) => Ok(Arc::clone(callee)),
            CallTarget::Named(name) => {
                let Some(registry) = t.registry() else {
                    return Err(DataError::new(name.as_str(), DataErrorKind::RegistryDropped));
                };
                registry
                    .resolve(name)
                    .ok_or_else(|| DataError::new(name.as_str(), DataErrorKind::UnknownTemplate))
            }
            CallTarget::Slot(slot) => match ctx.slot(*slot) {
                Some(Value::Template(callee)) => Ok(Arc::clone(callee)),
                other => {
                    let name = t.slots().name_of(*slot).unwrap_or("?");
                    let found = other.map_or("null", Value::type_name);
                    Err(DataError::new(name, DataErrorKind::NotATemplate(found.to_string())))
                }
            },
        }
    }

    /// Invoke a host operation against the context's operation target.
    /// A non-null result is rendered like a variable.
    fn exec_operation(
        &mut self,
        t: &Template,
        ctx: &Context,
        op: &Operation,
        arg: Option<&ValueSource>,
    ) -> Result<(), RunError> {
        let arg = match arg.map(|source| Resolver::new(t, ctx).source(source)) {
            Some(Ok(value)) => Some(value),
            Some(Err(err)) => return self.data_error(t, &err),
            None => None,
        };
        let target = ctx.operation_target();
        if let Some(table) = t.operations() {
            if target.type_name() != table.type_name() {
                let err = DataError::new(
                    op.name(),
                    DataErrorKind::OperationTarget {
                        expected: table.type_name().to_string(),
                        found: target.type_name().to_string(),
                    },
                );
                return self.data_error(t, &err);
            }
        }
        match op.invoke(target, arg.as_ref()) {
            Ok(Value::Null) => Ok(()),
            Ok(value) => {
                write!(self.out, "{value}")?;
                Ok(())
            }
            Err(message) => {
                let err = DataError::new(op.name(), DataErrorKind::OperationFailed(message));
                self.data_error(t, &err)
            }
        }
    }

    /// Never writes output.
    fn debug_hook(
        t: &Template,
        ctx: &Context,
        index: usize,
        value: Option<&ValueSource>,
        compare: Option<&str>,
    ) {
        let value = value.map(|source| Resolver::new(t, ctx).source(source).unwrap_or_default());
        debug!(template = t.name(), index, value = ?value, compare, "debug marker");
        let Some(trigger) = ctx.debug_trigger() else {
            return;
        };
        if let Some(expected) = compare {
            let rendered = value.as_ref().map(ToString::to_string).unwrap_or_default();
            if rendered != expected {
                return;
            }
        }
        trigger.fire(&DebugEvent {
            template: t.name(),
            index,
            value: value.as_ref(),
            compare,
        });
    }

    /// Log a recovered failure and render its placeholder.
    fn data_error(&mut self, t: &Template, err: &DataError) -> Result<(), RunError> {
        debug!(
            template = t.name(),
            subject = %err.subject,
            reason = %err.kind,
            depth = self.stack.depth(),
            "data resolution failed"
        );
        if self.config.placeholders {
            self.out.write_str(&err.placeholder())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
