//! Compiled templates.
//!
//! A [`Template`] is immutable once built: an instruction list, the
//! expression arena those instructions point into, and the slot map that
//! every execution context for it is laid out from. It may be rendered by any
//! number of contexts concurrently.

mod disasm;

use std::sync::{Arc, Weak};

use crate::{ExprArena, Instr, OperationTable, SlotId, SlotMap, TemplateId, TemplateRegistry};

/// Everything the compiler produces for one template.
#[derive(Debug, Default)]
pub struct TemplateParts {
    pub name: String,
    pub params: usize,
    pub instrs: Vec<Instr>,
    pub exprs: ExprArena,
    pub slots: SlotMap,
    pub call_sites: u32,
    pub registry: Option<Weak<TemplateRegistry>>,
    pub operations: Option<Arc<OperationTable>>,
}

/// An immutable compiled instruction program plus its variable-slot map.
#[derive(Debug)]
pub struct Template {
    id: TemplateId,
    name: String,
    params: usize,
    instrs: Vec<Instr>,
    exprs: ExprArena,
    slots: Arc<SlotMap>,
    call_sites: u32,
    registry: Option<Weak<TemplateRegistry>>,
    operations: Option<Arc<OperationTable>>,
}

impl Template {
    /// Seal compiler output into a template with a fresh id.
    pub fn new(parts: TemplateParts) -> Self {
        Template {
            id: TemplateId::fresh(),
            name: parts.name,
            params: parts.params,
            instrs: parts.instrs,
            exprs: parts.exprs,
            slots: Arc::new(parts.slots),
            call_sites: parts.call_sites,
            registry: parts.registry,
            operations: parts.operations,
        }
    }

    #[inline]
    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    #[inline]
    pub fn exprs(&self) -> &ExprArena {
        &self.exprs
    }

    pub fn slots(&self) -> &Arc<SlotMap> {
        &self.slots
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Declared parameters, in declaration order.
    pub fn params(&self) -> impl Iterator<Item = (SlotId, &str)> {
        self.slots.iter().take(self.params)
    }

    pub fn param_count(&self) -> usize {
        self.params
    }

    #[inline]
    pub fn call_site_count(&self) -> usize {
        self.call_sites as usize
    }

    /// The registry used for run-time `call` resolution, if it is still alive.
    pub fn registry(&self) -> Option<Arc<TemplateRegistry>> {
        self.registry.as_ref().and_then(Weak::upgrade)
    }

    /// Whether this template was compiled against a run-time registry at all.
    pub fn has_registry(&self) -> bool {
        self.registry.is_some()
    }

    pub fn operations(&self) -> Option<&Arc<OperationTable>> {
        self.operations.as_ref()
    }

    /// Human-readable instruction listing.
    pub fn disassemble(&self) -> String {
        disasm::disassemble(self)
    }
}
