//! Name to slot mapping.

use rustc_hash::FxHashMap;

use crate::SlotId;

/// Variable slots of one template, in allocation order.
///
/// Parameters come first, in declaration order, so callers can bind
/// positionally. A name is allocated once; later `for`/`set` uses of the same
/// name share the slot.
#[derive(Clone, Debug, Default)]
pub struct SlotMap {
    names: Vec<String>,
    index: FxHashMap<String, SlotId>,
}

impl SlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a name, allocating a new slot if it has none yet.
    pub fn intern(&mut self, name: &str) -> SlotId {
        if let Some(&slot) = self.index.get(name) {
            return slot;
        }
        let slot = SlotId::new(u32::try_from(self.names.len()).unwrap_or(u32::MAX));
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), slot);
        slot
    }

    #[inline]
    pub fn lookup(&self, name: &str) -> Option<SlotId> {
        self.index.get(name).copied()
    }

    pub fn name_of(&self, slot: SlotId) -> Option<&str> {
        self.names.get(slot.index()).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Slots in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (SlotId::new(u32::try_from(i).unwrap_or(u32::MAX)), name.as_str()))
    }
}
