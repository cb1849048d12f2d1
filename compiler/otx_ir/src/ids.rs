//! Index newtypes for the command model.
//!
//! Every cross-reference inside a compiled template is an integer index,
//! never a pointer: slots index the context's slot array, call sites index
//! the context's sub-context cache, and expression ids index the template's
//! expression arena.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

macro_rules! index_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create from a raw index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Index into the owning array.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Raw u32 value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

index_newtype!(
    /// Index of a variable slot within an execution context.
    ///
    /// Declared parameters occupy the first slots in declaration order;
    /// loop variables and `set` targets follow in first-use order.
    SlotId
);

index_newtype!(
    /// Static index of a `call` instruction, used as the sub-context cache key.
    CallSiteId
);

index_newtype!(
    /// Index into a template's expression arena.
    ExprId
);

/// Process-unique template identity.
///
/// Contexts remember the id of the template they were built for so the
/// interpreter can reject a context paired with the wrong template.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TemplateId(u32);

static NEXT_TEMPLATE_ID: AtomicU32 = AtomicU32::new(1);

impl TemplateId {
    /// Allocate a fresh id.
    pub fn fresh() -> Self {
        TemplateId(NEXT_TEMPLATE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
