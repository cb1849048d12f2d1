//! Call-frame tracking for nested template calls.
//!
//! Every `call` pushes a frame; return pops it. The depth check lives in
//! [`CallStack::push`], so runaway mutual recursion between templates turns
//! into [`RunError::RecursionLimitExceeded`] instead of unbounded growth.

use std::sync::Arc;

use otx_ir::{CallSiteId, Template};
use smallvec::SmallVec;

use crate::RunError;

/// One active call.
#[derive(Clone, Debug)]
pub(crate) struct CallFrame {
    pub callee: Arc<Template>,
    pub site: CallSiteId,
}

/// Live call stack of one `run`.
#[derive(Debug)]
pub(crate) struct CallStack<'t> {
    /// Name of the template `run` was invoked with.
    root: &'t str,
    frames: SmallVec<[CallFrame; 8]>,
    max_depth: usize,
}

impl<'t> CallStack<'t> {
    pub fn new(root: &'t str, max_depth: usize) -> Self {
        CallStack {
            root,
            frames: SmallVec::new(),
            max_depth,
        }
    }

    /// Push a frame, checking the depth limit. The frame is not pushed on
    /// overflow.
    pub fn push(&mut self, frame: CallFrame) -> Result<(), RunError> {
        if self.frames.len() >= self.max_depth {
            let mut chain = self.chain();
            chain.push(frame.callee.name().to_string());
            return Err(RunError::RecursionLimitExceeded {
                limit: self.max_depth,
                chain,
            });
        }
        tracing::trace!(
            callee = frame.callee.name(),
            site = frame.site.raw(),
            depth = self.frames.len() + 1,
            "enter call"
        );
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) {
        debug_assert!(!self.frames.is_empty(), "CallStack::pop() on empty stack");
        self.frames.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Template names from the root to the innermost call.
    pub fn chain(&self) -> Vec<String> {
        std::iter::once(self.root)
            .chain(self.frames.iter().map(|f| f.callee.name()))
            .map(str::to_string)
            .collect()
    }
}
