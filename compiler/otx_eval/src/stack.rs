//! Stack growth for nested template calls.
//!
//! Every `call` recurses into the interpreter. The call-depth ceiling bounds
//! how far, but a generous ceiling with large frames can still exhaust the
//! native stack, so each nested call runs through `stacker`.
//!
//! WASM has its own stack management and no `stacker` support.

/// Run `f`, growing the stack first if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (64KB red zone).
    const RED_ZONE: usize = 64 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
