//! Output sinks.
//!
//! The interpreter writes to any [`fmt::Write`]. Two adapters cover the
//! common cases:
//! - [`IoSink`]: wraps an [`io::Write`] (stdout, a file, a socket).
//! - [`BufferSink`]: a shared in-memory buffer for capture and tests.

use std::fmt;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

/// Adapts a byte writer to the interpreter's character sink.
///
/// `fmt::Error` carries no detail, so the first I/O error is kept and can be
/// taken after the run.
pub struct IoSink<W: io::Write> {
    inner: W,
    error: Option<io::Error>,
}

impl<W: io::Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        IoSink { inner, error: None }
    }

    /// The I/O error that made a write fail, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> fmt::Write for IoSink<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.error.is_some() {
            return Err(fmt::Error);
        }
        self.inner.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

/// Sink that captures output to a buffer.
///
/// Clones share the same buffer, so one handle can be given to a render
/// running on another thread while the original reads the result.
#[derive(Clone, Default)]
pub struct BufferSink {
    buffer: Arc<Mutex<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Take the captured output, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

impl fmt::Write for BufferSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.lock().push_str(s);
        Ok(())
    }
}

impl fmt::Debug for BufferSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferSink").field("len", &self.len()).finish()
    }
}
