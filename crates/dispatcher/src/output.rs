//! Destination streams and the write lock shared by every worker

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type BoxedWriter = Box<dyn Write + Send>;

/// Append-only line destination shared by the workers of one sink.
///
/// The underlying writer is released when the last clone is dropped, i.e.
/// once every worker of the sink has stopped.
#[derive(Clone)]
pub struct Destination {
    label: String,
    writer: Arc<Mutex<BoxedWriter>>,
}

impl Destination {
    pub fn new(label: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            label: label.into(),
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Process standard output
    pub fn stdout() -> Self {
        Self::new("stdout", io::stdout())
    }

    /// In-memory destination plus a handle to read back what was written
    pub fn memory(label: impl Into<String>) -> (Self, MemoryBuffer) {
        let buffer = MemoryBuffer::default();
        (Self::new(label, buffer.clone()), buffer)
    }

    /// Human-readable target (`stdout`, a file path, ...)
    pub fn label(&self) -> &str {
        &self.label
    }

    fn lock(&self) -> MutexGuard<'_, BoxedWriter> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Serializes line writes across all workers of all sinks.
///
/// Created once by the caller and cloned into every sink, so that two workers
/// writing to the same terminal can never interleave inside a line.
/// Acquisition ignores poisoning: a worker that panicked mid-write does not
/// take the lock away from the others.
#[derive(Clone, Default)]
pub struct WriteLock {
    inner: Arc<Mutex<()>>,
}

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `line` plus `\n` and flush, atomically with respect to every
    /// other holder of this lock.
    pub fn write_line(&self, destination: &Destination, line: &str) -> io::Result<()> {
        let _guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut writer = destination.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Flush the destination under the lock
    pub fn flush(&self, destination: &Destination) -> io::Result<()> {
        let _guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        destination.lock().flush()
    }

    /// Whether two handles refer to the same lock
    pub fn same_lock(&self, other: &WriteLock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for WriteLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteLock")
            .field("holders", &Arc::strong_count(&self.inner))
            .finish()
    }
}

/// Growable in-memory byte sink, readable while shared
#[derive(Clone, Default)]
pub struct MemoryBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBuffer {
    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Written lines, without terminators
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
