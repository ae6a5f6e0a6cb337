//! Record sink abstraction.
//!
//! A `RecordSink` is the append-only destination of every record the
//! dispatcher reads.
//!
//! # Implementors
//!
//! - `AppendFileSink` (default): a file opened in append mode.
//! - `MemorySink`: an in-memory line buffer, for tests and embedding.
//!
//! **Contract:**
//! - `append()` writes the record bytes verbatim followed by
//!   `RECORD_SEPARATOR`, and hands them to the OS before returning.
//!   No fsync is implied.
//! - Records are never reordered, rewritten or truncated.

use std::io;

/// Written after every record.
pub const RECORD_SEPARATOR: u8 = b'\n';

pub trait RecordSink {
    /// Append one record.
    fn append(&mut self, record: &[u8]) -> io::Result<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn append(&mut self, record: &[u8]) -> io::Result<()> {
        (**self).append(record)
    }
}
