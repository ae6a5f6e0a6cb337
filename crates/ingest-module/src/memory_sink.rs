//! `MemorySink` — in-memory `RecordSink`.
//!
//! Keeps every appended record (without the separator) in order. The
//! record list is behind an `Arc<Mutex<_>>` so a test can keep a reader
//! handle while the sink itself moves into the reactor thread.

use ingest_core::sink::RecordSink;

use std::io;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, through any clone.
    pub fn lines(&self) -> Vec<Vec<u8>> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Lines decoded lossily as UTF-8.
    pub fn lines_lossy(&self) -> Vec<String> {
        self.lines()
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect()
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &[u8]) -> io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?;
        lines.push(record.to_vec());
        Ok(())
    }
}
