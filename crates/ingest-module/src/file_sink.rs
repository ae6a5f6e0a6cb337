//! `AppendFileSink` — default `RecordSink` implementation.
//!
//! The file is opened once in append mode (created if missing, never
//! truncated). Each record and its separator go through a small buffer
//! that is flushed before `append()` returns, so a record reaches the OS
//! in one `write(2)` in the common case and is visible to readers of the
//! file immediately. No fsync.

use ingest_core::sink::{RecordSink, RECORD_SEPARATOR};

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct AppendFileSink {
    path: PathBuf,
    out: BufWriter<File>,
}

impl AppendFileSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for AppendFileSink {
    fn append(&mut self, record: &[u8]) -> io::Result<()> {
        self.out.write_all(record)?;
        self.out.write_all(&[RECORD_SEPARATOR])?;
        self.out.flush()
    }
}
