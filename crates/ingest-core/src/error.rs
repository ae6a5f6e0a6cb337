//! ingestd error types.
//!
//! Only fatal conditions are errors. A rejected admission or a torn-down
//! connection is a normal outcome of the loop and never surfaces here.

use std::fmt;
use std::io;
use std::os::fd::RawFd;

#[derive(Debug)]
pub enum IngestError {
    /// Socket, bind, listen, epoll or eventfd setup, or sink open failed.
    Startup { op: &'static str, source: io::Error },
    /// Unexpected read error on a connection under the abort policy.
    ReadFatal { fd: RawFd, source: io::Error },
    /// The readiness wait itself failed.
    Wait(io::Error),
    /// Appending a record to the sink failed.
    Sink(io::Error),
    /// Interest-set mutation failed for a live connection.
    Poller { op: &'static str, source: io::Error },
    /// Invalid configuration.
    Config(String),
}

impl IngestError {
    pub fn startup(op: &'static str, source: io::Error) -> Self {
        Self::Startup { op, source }
    }

    pub fn poller(op: &'static str, source: io::Error) -> Self {
        Self::Poller { op, source }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup { op, source } => write!(f, "startup: {} failed: {}", op, source),
            Self::ReadFatal { fd, source } => write!(f, "read on fd {} failed: {}", fd, source),
            Self::Wait(e) => write!(f, "readiness wait failed: {}", e),
            Self::Sink(e) => write!(f, "sink append failed: {}", e),
            Self::Poller { op, source } => write!(f, "poller {} failed: {}", op, source),
            Self::Config(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Startup { source, .. }
            | Self::ReadFatal { source, .. }
            | Self::Poller { source, .. } => Some(source),
            Self::Wait(e) | Self::Sink(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
