//! Leveled stderr logging for ingestd
//!
//! Every line is written under the stderr lock, tagged with its level and
//! the process id (the daemon forks twice, so the pid in the log is the one
//! to signal).
//!
//! # Environment Variables
//!
//! - `INGEST_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0..5)
//! - `INGEST_FLUSH_EPRINT=1` - flush stderr after each line (useful when
//!   stderr is redirected to a file by the daemon layer)
//!
//! # Usage
//!
//! ```ignore
//! use ingest_core::{log_debug, log_error, log_info};
//!
//! log_info!("listening on {}", addr);
//! log_debug!("fd={} admitted ({} live)", fd, live);
//! log_error!("epoll_wait failed: {}", err);
//! ```

use crate::env::env_get_bool;

use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

/// Log levels, lowest is most severe.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a level name or digit. Unknown strings yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN ",
            LogLevel::Info => "INFO ",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

// One byte of filter state: the level in the low bits, FLUSH_BIT on top.
// UNSET until the environment has been read.
const UNSET: u8 = u8::MAX;
const FLUSH_BIT: u8 = 0x80;
static FILTER: AtomicU8 = AtomicU8::new(UNSET);

fn filter_from_env() -> u8 {
    let level = std::env::var("INGEST_LOG_LEVEL")
        .ok()
        .and_then(|v| LogLevel::parse(&v))
        .unwrap_or(LogLevel::Info);
    let flush = if env_get_bool("INGEST_FLUSH_EPRINT", false) { FLUSH_BIT } else { 0 };
    level as u8 | flush
}

#[inline]
fn filter() -> u8 {
    match FILTER.load(Ordering::Relaxed) {
        UNSET => {
            let f = filter_from_env();
            FILTER.store(f, Ordering::Relaxed);
            f
        }
        f => f,
    }
}

/// Re-read `INGEST_LOG_LEVEL` / `INGEST_FLUSH_EPRINT`.
///
/// The first log call reads them lazily; call this at startup to pin the
/// values before the daemon layer touches stderr.
pub fn init() {
    FILTER.store(filter_from_env(), Ordering::Relaxed);
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && (level as u8) <= (filter() & !FLUSH_BIT)
}

#[doc(hidden)]
pub fn _log_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    let f = filter();
    if level == LogLevel::Off || (level as u8) > (f & !FLUSH_BIT) {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = write!(handle, "[{}] ingestd[{}]: ", level.tag(), std::process::id());
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if f & FLUSH_BIT != 0 {
        let _ = handle.flush();
    }
}

// ============================================================================
// Public Macros
// ============================================================================

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        $crate::logging::_log_impl($crate::logging::LogLevel::Error, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        $crate::logging::_log_impl($crate::logging::LogLevel::Warn, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        $crate::logging::_log_impl($crate::logging::LogLevel::Info, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        $crate::logging::_log_impl($crate::logging::LogLevel::Debug, format_args!($($arg)*));
    }};
}

/// Per-record chatter.
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        $crate::logging::_log_impl($crate::logging::LogLevel::Trace, format_args!($($arg)*));
    }};
}
