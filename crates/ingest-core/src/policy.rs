//! Dispatcher policies for the two read outcomes that have no single
//! obvious handling.
//!
//! Defaults: an unexpected read error stops the process, and a would-block
//! read after a readable event is treated as a disconnect.

use std::fmt;
use std::str::FromStr;

/// What an unexpected read error on one connection does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadErrorPolicy {
    /// Stop the whole server. One misbehaving peer ends service for all.
    #[default]
    Abort,
    /// Tear down the offending connection only and keep serving.
    DropConnection,
}

/// What a read that reports "would block" on a readable connection does.
///
/// On a level-triggered descriptor a read is only attempted after the
/// poller reported data, so this outcome is anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WouldBlockPolicy {
    /// Treat it as a client disconnect.
    #[default]
    Disconnect,
    /// Keep the connection and wait for the next readiness report.
    Ignore,
}

/// An unrecognised policy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(pub String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown policy {:?}", self.0)
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for ReadErrorPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" | "kill" | "fatal" => Ok(Self::Abort),
            "drop" | "drop-connection" | "teardown" => Ok(Self::DropConnection),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl FromStr for WouldBlockPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disconnect" | "close" => Ok(Self::Disconnect),
            "ignore" | "retry" => Ok(Self::Ignore),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl fmt::Display for ReadErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "abort",
            Self::DropConnection => "drop",
        })
    }
}

impl fmt::Display for WouldBlockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnect => "disconnect",
            Self::Ignore => "ignore",
        })
    }
}
