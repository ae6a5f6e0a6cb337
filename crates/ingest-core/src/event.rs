//! Readiness types shared by every poller implementation.
//!
//! A `Token` travels through the kernel's per-registration user data and
//! comes back with each ready event, so routing an event is a compare on
//! the token, never a lookup.

use std::fmt;
use std::os::fd::RawFd;

/// Identity of a registration.
///
/// Connections use their descriptor value; the listener and the shutdown
/// notifier use reserved values no descriptor can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Token(pub u64);

impl Token {
    pub const LISTENER: Self = Self(u64::MAX);
    pub const SHUTDOWN: Self = Self(u64::MAX - 1);

    #[inline]
    pub fn from_fd(fd: RawFd) -> Self {
        debug_assert!(fd >= 0);
        Self(fd as u64)
    }

    /// The descriptor behind a connection token; `None` for reserved tokens.
    #[inline]
    pub fn as_fd(self) -> Option<RawFd> {
        RawFd::try_from(self.0).ok()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Token::LISTENER => write!(f, "listener"),
            Token::SHUTDOWN => write!(f, "shutdown"),
            Token(v) => write!(f, "fd {}", v),
        }
    }
}

/// Readiness a registration asks to be woken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest(u8);

impl Interest {
    pub const READABLE: Self = Self(1 << 0);
    /// Peer shut down its write half (`EPOLLRDHUP`).
    pub const HALF_CLOSE: Self = Self(1 << 1);
    /// Report transitions only instead of every wait while the condition holds.
    pub const EDGE: Self = Self(1 << 2);

    /// What every admitted connection watches: level-triggered.
    pub const CONNECTION: Self = Self(Self::READABLE.0 | Self::HALF_CLOSE.0);
    /// What the listener watches: edge-triggered, so accepts must drain.
    pub const LISTENER: Self = Self(Self::READABLE.0 | Self::HALF_CLOSE.0 | Self::EDGE.0);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_edge_triggered(self) -> bool {
        self.contains(Self::EDGE)
    }
}


/// Readiness reported for one registration in one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub readable: bool,
    pub half_closed: bool,
    pub hung_up: bool,
    pub error: bool,
}

impl Readiness {
    pub const READABLE: Self = Self {
        readable: true,
        half_closed: false,
        hung_up: false,
        error: false,
    };

    /// Any condition after which the peer can send nothing more.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.half_closed || self.hung_up || self.error
    }
}

/// One entry of a wait batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessEvent {
    pub token: Token,
    pub readiness: Readiness,
}

impl ReadinessEvent {
    pub fn new(token: Token, readiness: Readiness) -> Self {
        Self { token, readiness }
    }
}
