//! Readiness multiplexer abstraction.
//!
//! A `Poller` owns the interest set: which descriptors are watched, for
//! which readiness, under which token. The reactor blocks in `wait()` and
//! nowhere else.
//!
//! # Implementors
//!
//! - `EpollPoller` (default, Linux): `epoll(7)`. Honors `Interest::EDGE`
//!   with `EPOLLET`; everything else is level-triggered.
//!
//! **Contract:**
//! - A descriptor is registered at most once; `reregister` and `deregister`
//!   are only called for registered descriptors.
//! - `wait()` appends at most `capacity()` events to `out` per call, in the
//!   order the OS reported them, and returns how many it appended.
//! - `wait()` with no ready descriptor blocks until one becomes ready;
//!   an interrupted wait returns `ErrorKind::Interrupted`.

use std::io;
use std::os::fd::BorrowedFd;

use crate::event::{Interest, ReadinessEvent, Token};

pub trait Poller {
    /// Start watching `fd` for `interest`, tagging its events with `token`.
    fn register(&mut self, fd: BorrowedFd<'_>, token: Token, interest: Interest) -> io::Result<()>;

    /// Replace the interest of an already registered descriptor (re-arm).
    fn reregister(&mut self, fd: BorrowedFd<'_>, token: Token, interest: Interest) -> io::Result<()>;

    /// Stop watching `fd`.
    fn deregister(&mut self, fd: BorrowedFd<'_>) -> io::Result<()>;

    /// Block until at least one event is ready and append the batch to `out`.
    fn wait(&mut self, out: &mut Vec<ReadinessEvent>) -> io::Result<usize>;

    /// Maximum number of events a single `wait()` yields.
    fn capacity(&self) -> usize;
}
