//! `EpollPoller` — default `Poller` implementation.
//!
//! Thin wrapper over `epoll(7)`. The token is stored in the event's 64-bit
//! user data and handed back untouched, so the reactor routes events
//! without a lookup.
//!
//! Interest mapping:
//!
//! | Interest     | epoll flag    |
//! |--------------|---------------|
//! | `READABLE`   | `EPOLLIN`     |
//! | `HALF_CLOSE` | `EPOLLRDHUP`  |
//! | `EDGE`       | `EPOLLET`     |
//!
//! `EPOLLHUP` and `EPOLLERR` are always reported by the kernel and surface
//! as `Readiness::hung_up` / `Readiness::error`.

use ingest_core::event::{Interest, Readiness, ReadinessEvent, Token};
use ingest_core::poller::Poller;

use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};

use std::io;
use std::os::fd::BorrowedFd;

pub struct EpollPoller {
    epoll: Epoll,
    /// Kernel-filled event buffer; its length bounds every batch.
    events: Vec<EpollEvent>,
}

/// Upper bound on the per-wait event buffer.
pub const MAX_BATCH: usize = 4096;

impl EpollPoller {
    /// Create an epoll instance that yields at most `max_events` per wait,
    /// clamped to `1..=MAX_BATCH`.
    pub fn new(max_events: usize) -> io::Result<Self> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)?;
        Ok(Self {
            epoll,
            events: vec![EpollEvent::empty(); max_events.clamp(1, MAX_BATCH)],
        })
    }

    fn flags_for(interest: Interest) -> EpollFlags {
        let mut flags = EpollFlags::empty();
        if interest.contains(Interest::READABLE) {
            flags |= EpollFlags::EPOLLIN;
        }
        if interest.contains(Interest::HALF_CLOSE) {
            flags |= EpollFlags::EPOLLRDHUP;
        }
        if interest.is_edge_triggered() {
            flags |= EpollFlags::EPOLLET;
        }
        flags
    }

    fn readiness_of(flags: EpollFlags) -> Readiness {
        Readiness {
            readable: flags.contains(EpollFlags::EPOLLIN),
            half_closed: flags.contains(EpollFlags::EPOLLRDHUP),
            hung_up: flags.contains(EpollFlags::EPOLLHUP),
            error: flags.contains(EpollFlags::EPOLLERR),
        }
    }
}

impl Poller for EpollPoller {
    fn register(&mut self, fd: BorrowedFd<'_>, token: Token, interest: Interest) -> io::Result<()> {
        let event = EpollEvent::new(Self::flags_for(interest), token.0);
        self.epoll.add(fd, event)?;
        Ok(())
    }

    fn reregister(&mut self, fd: BorrowedFd<'_>, token: Token, interest: Interest) -> io::Result<()> {
        let mut event = EpollEvent::new(Self::flags_for(interest), token.0);
        self.epoll.modify(fd, &mut event)?;
        Ok(())
    }

    fn deregister(&mut self, fd: BorrowedFd<'_>) -> io::Result<()> {
        self.epoll.delete(fd)?;
        Ok(())
    }

    fn wait(&mut self, out: &mut Vec<ReadinessEvent>) -> io::Result<usize> {
        let n = self.epoll.wait(&mut self.events, EpollTimeout::NONE)?;
        out.extend(self.events[..n].iter().map(|ev| {
            ReadinessEvent::new(Token(ev.data()), Self::readiness_of(ev.events()))
        }));
        Ok(n)
    }

    fn capacity(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::Shutdown;
    use std::os::fd::AsFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn readable_after_peer_write() {
        let mut poller = EpollPoller::new(4).unwrap();
        let (a, mut b) = UnixStream::pair().unwrap();
        poller.register(a.as_fd(), Token(7), Interest::CONNECTION).unwrap();

        b.write_all(b"hello").unwrap();
        let mut out = Vec::new();
        let n = poller.wait(&mut out).unwrap();

        assert_eq!(n, 1);
        assert_eq!(out[0].token, Token(7));
        assert!(out[0].readiness.readable);
        assert!(!out[0].readiness.is_closed());
    }

    #[test]
    fn level_triggered_renotifies_until_drained() {
        let mut poller = EpollPoller::new(4).unwrap();
        let (a, mut b) = UnixStream::pair().unwrap();
        poller.register(a.as_fd(), Token(1), Interest::CONNECTION).unwrap();
        b.write_all(b"x").unwrap();

        let mut out = Vec::new();
        poller.wait(&mut out).unwrap();
        poller.wait(&mut out).unwrap();

        // Nothing was read in between, so both waits report the same fd.
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|e| e.token == Token(1) && e.readiness.readable));
    }

    #[test]
    fn half_close_is_reported() {
        let mut poller = EpollPoller::new(4).unwrap();
        let (a, b) = UnixStream::pair().unwrap();
        poller.register(a.as_fd(), Token(3), Interest::CONNECTION).unwrap();

        b.shutdown(Shutdown::Write).unwrap();
        let mut out = Vec::new();
        poller.wait(&mut out).unwrap();

        assert!(out[0].readiness.half_closed);
        assert!(out[0].readiness.is_closed());
    }

    #[test]
    fn batch_is_bounded_by_capacity() {
        let mut poller = EpollPoller::new(2).unwrap();
        let mut pairs = Vec::new();
        for i in 0..3 {
            let (a, mut b) = UnixStream::pair().unwrap();
            poller.register(a.as_fd(), Token(i), Interest::CONNECTION).unwrap();
            b.write_all(b"!").unwrap();
            pairs.push((a, b));
        }

        let mut out = Vec::new();
        assert_eq!(poller.capacity(), 2);
        assert_eq!(poller.wait(&mut out).unwrap(), 2);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn deregistered_fd_is_silent_and_reregister_changes_interest() {
        let mut poller = EpollPoller::new(4).unwrap();
        let (a, mut b) = UnixStream::pair().unwrap();
        let (c, mut d) = UnixStream::pair().unwrap();
        poller.register(a.as_fd(), Token(1), Interest::CONNECTION).unwrap();
        poller.register(c.as_fd(), Token(2), Interest::CONNECTION).unwrap();
        poller.deregister(a.as_fd()).unwrap();
        poller.reregister(c.as_fd(), Token(5), Interest::CONNECTION).unwrap();

        b.write_all(b"ignored").unwrap();
        d.write_all(b"seen").unwrap();
        let mut out = Vec::new();
        poller.wait(&mut out).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].token, Token(5));
    }

    #[test]
    fn event_buffer_is_clamped() {
        assert_eq!(EpollPoller::new(0).unwrap().capacity(), 1);
        assert_eq!(EpollPoller::new(usize::MAX).unwrap().capacity(), MAX_BATCH);
    }

    #[test]
    fn double_register_fails() {
        let mut poller = EpollPoller::new(1).unwrap();
        let (a, _b) = UnixStream::pair().unwrap();
        poller.register(a.as_fd(), Token(1), Interest::CONNECTION).unwrap();
        let err = poller.register(a.as_fd(), Token(1), Interest::CONNECTION).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EEXIST));
    }
}
