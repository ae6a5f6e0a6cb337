//! Read dispatcher: the per-connection state machine.
//!
//! A connection is `Open` while it is in the table. Handling one ready
//! event either leaves it `Open` or takes it through `Closing` (removed,
//! deregistered, shut down, closed) before returning; there is no state in
//! between.
//!
//! Connections are level-triggered, so one bounded read per wake is
//! enough: unread bytes make the next wait report the descriptor again.
//! Each read is one record. A record longer than the buffer, or one the
//! network split across reads, lands in the sink as several records.

use crate::conn_table::ConnTable;
use crate::stats::Stats;

use ingest_core::error::{IngestError, Result};
use ingest_core::event::{Readiness, Token};
use ingest_core::policy::{ReadErrorPolicy, WouldBlockPolicy};
use ingest_core::poller::Poller;
use ingest_core::sink::RecordSink;
use ingest_core::{log_debug, log_error, log_trace, log_warn};

use std::io;
use std::os::fd::{AsFd, RawFd};

/// Classification of one read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// `n > 0` bytes: one record.
    Record(usize),
    /// Orderly close (EOF).
    Closed,
    /// Nothing to read although the poller said there was.
    WouldBlock,
    /// Any other error.
    Failed(io::Error),
}

impl ReadOutcome {
    pub fn classify(result: io::Result<usize>) -> Self {
        match result {
            Ok(0) => ReadOutcome::Closed,
            Ok(n) => ReadOutcome::Record(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => ReadOutcome::WouldBlock,
            Err(e) => ReadOutcome::Failed(e),
        }
    }
}

/// Why a connection left the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// Read returned EOF.
    PeerClosed,
    /// Half-close, hang-up or error reported by the poller.
    HalfClosed,
    /// Would-block read under `WouldBlockPolicy::Disconnect`.
    WouldBlock,
    /// Read error under `ReadErrorPolicy::DropConnection`.
    ReadError,
    /// Server shutdown.
    Shutdown,
}

/// Result of handling one connection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A record was appended; the connection stays open.
    Appended(usize),
    /// Nothing happened; the connection stays open.
    Idle,
    Closed(Teardown),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    pub read_error_policy: ReadErrorPolicy,
    pub would_block_policy: WouldBlockPolicy,
}

impl Dispatcher {
    pub fn new(read_error_policy: ReadErrorPolicy, would_block_policy: WouldBlockPolicy) -> Self {
        Self { read_error_policy, would_block_policy }
    }

    /// Handle one ready event for connection `fd`.
    ///
    /// Readable wins over half-close: bytes that arrived together with the
    /// FIN are read first and the close is picked up by the next
    /// (level-triggered) wake, which then reads EOF.
    pub fn on_event<P: Poller, S: RecordSink>(
        &self,
        fd: RawFd,
        readiness: Readiness,
        table: &mut ConnTable,
        poller: &mut P,
        sink: &mut S,
        stats: &mut Stats,
    ) -> Result<Dispatch> {
        if !table.contains(fd) {
            log_trace!("event for unknown fd {}", fd);
            return Ok(Dispatch::Idle);
        }

        if readiness.readable {
            return self.on_readable(fd, table, poller, sink, stats);
        }
        if readiness.is_closed() {
            teardown(fd, Teardown::HalfClosed, table, poller, stats);
            return Ok(Dispatch::Closed(Teardown::HalfClosed));
        }
        Ok(Dispatch::Idle)
    }

    fn on_readable<P: Poller, S: RecordSink>(
        &self,
        fd: RawFd,
        table: &mut ConnTable,
        poller: &mut P,
        sink: &mut S,
        stats: &mut Stats,
    ) -> Result<Dispatch> {
        let Some(conn) = table.get_mut(fd) else {
            return Ok(Dispatch::Idle);
        };

        match ReadOutcome::classify(conn.read_once()) {
            ReadOutcome::Record(n) => {
                let record = conn.take_record(n);
                log_trace!("fd {}: record of {} bytes", fd, n);
                sink.append(record).map_err(IngestError::Sink)?;
                stats.records += 1;
                stats.bytes_in += n as u64;

                // Re-arm: same token, same level-triggered interest.
                poller
                    .reregister(conn.as_fd(), Token::from_fd(fd), conn.interest())
                    .map_err(|e| IngestError::poller("re-arm", e))?;
                Ok(Dispatch::Appended(n))
            }
            ReadOutcome::Closed => {
                teardown(fd, Teardown::PeerClosed, table, poller, stats);
                Ok(Dispatch::Closed(Teardown::PeerClosed))
            }
            ReadOutcome::WouldBlock => match self.would_block_policy {
                WouldBlockPolicy::Disconnect => {
                    teardown(fd, Teardown::WouldBlock, table, poller, stats);
                    Ok(Dispatch::Closed(Teardown::WouldBlock))
                }
                WouldBlockPolicy::Ignore => Ok(Dispatch::Idle),
            },
            ReadOutcome::Failed(e) => {
                stats.read_errors += 1;
                match self.read_error_policy {
                    ReadErrorPolicy::Abort => {
                        log_error!("fd {}: read failed: {}", fd, e);
                        Err(IngestError::ReadFatal { fd, source: e })
                    }
                    ReadErrorPolicy::DropConnection => {
                        log_warn!("fd {}: read failed, dropping connection: {}", fd, e);
                        teardown(fd, Teardown::ReadError, table, poller, stats);
                        Ok(Dispatch::Closed(Teardown::ReadError))
                    }
                }
            }
        }
    }
}

/// `Closing`: remove from the table, deregister, shut down, close.
pub fn teardown<P: Poller>(
    fd: RawFd,
    reason: Teardown,
    table: &mut ConnTable,
    poller: &mut P,
    stats: &mut Stats,
) {
    let Some(conn) = table.remove(fd) else {
        return;
    };
    if let Err(e) = poller.deregister(conn.as_fd()) {
        // Closing the descriptor below drops it from the interest set anyway.
        log_warn!("fd {}: deregister failed: {}", fd, e);
    }
    stats.closed += 1;
    log_debug!(
        "fd {} ({}) closed: {:?} after {} records ({} live)",
        fd,
        conn.peer(),
        reason,
        conn.records(),
        table.len()
    );
    conn.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn_table::Connection;
    use ingest_core::event::{Interest, ReadinessEvent};
    use ingest_module::memory_sink::MemorySink;
    use std::io::Write;
    use std::net::{Shutdown, TcpListener, TcpStream};
    use std::os::fd::AsRawFd;

    /// Records every interest-set call; never blocks.
    #[derive(Default)]
    struct RecordingPoller {
        registered: Vec<RawFd>,
        rearmed: Vec<RawFd>,
        deregistered: Vec<RawFd>,
    }

    impl Poller for RecordingPoller {
        fn register(&mut self, fd: std::os::fd::BorrowedFd<'_>, _: Token, _: Interest) -> io::Result<()> {
            self.registered.push(fd.as_raw_fd());
            Ok(())
        }
        fn reregister(&mut self, fd: std::os::fd::BorrowedFd<'_>, _: Token, _: Interest) -> io::Result<()> {
            self.rearmed.push(fd.as_raw_fd());
            Ok(())
        }
        fn deregister(&mut self, fd: std::os::fd::BorrowedFd<'_>) -> io::Result<()> {
            self.deregistered.push(fd.as_raw_fd());
            Ok(())
        }
        fn wait(&mut self, _: &mut Vec<ReadinessEvent>) -> io::Result<usize> {
            Ok(0)
        }
        fn capacity(&self) -> usize {
            1
        }
    }

    struct Fixture {
        client: TcpStream,
        fd: RawFd,
        table: ConnTable,
        poller: RecordingPoller,
        sink: MemorySink,
        stats: Stats,
    }

    fn fixture() -> Fixture {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, peer) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        let fd = server.as_raw_fd();
        let mut table = ConnTable::new(4);
        table.insert(Connection::new(server, peer, 1024)).ok().unwrap();
        Fixture {
            client,
            fd,
            table,
            poller: RecordingPoller::default(),
            sink: MemorySink::new(),
            stats: Stats::new(),
        }
    }

    fn settle() {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    fn run(d: &Dispatcher, f: &mut Fixture, readiness: Readiness) -> Result<Dispatch> {
        d.on_event(f.fd, readiness, &mut f.table, &mut f.poller, &mut f.sink, &mut f.stats)
    }

    #[test]
    fn classify_read_results() {
        assert!(matches!(ReadOutcome::classify(Ok(5)), ReadOutcome::Record(5)));
        assert!(matches!(ReadOutcome::classify(Ok(0)), ReadOutcome::Closed));
        let wb = io::Error::from(io::ErrorKind::WouldBlock);
        assert!(matches!(ReadOutcome::classify(Err(wb)), ReadOutcome::WouldBlock));
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert!(matches!(ReadOutcome::classify(Err(reset)), ReadOutcome::Failed(_)));
    }

    #[test]
    fn record_is_appended_and_rearmed() {
        let mut f = fixture();
        f.client.write_all(b"test0").unwrap();
        settle();

        let out = run(&Dispatcher::default(), &mut f, Readiness::READABLE).unwrap();

        assert_eq!(out, Dispatch::Appended(5));
        assert_eq!(f.sink.lines_lossy(), vec!["test0"]);
        assert_eq!(f.poller.rearmed, vec![f.fd]);
        assert!(f.table.contains(f.fd));
        assert_eq!(f.stats.records, 1);
        assert_eq!(f.stats.bytes_in, 5);
    }

    #[test]
    fn eof_tears_down() {
        let mut f = fixture();
        f.client.write_all(b"last").unwrap();
        f.client.shutdown(Shutdown::Write).unwrap();
        settle();

        // Data and FIN together: the record is kept, the close comes next.
        let both = Readiness { readable: true, half_closed: true, ..Readiness::default() };
        assert_eq!(run(&Dispatcher::default(), &mut f, both).unwrap(), Dispatch::Appended(4));
        assert_eq!(
            run(&Dispatcher::default(), &mut f, both).unwrap(),
            Dispatch::Closed(Teardown::PeerClosed)
        );

        assert_eq!(f.sink.lines_lossy(), vec!["last"]);
        assert!(f.table.is_empty());
        assert_eq!(f.poller.deregistered, vec![f.fd]);
        assert_eq!(f.stats.closed, 1);
    }

    #[test]
    fn half_close_without_readable_tears_down() {
        let mut f = fixture();
        let hup = Readiness { half_closed: true, ..Readiness::default() };
        assert_eq!(
            run(&Dispatcher::default(), &mut f, hup).unwrap(),
            Dispatch::Closed(Teardown::HalfClosed)
        );
        assert!(f.table.is_empty());
        assert!(f.sink.lines().is_empty());
    }

    #[test]
    fn would_block_policy() {
        // Nothing was sent, so a "readable" read would block.
        let mut f = fixture();
        let ignore = Dispatcher::new(ReadErrorPolicy::Abort, WouldBlockPolicy::Ignore);
        assert_eq!(run(&ignore, &mut f, Readiness::READABLE).unwrap(), Dispatch::Idle);
        assert!(f.table.contains(f.fd));

        let disconnect = Dispatcher::default();
        assert_eq!(
            run(&disconnect, &mut f, Readiness::READABLE).unwrap(),
            Dispatch::Closed(Teardown::WouldBlock)
        );
        assert!(f.table.is_empty());
        assert_eq!(f.stats.read_errors, 0);
    }

    /// Close with SO_LINGER 0: the peer gets an RST instead of a FIN.
    fn reset(client: TcpStream) {
        let linger = libc::linger { l_onoff: 1, l_linger: 0 };
        let rc = unsafe {
            libc::setsockopt(
                client.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_LINGER,
                &linger as *const libc::linger as *const libc::c_void,
                std::mem::size_of::<libc::linger>() as libc::socklen_t,
            )
        };
        assert_eq!(rc, 0);
        drop(client);
        settle();
    }

    #[test]
    fn read_error_aborts_under_abort_policy() {
        let mut f = fixture();
        reset(f.client);

        let d = Dispatcher::new(ReadErrorPolicy::Abort, WouldBlockPolicy::Disconnect);
        let res = d.on_event(f.fd, Readiness::READABLE, &mut f.table, &mut f.poller, &mut f.sink, &mut f.stats);

        match res {
            Err(IngestError::ReadFatal { fd, source }) => {
                assert_eq!(fd, f.fd);
                assert_eq!(source.kind(), io::ErrorKind::ConnectionReset);
            }
            other => panic!("expected ReadFatal, got {:?}", other),
        }
        // The loop owns the shutdown; the dispatcher leaves the table alone.
        assert!(f.table.contains(f.fd));
        assert!(f.poller.deregistered.is_empty());
        assert_eq!(f.stats.read_errors, 1);
        assert_eq!(f.stats.closed, 0);
    }

    #[test]
    fn read_error_drops_connection_under_drop_policy() {
        let mut f = fixture();
        reset(f.client);

        let d = Dispatcher::new(ReadErrorPolicy::DropConnection, WouldBlockPolicy::Disconnect);
        let res = d.on_event(f.fd, Readiness::READABLE, &mut f.table, &mut f.poller, &mut f.sink, &mut f.stats);

        assert_eq!(res.unwrap(), Dispatch::Closed(Teardown::ReadError));
        assert!(f.table.is_empty());
        assert_eq!(f.poller.deregistered, vec![f.fd]);
        assert_eq!(f.stats.read_errors, 1);
        assert_eq!(f.stats.closed, 1);
        assert!(f.sink.lines().is_empty());
    }

    #[test]
    fn unknown_fd_is_ignored() {
        let mut f = fixture();
        let out = Dispatcher::default()
            .on_event(f.fd + 1000, Readiness::READABLE, &mut f.table, &mut f.poller, &mut f.sink, &mut f.stats)
            .unwrap();
        assert_eq!(out, Dispatch::Idle);
        assert_eq!(f.table.len(), 1);
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut f = fixture();
        teardown(f.fd, Teardown::Shutdown, &mut f.table, &mut f.poller, &mut f.stats);
        teardown(f.fd, Teardown::Shutdown, &mut f.table, &mut f.poller, &mut f.stats);
        assert_eq!(f.stats.closed, 1);
        assert_eq!(f.poller.deregistered.len(), 1);
    }
}
