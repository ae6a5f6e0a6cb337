//! Admission controller.
//!
//! The listener is registered edge-triggered: the kernel reports it once
//! per transition to "has pending connections", so every wake must accept
//! until the queue reports `WouldBlock`. Stopping early strands the
//! remaining peers until some new connection arrives.

use crate::conn_table::{ConnTable, Connection};
use crate::stats::Stats;

use ingest_core::event::Token;
use ingest_core::poller::Poller;
use ingest_core::{log_debug, log_warn};

use ingest_module::endpoint::ListenEndpoint;

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsFd, AsRawFd, RawFd};

/// What happened to one accepted peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(RawFd),
    /// Table full; closed without reading or writing.
    Rejected,
    /// Could not be made non-blocking or registered; closed.
    Failed,
}

/// Decide on one accepted peer.
///
/// Capacity is checked before anything is registered, so the table never
/// exceeds its capacity even transiently.
pub fn admit<P: Poller>(
    stream: TcpStream,
    peer: SocketAddr,
    table: &mut ConnTable,
    poller: &mut P,
    buffer_size: usize,
) -> Admission {
    if !table.has_room() {
        // Dropping the stream closes it; the client sees a bare close.
        drop(stream);
        return Admission::Rejected;
    }

    if let Err(e) = stream.set_nonblocking(true) {
        log_warn!("{}: set_nonblocking failed: {}", peer, e);
        return Admission::Failed;
    }

    let fd = stream.as_raw_fd();
    let conn = Connection::new(stream, peer, buffer_size);
    if let Err(e) = poller.register(conn.as_fd(), Token::from_fd(fd), conn.interest()) {
        log_warn!("{}: register fd {} failed: {}", peer, fd, e);
        conn.close();
        return Admission::Failed;
    }

    match table.insert(conn) {
        Ok(()) => Admission::Admitted(fd),
        Err(conn) => {
            // Unreachable given the room check above; keep the invariant anyway.
            let _ = poller.deregister(conn.as_fd());
            conn.close();
            Admission::Failed
        }
    }
}

/// Accept every pending connection on `endpoint`.
///
/// Returns the number of peers accepted from the queue (admitted or not).
pub fn accept_loop<P: Poller>(
    endpoint: &ListenEndpoint,
    table: &mut ConnTable,
    poller: &mut P,
    buffer_size: usize,
    stats: &mut Stats,
) -> usize {
    let mut drained = 0;
    loop {
        let (stream, peer) = match endpoint.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e)
                if e.kind() == io::ErrorKind::Interrupted
                    || e.kind() == io::ErrorKind::ConnectionAborted =>
            {
                continue
            }
            Err(e) => {
                // EMFILE and friends: nothing to accept with until something closes.
                log_warn!("accept failed, {} peers may stay queued: {}", drained, e);
                break;
            }
        };
        drained += 1;

        match admit(stream, peer, table, poller, buffer_size) {
            Admission::Admitted(fd) => {
                stats.accepted += 1;
                log_debug!("{} admitted as fd {} ({}/{} live)", peer, fd, table.len(), table.capacity());
            }
            Admission::Rejected => {
                stats.rejected += 1;
                log_debug!("{} rejected: {} connections already live", peer, table.len());
            }
            Admission::Failed => {}
        }
    }
    drained
}
