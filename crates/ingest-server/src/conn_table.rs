//! Connection table: every admitted peer, keyed by descriptor.
//!
//! A `Connection` is in the table iff its descriptor is registered with the
//! poller. The admission controller checks `has_room()` before it
//! registers anything, and `insert()` refuses to exceed capacity, so
//! `len() <= capacity()` holds at every point.

use ingest_core::event::Interest;

use std::collections::HashMap;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

/// One admitted peer session.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    interest: Interest,
    /// Scratch buffer, reused and zeroed for every read.
    buf: Box<[u8]>,
    records: u64,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, buffer_size: usize) -> Self {
        Self {
            stream,
            peer,
            interest: Interest::CONNECTION,
            buf: vec![0u8; buffer_size].into_boxed_slice(),
            records: 0,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Zero the buffer, then one read of at most `buffer_size` bytes.
    pub fn read_once(&mut self) -> io::Result<usize> {
        self.buf.fill(0);
        self.stream.read(&mut self.buf)
    }

    /// The first `len` bytes of the last read, counted as one record.
    pub fn take_record(&mut self, len: usize) -> &[u8] {
        self.records += 1;
        &self.buf[..len]
    }

    /// Shut down both directions and close the descriptor.
    pub fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl AsFd for Connection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

/// Most slots reserved up front; the capacity itself is only a count.
const PREALLOC_LIMIT: usize = 1024;

pub struct ConnTable {
    conns: HashMap<RawFd, Connection>,
    capacity: usize,
}

impl ConnTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            conns: HashMap::with_capacity(capacity.min(PREALLOC_LIMIT)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn has_room(&self) -> bool {
        self.conns.len() < self.capacity
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        self.conns.contains_key(&fd)
    }

    /// Insert an admitted connection. Hands it back when the table is full
    /// or the descriptor is already present.
    pub fn insert(&mut self, conn: Connection) -> Result<(), Connection> {
        if !self.has_room() || self.conns.contains_key(&conn.fd()) {
            return Err(conn);
        }
        self.conns.insert(conn.fd(), conn);
        Ok(())
    }

    pub fn get_mut(&mut self, fd: RawFd) -> Option<&mut Connection> {
        self.conns.get_mut(&fd)
    }

    pub fn remove(&mut self, fd: RawFd) -> Option<Connection> {
        self.conns.remove(&fd)
    }

    /// Descriptors of every live connection, in no particular order.
    pub fn fds(&self) -> Vec<RawFd> {
        self.conns.keys().copied().collect()
    }
}
