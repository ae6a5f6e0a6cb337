//! `ListenEndpoint` — the bound, listening, non-blocking TCP socket.
//!
//! Set up with raw socket calls so both `SO_REUSEADDR` and `SO_REUSEPORT`
//! are in place before `bind(2)`, then handed to `std::net::TcpListener`
//! for accepting. The descriptor is created non-blocking: `accept()`
//! returns `WouldBlock` once the pending queue is empty, which is what
//! the reactor's drain loop keys on.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

pub struct ListenEndpoint {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ListenEndpoint {
    /// socket → SO_REUSEADDR/SO_REUSEPORT → bind → listen.
    ///
    /// The error names the step that failed, for the startup report.
    pub fn bind(host: Ipv4Addr, port: u16, backlog: i32) -> Result<Self, (&'static str, io::Error)> {
        let raw = unsafe {
            libc::socket(
                libc::AF_INET,
                libc::SOCK_STREAM | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                0,
            )
        };
        if raw < 0 {
            return Err(("socket", io::Error::last_os_error()));
        }
        // Safety: fresh descriptor from socket(2); closed on every early return below.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        set_flag(&fd, libc::SO_REUSEADDR).map_err(|e| ("setsockopt(SO_REUSEADDR)", e))?;
        set_flag(&fd, libc::SO_REUSEPORT).map_err(|e| ("setsockopt(SO_REUSEPORT)", e))?;

        let mut addr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_addr.s_addr = u32::from(host).to_be();
        addr.sin_port = port.to_be();

        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &addr as *const libc::sockaddr_in as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        if ret != 0 {
            return Err(("bind", io::Error::last_os_error()));
        }

        if unsafe { libc::listen(fd.as_raw_fd(), backlog) } != 0 {
            return Err(("listen", io::Error::last_os_error()));
        }

        let listener = TcpListener::from(fd);
        let local_addr = listener
            .local_addr()
            .unwrap_or(SocketAddr::V4(SocketAddrV4::new(host, port)));
        Ok(Self { listener, local_addr })
    }

    /// One non-blocking accept.
    pub fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept()
    }

    /// The bound address (the real port when bound to port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl AsFd for ListenEndpoint {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.listener.as_fd()
    }
}

fn set_flag(fd: &OwnedFd, option: libc::c_int) -> io::Result<()> {
    let one: libc::c_int = 1;
    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            libc::SOL_SOCKET,
            option,
            &one as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
