//! Compiled-in defaults, overridden by `INGEST_*` environment variables.

use std::net::Ipv4Addr;

pub const HOST: Ipv4Addr = Ipv4Addr::LOCALHOST;
pub const PORT: u16 = 8080;
pub const BACKLOG: i32 = libc::SOMAXCONN;
/// Events taken from the kernel per wait.
pub const MAX_EVENTS: usize = 10;
/// Per-connection read buffer; one read of at most this many bytes is one record.
pub const BUFFER_SIZE: usize = 1024;

// Upper bounds enforced by `ServerConfig::validate`.

/// Largest accepted `max_events`; also the most `EpollPoller` will allocate.
pub const MAX_EVENTS_LIMIT: usize = ingest_module::epoll_poller::MAX_BATCH;
/// Largest accepted `buffer_size` (1 MiB), allocated once per connection.
pub const BUFFER_SIZE_LIMIT: usize = 1 << 20;
