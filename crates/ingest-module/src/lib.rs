//! # ingest-module — Default implementations
//!
//! This crate provides the default implementation for every ingest-core
//! trait, plus the listening endpoint the reactor accepts on.
//!
//! ## Default stack
//!
//! | Trait / role  | Default Impl     | Alternative        |
//! |---------------|------------------|--------------------|
//! | Poller        | EpollPoller      | —                  |
//! | Notifier      | EventFdNotifier  | —                  |
//! | RecordSink    | AppendFileSink   | MemorySink (tests) |
//! | listener      | ListenEndpoint   | —                  |
//!
//! The poller and the notifier are Linux-only (`epoll(7)`, `eventfd(2)`).

pub mod endpoint;
pub mod file_sink;
pub mod memory_sink;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub mod epoll_poller;
        pub mod eventfd_notifier;
    } else {
        compile_error!("ingest-module needs epoll and eventfd (Linux only)");
    }
}
