//! Cross-thread wakeup abstraction.
//!
//! A `Notifier` is how anything outside the reactor thread (the signal
//! layer, a test, an embedding application) asks the loop to stop. It is a
//! descriptor the poller watches like any other, so the request is noticed
//! at the loop's only suspension point.
//!
//! # Implementors
//!
//! - `EventFdNotifier` (default, Linux): writes 1 to an eventfd.
//!
//! **Contract:**
//! - `notify()` never blocks and is safe to call from any thread.
//! - Calls made before the reactor wakes are coalesced into one wakeup.

use std::io;
use std::os::fd::BorrowedFd;

pub trait Notifier: Send + Sync {
    /// Signal the reactor.
    fn notify(&self) -> io::Result<()>;

    /// Consume pending notifications so a level-triggered poller stops
    /// reporting the descriptor. Returns whether any were pending.
    fn drain(&self) -> io::Result<bool>;

    /// The descriptor to register with the poller.
    fn fd(&self) -> BorrowedFd<'_>;
}
