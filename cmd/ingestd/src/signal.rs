//! Signal disposition for the daemon.
//!
//! The engine has a single shutdown entry point, `ShutdownHandle`. Rather
//! than calling into it from an async handler, the termination signals are
//! blocked and a dedicated thread receives them with `sigwait(2)`. The
//! mask is set on the main thread before the engine or the waiter exist,
//! so every thread inherits it.

use ingest_core::{log_error, log_info};
use ingest_server::ShutdownHandle;

use nix::errno::Errno;
use nix::sys::signal::{signal, SigHandler, SigSet, Signal};

use std::io;
use std::thread::{self, JoinHandle};

/// Dispositions set to `SIG_IGN`.
const IGNORED: [Signal; 5] = [
    Signal::SIGQUIT,
    Signal::SIGHUP,
    Signal::SIGCONT,
    Signal::SIGCHLD,
    Signal::SIGPIPE,
];

pub struct ShutdownSignals {
    set: SigSet,
}

/// SIGTERM always; SIGINT too while attached to a terminal.
fn shutdown_set(daemonized: bool) -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGTERM);
    if !daemonized {
        set.add(Signal::SIGINT);
    }
    set
}

impl ShutdownSignals {
    /// Ignore the uninteresting signals and block the shutdown set on the
    /// calling thread. Call before spawning any thread.
    pub fn install(daemonized: bool) -> io::Result<Self> {
        let mut ignored = IGNORED.to_vec();
        if daemonized {
            ignored.push(Signal::SIGINT);
        }
        for sig in ignored {
            // Safety: SIG_IGN installs no handler code.
            unsafe { signal(sig, SigHandler::SigIgn) }?;
        }

        let set = shutdown_set(daemonized);
        set.thread_block()?;
        Ok(Self { set })
    }

    /// Wait for the first shutdown signal on a dedicated thread and forward
    /// it to `handle`.
    pub fn spawn_waiter(self, handle: ShutdownHandle) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ingestd-signal".into())
            .spawn(move || loop {
                match self.set.wait() {
                    Ok(sig) => {
                        log_info!("received {:?}, shutting down", sig);
                        if let Err(e) = handle.shutdown() {
                            log_error!("shutdown request failed: {}", e);
                        }
                        return;
                    }
                    Err(Errno::EINTR) => continue,
                    Err(e) => {
                        log_error!("sigwait failed: {}", e);
                        return;
                    }
                }
            })
    }
}
