//! The reactor: one thread, one poller, one loop.
//!
//! ```text
//! loop {
//!     wait(events)                      // only suspension point
//!     for ev in events {
//!         LISTENER  -> accept_loop      // drain the queue (edge-triggered)
//!         SHUTDOWN  -> stop after batch
//!         conn fd   -> dispatcher       // one read, one record
//!     }
//! }
//! ```
//!
//! Nothing in the loop blocks except `wait`: the listener and every
//! connection are non-blocking, and the sink write is a buffered append.

use crate::admission::accept_loop;
use crate::config::ServerConfig;
use crate::conn_table::ConnTable;
use crate::dispatch::{teardown, Dispatch, Dispatcher, Teardown};
use crate::stats::Stats;

use ingest_core::error::{IngestError, Result};
use ingest_core::event::{Interest, Token};
use ingest_core::notifier::Notifier;
use ingest_core::poller::Poller;
use ingest_core::sink::RecordSink;
use ingest_core::{log_debug, log_error, log_info, log_warn};
use ingest_core::ReadinessEvent;

use ingest_module::endpoint::ListenEndpoint;
use ingest_module::epoll_poller::EpollPoller;
use ingest_module::eventfd_notifier::EventFdNotifier;
use ingest_module::file_sink::AppendFileSink;

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsFd, RawFd};
use std::sync::Arc;

/// Asks a running `Server` to stop. Cheap to clone; usable from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    notifier: Arc<dyn Notifier>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) -> io::Result<()> {
        self.notifier.notify()
    }
}

pub struct Server<P: Poller = EpollPoller, S: RecordSink = AppendFileSink> {
    config: ServerConfig,
    poller: P,
    /// `None` once the server has stopped.
    endpoint: Option<ListenEndpoint>,
    local_addr: SocketAddr,
    notifier: Arc<dyn Notifier>,
    table: ConnTable,
    sink: S,
    dispatcher: Dispatcher,
    stats: Stats,
    events: Vec<ReadinessEvent>,
    /// Descriptors torn down during the current batch.
    retired: Vec<RawFd>,
}

impl<S: RecordSink> Server<EpollPoller, S> {
    /// Validate `config`, bind the listener and set up epoll and the
    /// shutdown eventfd.
    pub fn bind(config: ServerConfig, sink: S) -> Result<Self> {
        config.validate()?;

        let poller =
            EpollPoller::new(config.max_events).map_err(|e| IngestError::startup("epoll_create", e))?;
        let endpoint = ListenEndpoint::bind(config.host, config.port, config.backlog)
            .map_err(|(op, e)| IngestError::startup(op, e))?;
        let notifier = EventFdNotifier::create().map_err(|e| IngestError::startup("eventfd", e))?;

        Self::from_parts(config, poller, endpoint, Arc::new(notifier), sink)
    }
}

impl<P: Poller, S: RecordSink> Server<P, S> {
    /// Assemble a server from already-created parts and register the
    /// listener and the notifier.
    pub fn from_parts(
        config: ServerConfig,
        mut poller: P,
        endpoint: ListenEndpoint,
        notifier: Arc<dyn Notifier>,
        sink: S,
    ) -> Result<Self> {
        config.validate()?;

        poller
            .register(endpoint.as_fd(), Token::LISTENER, Interest::LISTENER)
            .map_err(|e| IngestError::startup("register listener", e))?;
        poller
            .register(notifier.fd(), Token::SHUTDOWN, Interest::READABLE)
            .map_err(|e| IngestError::startup("register notifier", e))?;

        let events = Vec::with_capacity(poller.capacity());
        Ok(Self {
            table: ConnTable::new(config.max_connections),
            dispatcher: Dispatcher::new(config.read_error_policy, config.would_block_policy),
            local_addr: endpoint.local_addr(),
            endpoint: Some(endpoint),
            config,
            poller,
            notifier,
            sink,
            stats: Stats::new(),
            events,
            retired: Vec::new(),
        })
    }

    /// Bound address; the real port when the config asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle { notifier: Arc::clone(&self.notifier) }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run until a shutdown request (`Ok`) or a fatal error (`Err`).
    /// Either way the listener and every connection are closed on return.
    pub fn run(&mut self) -> Result<()> {
        self.config.print();
        log_info!("listening on {}", self.local_addr);

        loop {
            self.events.clear();
            match self.poller.wait(&mut self.events) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log_error!("wait failed: {}", e);
                    self.stop();
                    return Err(IngestError::Wait(e));
                }
            }

            self.retired.clear();
            let mut shutdown_requested = false;

            for i in 0..self.events.len() {
                let ev = self.events[i];
                match ev.token {
                    Token::LISTENER => self.on_listener(ev),
                    Token::SHUTDOWN => {
                        if let Err(e) = self.notifier.drain() {
                            log_warn!("shutdown notifier drain failed: {}", e);
                        }
                        shutdown_requested = true;
                    }
                    token => {
                        let Some(fd) = token.as_fd() else {
                            log_warn!("event with unknown token {}", token);
                            continue;
                        };
                        if self.retired.contains(&fd) {
                            continue;
                        }
                        match self.dispatcher.on_event(
                            fd,
                            ev.readiness,
                            &mut self.table,
                            &mut self.poller,
                            &mut self.sink,
                            &mut self.stats,
                        ) {
                            Ok(Dispatch::Closed(_)) => self.retired.push(fd),
                            Ok(_) => {}
                            Err(e) => {
                                log_error!("{}", e);
                                self.stop();
                                return Err(e);
                            }
                        }
                    }
                }
            }

            if shutdown_requested {
                log_info!("shutdown requested");
                self.stop();
                return Ok(());
            }
        }
    }

    fn on_listener(&mut self, ev: ReadinessEvent) {
        let Some(endpoint) = self.endpoint.as_ref() else {
            return;
        };
        if ev.readiness.readable {
            let drained = accept_loop(
                endpoint,
                &mut self.table,
                &mut self.poller,
                self.config.buffer_size,
                &mut self.stats,
            );
            log_debug!("accepted {} from queue, {} live", drained, self.table.len());
        } else if ev.readiness.is_closed() {
            log_warn!("listener reported {:?}", ev.readiness);
        }
    }

    /// Abrupt stop: close the listener, then every connection. Unread
    /// bytes are discarded. Safe to call more than once.
    pub fn stop(&mut self) {
        let Some(endpoint) = self.endpoint.take() else {
            return;
        };
        if let Err(e) = self.poller.deregister(endpoint.as_fd()) {
            log_warn!("listener deregister failed: {}", e);
        }
        drop(endpoint);

        for fd in self.table.fds() {
            teardown(fd, Teardown::Shutdown, &mut self.table, &mut self.poller, &mut self.stats);
        }
        self.stats.print();
    }
}
