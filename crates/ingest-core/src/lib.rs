//! # ingest-core — Trait definitions for ingestd
//!
//! This crate defines the trait boundaries of the ingestion reactor.
//! Each trait models one capability the engine needs from the platform:
//!
//! | Trait        | Capability                                   |
//! |--------------|----------------------------------------------|
//! | `Poller`     | readiness multiplexing over an interest set  |
//! | `RecordSink` | append-only persistence of records           |
//! | `Notifier`   | waking the reactor from another thread       |
//!
//! Default implementations live in `ingest-module`; the loop that ties
//! them together lives in `ingest-server`.
//!
//! Platform-neutral helpers live here too: leveled stderr logging
//! (`logging`), environment lookups (`env`), the error type (`error`)
//! and the policies that decide how the dispatcher reacts to odd reads
//! (`policy`).

pub mod logging;
pub mod env;
pub mod error;
pub mod event;
pub mod poller;
pub mod sink;
pub mod notifier;
pub mod policy;

pub use error::{IngestError, Result};
pub use event::{Interest, Readiness, ReadinessEvent, Token};
