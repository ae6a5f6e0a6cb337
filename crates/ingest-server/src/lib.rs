//! # ingest-server — the ingestion reactor
//!
//! Ties the `ingest-core` traits together into a single-threaded event
//! loop that accepts TCP peers up to a fixed capacity and appends every
//! read to a sink, one record per line.
//!
//! | Module       | Role                                              |
//! |--------------|---------------------------------------------------|
//! | `config`     | `ServerConfig`: defaults, env overrides, builder  |
//! | `conn_table` | admitted connections, bounded by capacity          |
//! | `admission`  | drain the accept queue, admit or reject            |
//! | `dispatch`   | one read per ready event, record or teardown       |
//! | `server`     | the loop, shutdown handle, abrupt stop             |
//! | `stats`      | counters printed on stop                           |
//!
//! ```rust,ignore
//! use ingest_server::{Server, ServerConfig};
//! use ingest_module::file_sink::AppendFileSink;
//!
//! let config = ServerConfig::from_env()?.max_connections(10);
//! let mut server = Server::bind(config, AppendFileSink::open("out.log")?)?;
//! let stop = server.shutdown_handle();
//! server.run()?;
//! ```

pub mod admission;
pub mod config;
pub mod conn_table;
pub mod dispatch;
pub mod server;
pub mod stats;

pub use config::{ConfigError, ServerConfig};
pub use server::{Server, ShutdownHandle};
pub use stats::Stats;
