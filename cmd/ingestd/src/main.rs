//! ingestd — TCP ingestion daemon
//!
//! Usage: `ingestd <max-connections> <sink-path>`
//!
//! Accepts up to `max-connections` concurrent TCP peers on 127.0.0.1:8080
//! and appends every read from them to `sink-path`, one record per line.
//! Detaches from the terminal unless `INGEST_DAEMONIZE=0`; stops on SIGTERM.
//!
//! Exit status: 0 after SIGTERM, 1 on a fatal runtime or startup error,
//! 2 on bad arguments or configuration.
//!
//! See `ingest_server::config` for the `INGEST_*` environment overrides.

mod daemon;
mod signal;

use daemon::DaemonOptions;
use signal::ShutdownSignals;

use ingest_core::error::{IngestError, Result};
use ingest_core::{log_error, log_info, logging};
use ingest_module::file_sink::AppendFileSink;
use ingest_server::{ConfigError, Server, ServerConfig};

use std::path::PathBuf;

const USAGE: &str = "usage: ingestd <max-connections> <sink-path>";

#[derive(Debug, PartialEq, Eq)]
struct Args {
    max_connections: usize,
    sink_path: PathBuf,
}

fn parse_args<I>(args: I) -> std::result::Result<Args, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut it = args.into_iter();
    let (Some(max), Some(path)) = (it.next(), it.next()) else {
        return Err(ConfigError::Usage("not enough arguments".into()));
    };
    if it.next().is_some() {
        return Err(ConfigError::Usage("too many arguments".into()));
    }

    let max_connections = max
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            ConfigError::Usage(format!("max-connections must be a positive integer, got {:?}", max))
        })?;

    Ok(Args {
        max_connections,
        sink_path: PathBuf::from(path),
    })
}

fn run() -> Result<()> {
    let args = parse_args(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{}", USAGE);
        e
    })?;

    let config = ServerConfig::from_env()?.max_connections(args.max_connections);
    config.validate()?;

    // Opened while still attached, so an unwritable path is reported.
    let sink = AppendFileSink::open(&args.sink_path)
        .map_err(|e| IngestError::startup("open sink", e))?;

    let daemon = DaemonOptions::from_env();
    if daemon.enabled {
        daemon::daemonize(daemon.log_file.as_deref())
            .map_err(|e| IngestError::startup("daemonize", e))?;
    }
    log_info!("ingestd pid {} writing to {}", std::process::id(), sink.path().display());

    let signals = ShutdownSignals::install(daemon.enabled)
        .map_err(|e| IngestError::startup("signal setup", e))?;

    let mut server = Server::bind(config, sink)?;
    signals
        .spawn_waiter(server.shutdown_handle())
        .map_err(|e| IngestError::startup("spawn signal thread", e))?;

    server.run()
}

fn main() {
    logging::init();

    let code = match run() {
        Ok(()) => {
            log_info!("ingestd: done.");
            0
        }
        Err(e) => {
            log_error!("ingestd: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}
