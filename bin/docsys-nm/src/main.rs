//! `docsys-nm`: the name server binary.
//!
//! Thin wrapper over [`nm::server::NmServer`]: parses CLI arguments into an
//! [`nm::config::NmConfig`], builds the server, installs a Ctrl-C handler
//! that flips a shared `AtomicBool`, and runs the accept loop on the main
//! thread.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use nm::config::NmConfig;
use nm::server::NmServer;

/// Command-line arguments for the name server.
#[derive(Parser, Debug)]
#[command(name = "docsys-nm", about = "Doc-system name server", version)]
struct Args {
    /// TCP port to accept SS and client connections on.
    #[arg(default_value_t = 8001)]
    port: u16,

    /// Path to the append-only operation log.
    #[arg(long, default_value = "nm_log.txt")]
    log_path: PathBuf,

    /// Path to the persistent user registry.
    #[arg(long, default_value = "nm_users.txt")]
    registry_path: PathBuf,

    /// Maximum entries kept in the filename LRU cache.
    #[arg(long, default_value_t = nm::index::DEFAULT_CACHE_CAPACITY)]
    cache_capacity: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = NmConfig {
        port: args.port,
        log_path: args.log_path,
        registry_path: args.registry_path,
        cache_capacity: args.cache_capacity,
    };

    let server = match NmServer::new(config) {
        Ok(server) => Arc::new(server),
        Err(err) => {
            eprintln!("docsys-nm: failed to start: {err}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        let _ = ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst));
    }

    match server.run(shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("docsys-nm: listener failed: {err}");
            ExitCode::FAILURE
        }
    }
}
