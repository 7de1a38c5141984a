//! `docsys-ss`: the storage server binary.
//!
//! Thin wrapper over [`ss::server::SsServer`]: parses CLI arguments into an
//! [`ss::config::SsConfig`], boots the file table, then runs the NM
//! registration channel on a background thread and the direct client
//! listener on the main thread. A Ctrl-C handler flips a shared
//! `AtomicBool` both loops poll.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use ss::config::SsConfig;
use ss::server::SsServer;

/// Command-line arguments for the storage server.
#[derive(Parser, Debug)]
#[command(name = "docsys-ss", about = "Doc-system storage server", version)]
struct Args {
    /// Host the name server is listening on.
    #[arg(default_value = "127.0.0.1")]
    nm_host: String,

    /// Port the name server accepts registration/forwarding on.
    #[arg(default_value_t = 8001)]
    nm_port: u16,

    /// Port this storage server accepts direct client connections on.
    #[arg(default_value_t = 9001)]
    client_port: u16,

    /// Directory holding this server's canonical files and checkpoints.
    #[arg(long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to the append-only operation log.
    #[arg(long, default_value = "ss_log.txt")]
    log_path: PathBuf,

    /// Undo ring depth, per file.
    #[arg(long, default_value_t = ss::file_entry::DEFAULT_UNDO_CAPACITY)]
    undo_capacity: usize,

    /// Maximum content size accepted for a single file.
    #[arg(long, default_value_t = ss::config::DEFAULT_MAX_CONTENT_BYTES)]
    max_content_bytes: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = SsConfig {
        nm_host: args.nm_host,
        nm_port: args.nm_port,
        client_port: args.client_port,
        storage_dir: args.storage_dir,
        log_path: args.log_path,
        undo_capacity: args.undo_capacity,
        max_content_bytes: args.max_content_bytes,
    };

    let server = match SsServer::new(config) {
        Ok(server) => Arc::new(server),
        Err(err) => {
            eprintln!("docsys-ss: failed to start: {err}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        let _ = ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst));
    }

    {
        let server = server.clone();
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            if let Err(err) = server.register_with_nm(&shutdown) {
                eprintln!("docsys-ss: name server registration failed: {err}");
            }
        });
    }

    match server.run_client_listener(shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("docsys-ss: client listener failed: {err}");
            ExitCode::FAILURE
        }
    }
}
