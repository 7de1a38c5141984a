//! The storage server's two listeners: the NM-facing control channel
//! (dialed out at boot, per spec.md §4.4's `REGISTER_SS` handshake) and the
//! direct client-facing listener that `READ`/`STREAM`/`WRITE` redirects
//! land on, per spec.md §4.6-4.9. One worker thread per accepted connection,
//! same as [`nm::server::NmServer`].

use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use logging::{LogContext, Logger};
use wire::command::Command;

use crate::config::SsConfig;
use crate::ops::{DispatchOutcome, SsSession};
use crate::store::Store;

/// The storage server's full runtime state, shared across every connection
/// worker behind an `Arc`.
pub struct SsServer {
    /// This server's file table.
    pub store: Arc<Store>,
    /// The shared append-only log.
    pub logger: Arc<Logger>,
    /// Startup configuration.
    pub config: SsConfig,
}

impl SsServer {
    /// Boots the file table from `config.storage_dir` and opens the log at
    /// `config.log_path`.
    ///
    /// # Errors
    ///
    /// Propagates any [`std::io::Error`] opening the log file.
    pub fn new(config: SsConfig) -> std::io::Result<Self> {
        let logger = Arc::new(Logger::open(&config.log_path)?);
        let store = Arc::new(Store::boot(config.storage_dir.clone(), config.undo_capacity, config.max_content_bytes, &logger));
        Ok(Self { store, logger, config })
    }

    /// Dials the name server, sends `REGISTER_SS`, and keeps the connection
    /// open as the persistent forwarding channel the NM's `ss_pool` uses for
    /// `VIEW`/`CREATE`/`DELETE`/`INFO`/`UNDO`/checkpoint commands.
    ///
    /// Runs until the socket dies or `shutdown` flips, at which point the
    /// caller is expected to have already exited its accept loop too.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`std::io::Error`] if the initial connection
    /// cannot be established.
    pub fn register_with_nm(self: &Arc<Self>, shutdown: &AtomicBool) -> std::io::Result<()> {
        let stream = TcpStream::connect((self.config.nm_host.as_str(), self.config.nm_port))?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        let names = self.store.filenames();
        let register_line = format!(
            "REGISTER_SS {} {} {} {}",
            self.config.nm_port,
            self.config.client_port,
            names.len(),
            names.join(" ")
        )
        .trim_end()
        .to_string();
        wire::write_line(&mut writer, &register_line)?;
        let _ack = wire::read_line(&mut reader)?;

        let ctx = LogContext::new(self.config.nm_host.clone(), self.config.nm_port);
        self.logger.info(&ctx, "REGISTER_SS", "registered with name server");

        let mut session = SsSession::new(self.store.clone());
        while !shutdown.load(Ordering::SeqCst) {
            let line = match wire::read_line(&mut reader) {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => break,
            };
            let cmd = Command::parse(&line);
            if cmd.name.is_empty() {
                continue;
            }
            let now = common::timestamp::now_epoch();
            match session.dispatch(&cmd, now) {
                DispatchOutcome::Line(body) => {
                    if wire::write_line(&mut writer, &body).is_err() {
                        break;
                    }
                }
                DispatchOutcome::Stream(entry) => {
                    if crate::stream::stream_to(&entry, &mut writer, now).is_err() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Binds `config.client_port` and serves direct client connections
    /// forever, spawning one worker thread per accepted connection.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`std::io::Error`] if the listener cannot be
    /// bound.
    pub fn run_client_listener(self: Arc<Self>, shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.client_port))?;
        self.logger.info(
            &LogContext::new("-", self.config.client_port),
            "BOOT",
            format!("listening for clients on port {}", self.config.client_port),
        );

        for incoming in listener.incoming() {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            let stream = match incoming {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            let server = self.clone();
            thread::spawn(move || server.handle_client_connection(stream));
        }
        Ok(())
    }

    fn handle_client_connection(self: Arc<Self>, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        let ip = peer.map(|a| a.ip().to_string()).unwrap_or_else(|| "-".to_string());
        let port = peer.map(|a| a.port()).unwrap_or(0);
        let ctx = LogContext::new(ip, port);

        let reader_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut reader = BufReader::new(reader_stream);
        let mut writer = BufWriter::new(stream);
        let mut session = SsSession::new(self.store.clone());

        loop {
            let line = match wire::read_line(&mut reader) {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => break,
            };
            let cmd = Command::parse(&line);
            if cmd.name.is_empty() {
                continue;
            }
            let now = common::timestamp::now_epoch();
            self.logger.info(&ctx, &cmd.name, cmd.rejoin_args());
            match session.dispatch(&cmd, now) {
                DispatchOutcome::Line(body) => {
                    if wire::write_line(&mut writer, &body).is_err() {
                        break;
                    }
                }
                DispatchOutcome::Stream(entry) => {
                    if crate::stream::stream_to(&entry, &mut writer, now).is_err() {
                        break;
                    }
                }
            }
        }
    }
}
