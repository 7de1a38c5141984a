//! The accept loop and per-connection dispatcher: one worker thread per
//! socket, exactly as `original_source/name_server.h` models it and as
//! `Superpat-ad`'s `Server::serve_tcp` spawns a thread per accepted 9p
//! session.

use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use logging::{LogContext, Logger};
use wire::nm::{Command, FirstLine, Response};

use crate::config::NmConfig;
use crate::exec::{CommandRunner, ShellCommandRunner};
use crate::index::FilenameIndex;
use crate::registry::UserRegistry;
use crate::ss_pool::SsPool;

/// The name server's full runtime state, shared across every connection
/// worker behind an `Arc`.
pub struct NmServer {
    /// The filename trie + LRU cache.
    pub index: FilenameIndex,
    /// The persistent user registry.
    pub registry: UserRegistry,
    /// The set of registered storage servers and their forwarding channels.
    pub ss_pool: SsPool,
    /// The shared append-only log.
    pub logger: Arc<Logger>,
    /// The `EXEC` shell boundary.
    pub command_runner: Box<dyn CommandRunner>,
    /// Startup configuration.
    pub config: NmConfig,
}

impl NmServer {
    /// Builds a server with a real [`ShellCommandRunner`] and a freshly
    /// opened log and registry at the paths in `config`.
    ///
    /// # Errors
    ///
    /// Propagates any [`std::io::Error`] opening the log file or loading
    /// the user registry.
    pub fn new(config: NmConfig) -> std::io::Result<Self> {
        let logger = Arc::new(Logger::open(&config.log_path)?);
        let registry = UserRegistry::load(&config.registry_path)?;
        Ok(Self {
            index: FilenameIndex::new(config.cache_capacity),
            registry,
            ss_pool: SsPool::new(),
            logger,
            command_runner: Box::new(ShellCommandRunner),
            config,
        })
    }

    /// Binds `config.port` and serves forever, spawning one worker thread
    /// per accepted connection.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`std::io::Error`] if the listener cannot be
    /// bound.
    pub fn run(self: Arc<Self>, shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port))?;
        self.logger.info(
            &LogContext::new("-", self.config.port),
            "BOOT",
            format!("listening on port {}", self.config.port),
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
            thread::spawn(move || server.handle_connection(stream));
        }
        Ok(())
    }

    fn handle_connection(self: Arc<Self>, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        let ip = peer.map(|a| a.ip().to_string()).unwrap_or_else(|| "-".to_string());
        let port = peer.map(|a| a.port()).unwrap_or(0);
        let mut ctx = LogContext::new(ip, port);

        let reader_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut reader = BufReader::new(reader_stream);
        let mut writer = BufWriter::new(stream);

        let first_line = match wire::read_line(&mut reader) {
            Ok(Some(line)) => line,
            _ => return,
        };

        match FirstLine::parse(&first_line) {
            Ok(FirstLine::RegisterSs {
                nm_port,
                client_port,
                files,
            }) => {
                let inner = reader.into_inner();
                if let Ok(server) = self.ss_pool.register(inner, ip.clone(), nm_port, client_port, files) {
                    self.logger.info(
                        &ctx,
                        "REGISTER_SS",
                        format!("ss {} at {}:{}", server.id, server.ip, server.client_port),
                    );
                    let _ = wire::write_line(&mut writer, &Response::ok("registered").render());
                }
            }
            Ok(FirstLine::RegisterClient {
                username,
                nm_port: _,
                ss_port: _,
            }) => {
                ctx = ctx.with_user(&username);
                let now = common::timestamp::now_epoch();
                let _ = self.registry.mark_user_active(&username, &ip, true, now);
                self.logger.info(&ctx, "REGISTER_CLIENT", "session started");
                let _ = wire::write_line(&mut writer, &Response::ok("registered").render());

                self.client_loop(&mut reader, &mut writer, &username, &mut ctx);

                let now = common::timestamp::now_epoch();
                let _ = self.registry.mark_user_active(&username, &ip, false, now);
                self.logger.info(&ctx, "DISCONNECT", "session ended");
            }
            Err(err) => {
                self.logger.warn(&ctx, "HANDSHAKE", err.detail());
                let _ = wire::write_line(&mut writer, &Response::err(err).render());
            }
        }
    }

    fn client_loop(
        &self,
        reader: &mut BufReader<TcpStream>,
        writer: &mut BufWriter<TcpStream>,
        username: &str,
        ctx: &mut LogContext,
    ) {
        loop {
            let line = match wire::read_line(reader) {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => break,
            };
            let cmd = Command::parse(&line);
            if cmd.name.is_empty() {
                continue;
            }
            if cmd.name == "QUIT" {
                break;
            }
            let response = self.dispatch(&cmd, username, ctx);
            if wire::write_line(writer, &response.render()).is_err() {
                break;
            }
        }
    }
}
