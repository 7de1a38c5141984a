//! The NM↔SS forwarding channel: one persistent socket per registered
//! storage server, serialized by a per-server mutex, plus the round-robin
//! `CREATE` placement policy, per spec.md §4.4–§4.5.

use std::collections::HashSet;
use std::io::BufReader;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use common::{DocError, ErrorCode};
use wire::ss::StatusFrame;

/// One registered storage server and its persistent NM-facing socket.
pub struct StorageServer {
    /// Stable id, assigned on first registration and reused across
    /// reconnects.
    pub id: u64,
    /// The SS's advertised IPv4 address.
    pub ip: String,
    /// Port the SS listens on for NM forwarding.
    pub nm_port: u16,
    /// Port the SS listens on for direct client traffic.
    pub client_port: u16,
    conn: Mutex<(TcpStream, BufReader<TcpStream>)>,
    /// Filenames this SS holds, refreshed on registration and mutated by
    /// `CREATE`/`DELETE`.
    pub files: Mutex<HashSet<String>>,
    active: AtomicBool,
}

impl StorageServer {
    /// Sends one line and reads back one line on this server's persistent
    /// channel, serialized so two concurrent forwards can never interleave.
    ///
    /// A transport failure marks the server inactive and returns
    /// `SS_DISCONNECTED`; it is up to the caller to decide whether to retry
    /// on a different SS.
    pub fn forward(&self, command: &str) -> Result<String, DocError> {
        let mut guard = self.conn.lock().unwrap();
        let (writer, reader) = &mut *guard;
        let result = wire::write_line(writer, command)
            .and_then(|()| wire::read_line(reader));
        match result {
            Ok(Some(line)) => Ok(line),
            Ok(None) | Err(_) => {
                self.active.store(false, Ordering::SeqCst);
                Err(DocError::new(
                    ErrorCode::SsDisconnected,
                    format!("storage server {} unreachable", self.id),
                ))
            }
        }
    }

    /// Whether this server is believed reachable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn reactivate(&self, stream: TcpStream) -> std::io::Result<()> {
        let reader = BufReader::new(stream.try_clone()?);
        *self.conn.lock().unwrap() = (stream, reader);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// The set of registered storage servers, with round-robin `CREATE`
/// placement.
#[derive(Default)]
pub struct SsPool {
    servers: RwLock<Vec<Arc<StorageServer>>>,
    next_id: AtomicUsize,
    round_robin: AtomicUsize,
}

impl SsPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly connected storage server, or reconnects an
    /// existing one keyed by `(ip, client_port)`: the prior id, ACLs, and
    /// request queues are untouched, only the socket and file list are
    /// swapped in.
    ///
    /// # Errors
    ///
    /// Propagates any [`std::io::Error`] from cloning the handed-in stream.
    pub fn register(
        &self,
        stream: TcpStream,
        ip: String,
        nm_port: u16,
        client_port: u16,
        files: Vec<String>,
    ) -> std::io::Result<Arc<StorageServer>> {
        {
            let servers = self.servers.read().unwrap();
            if let Some(existing) = servers
                .iter()
                .find(|s| s.ip == ip && s.client_port == client_port)
            {
                existing.reactivate(stream)?;
                *existing.files.lock().unwrap() = files.into_iter().collect();
                return Ok(existing.clone());
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
        let reader = BufReader::new(stream.try_clone()?);
        let server = Arc::new(StorageServer {
            id,
            ip,
            nm_port,
            client_port,
            conn: Mutex::new((stream, reader)),
            files: Mutex::new(files.into_iter().collect()),
            active: AtomicBool::new(true),
        });
        self.servers.write().unwrap().push(server.clone());
        Ok(server)
    }

    /// Looks up a registered server by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<Arc<StorageServer>> {
        self.servers
            .read()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Forwards one command to the server with the given id.
    pub fn forward_to_ss(&self, id: u64, command: &str) -> Result<String, DocError> {
        self.get(id)
            .ok_or_else(|| DocError::new(ErrorCode::SsNotFound, "no such storage server"))?
            .forward(command)
    }

    /// Places a new file by round-robining over active servers, skipping a
    /// server on transport failure and failing immediately (without
    /// retrying) on an explicit SS `FILE_EXISTS`.
    pub fn create_on_next_ss(&self, filename: &str) -> Result<u64, DocError> {
        let servers = self.servers.read().unwrap();
        let active: Vec<_> = servers.iter().filter(|s| s.is_active()).cloned().collect();
        drop(servers);
        if active.is_empty() {
            return Err(DocError::new(ErrorCode::SsNotFound, "no active storage server"));
        }

        let start = self.round_robin.fetch_add(1, Ordering::SeqCst) % active.len();
        for offset in 0..active.len() {
            let server = &active[(start + offset) % active.len()];
            match server.forward(&format!("CREATE {filename}")) {
                Ok(reply) => match StatusFrame::parse(&reply) {
                    Ok(StatusFrame::Success) => {
                        server.files.lock().unwrap().insert(filename.to_string());
                        return Ok(server.id);
                    }
                    Ok(StatusFrame::Error(err)) if err.code() == ErrorCode::FileExists => {
                        return Err(err);
                    }
                    _ => continue,
                },
                Err(_) => continue,
            }
        }
        Err(DocError::new(ErrorCode::SsNotFound, "no storage server accepted the file"))
    }

    /// Returns the id of an active server that holds `filename`, if any.
    #[must_use]
    pub fn find_holder(&self, filename: &str) -> Option<Arc<StorageServer>> {
        self.servers
            .read()
            .unwrap()
            .iter()
            .find(|s| s.is_active() && s.files.lock().unwrap().contains(filename))
            .cloned()
    }
}
