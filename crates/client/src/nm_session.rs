//! The persistent Client↔NM control connection.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use common::{DocError, ErrorCode};

use crate::error::ClientError;

/// A registered session against the name server.
///
/// Holds the one TCP connection opened at startup; every NM-routed command
/// in [`crate::commands`] sends one line and reads one reply over this same
/// socket, so commands issued in order receive responses in order (spec.md
/// §5's ordering guarantee for a single Client↔NM socket).
pub struct NmSession {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl NmSession {
    /// Dials `nm_host:nm_port` and registers as `username`.
    ///
    /// The client never accepts inbound NM/SS callbacks, so the
    /// `REGISTER_CLIENT` port fields are always sent as `0`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] on a transport failure, or
    /// [`ClientError::Protocol`] if the name server rejects the handshake.
    pub fn connect(username: &str, nm_host: &str, nm_port: u16) -> Result<Self, ClientError> {
        let stream = TcpStream::connect((nm_host, nm_port))?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);
        wire::write_line(&mut writer, &format!("REGISTER_CLIENT {username} 0 0"))?;
        let ack = wire::read_line(&mut reader)?.ok_or(ClientError::Disconnected)?;
        parse_reply(&ack)?;
        Ok(Self { reader, writer })
    }

    /// Sends one command line and returns the parsed reply body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] on a transport failure,
    /// [`ClientError::Disconnected`] on a clean EOF, or
    /// [`ClientError::Protocol`] if the reply carries a non-success code.
    pub fn send(&mut self, command: &str) -> Result<String, ClientError> {
        wire::write_line(&mut self.writer, command)?;
        let line = wire::read_line(&mut self.reader)?.ok_or(ClientError::Disconnected)?;
        parse_reply(&line)
    }

    /// Sends `QUIT`. The name server closes its end on receipt; this does
    /// not wait for that to happen.
    pub fn quit(mut self) {
        let _ = wire::write_line(&mut self.writer, "QUIT");
    }
}

/// Parses a `<code>:<message>` reply line into `Ok(message)` on success or
/// `Err` carrying the decoded [`ErrorCode`] otherwise.
fn parse_reply(line: &str) -> Result<String, ClientError> {
    let mut parts = line.splitn(2, ':');
    let code: i32 = parts
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| DocError::system_error(format!("malformed reply '{line}'")))?;
    let message = parts.next().unwrap_or_default().to_string();
    if ErrorCode::from_i32(code) == ErrorCode::Success {
        Ok(message)
    } else {
        Err(DocError::new(ErrorCode::from_i32(code), message).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reply_success_yields_message() {
        assert_eq!(parse_reply("0:created 'a.txt'").unwrap(), "created 'a.txt'");
    }

    #[test]
    fn parse_reply_error_yields_protocol_error() {
        let err = parse_reply("1:no such file 'a.txt'").unwrap_err();
        match err {
            ClientError::Protocol(e) => {
                assert_eq!(e.code(), ErrorCode::FileNotFound);
                assert_eq!(e.detail(), "no such file 'a.txt'");
            }
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[test]
    fn parse_reply_rejects_non_numeric_code() {
        assert!(parse_reply("oops:bad").is_err());
    }

    #[test]
    fn connect_and_send_round_trip_over_a_real_socket() {
        use std::io::{BufRead, BufReader as StdBufReader, Write};
        use std::net::TcpListener;
        use std::thread;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = StdBufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;

            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line.trim_end(), "REGISTER_CLIENT alice 0 0");
            writeln!(writer, "0:registered").unwrap();

            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line.trim_end(), "VIEW report.txt");
            writeln!(writer, "0:hello world").unwrap();
        });

        let mut session = NmSession::connect("alice", "127.0.0.1", addr.port()).unwrap();
        let reply = session.send("VIEW report.txt").unwrap();
        assert_eq!(reply, "hello world");

        server.join().unwrap();
    }
}
