//! The name server's client-facing wire dialect.
//!
//! A freshly accepted connection must send exactly one [`FirstLine`] before
//! anything else; the dispatcher in `nm` then read-loops [`Command`]s
//! (re-exported from [`crate::command`]) until the peer disconnects or sends
//! `QUIT`, replying to each with a [`Response`] rendered as `code:message\n`.

use common::DocError;

pub use crate::command::Command;

/// The mandatory first line of an NM connection, identifying the peer as
/// either a storage server or an interactive client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FirstLine {
    /// `REGISTER_SS <nm_port> <client_port> <n> <name1>…<nameN>`
    RegisterSs {
        /// Port the SS listens on for NM forwarding.
        nm_port: u16,
        /// Port the SS listens on for direct client traffic.
        client_port: u16,
        /// Filenames this SS already holds on disk at boot.
        files: Vec<String>,
    },
    /// `REGISTER_CLIENT <username> <nm_port> <ss_port>`
    RegisterClient {
        /// The identifying username for this session.
        username: String,
        /// Port the client listens on, if it accepts direct SS callbacks.
        nm_port: u16,
        /// Port the client expects SS redirects to target.
        ss_port: u16,
    },
}

impl FirstLine {
    /// Parses the first line of a new NM connection.
    ///
    /// # Errors
    ///
    /// Returns [`common::ErrorCode::InvalidOperation`] if the line is not a
    /// well-formed `REGISTER_SS` or `REGISTER_CLIENT`; per spec, the caller
    /// is expected to terminate the connection on this error rather than
    /// retry the handshake.
    pub fn parse(line: &str) -> Result<Self, DocError> {
        let cmd = Command::parse(line);
        match cmd.name.as_str() {
            "REGISTER_SS" => {
                if cmd.args.len() < 3 {
                    return Err(DocError::invalid_operation("malformed REGISTER_SS"));
                }
                let nm_port = parse_port(&cmd.args[0])?;
                let client_port = parse_port(&cmd.args[1])?;
                let n: usize = cmd.args[2]
                    .parse()
                    .map_err(|_| DocError::invalid_operation("malformed REGISTER_SS file count"))?;
                let files = cmd.args[3..].to_vec();
                if files.len() != n {
                    return Err(DocError::invalid_operation(
                        "REGISTER_SS file count mismatch",
                    ));
                }
                Ok(Self::RegisterSs {
                    nm_port,
                    client_port,
                    files,
                })
            }
            "REGISTER_CLIENT" => {
                if cmd.args.len() != 3 {
                    return Err(DocError::invalid_operation("malformed REGISTER_CLIENT"));
                }
                Ok(Self::RegisterClient {
                    username: cmd.args[0].clone(),
                    nm_port: parse_port(&cmd.args[1])?,
                    ss_port: parse_port(&cmd.args[2])?,
                })
            }
            _ => Err(DocError::invalid_operation(
                "connection must open with REGISTER_SS or REGISTER_CLIENT",
            )),
        }
    }
}

fn parse_port(token: &str) -> Result<u16, DocError> {
    token
        .parse()
        .map_err(|_| DocError::invalid_operation(format!("invalid port '{token}'")))
}

/// An NM reply, rendered onto the wire as `<code>:<message>\n`.
#[derive(Clone, Debug)]
pub struct Response(Result<String, DocError>);

impl Response {
    /// A successful reply carrying a free-form message body.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self(Ok(message.into()))
    }

    /// A successful reply with an empty body (`0:ok`), for commands whose
    /// only observable effect is the code itself (`DELETE`, `WRITE_UNLOCK`).
    #[must_use]
    pub fn ok_empty() -> Self {
        Self::ok("ok")
    }

    /// A failed reply carrying the propagated [`DocError`].
    #[must_use]
    pub fn err(error: DocError) -> Self {
        Self(Err(error))
    }

    /// Renders this response as the line body (without the trailing
    /// newline, which [`crate::write_line`] adds).
    #[must_use]
    pub fn render(&self) -> String {
        match &self.0 {
            Ok(message) => format!("{}:{message}", common::ErrorCode::Success.as_i32()),
            Err(error) => error.render_nm(),
        }
    }
}

impl From<Result<String, DocError>> for Response {
    fn from(result: Result<String, DocError>) -> Self {
        match result {
            Ok(message) => Self::ok(message),
            Err(error) => Self::err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ErrorCode;

    #[test]
    fn parses_register_ss_with_files() {
        let line = "REGISTER_SS 9001 9101 2 report.txt memo.txt";
        let first = FirstLine::parse(line).unwrap();
        assert_eq!(
            first,
            FirstLine::RegisterSs {
                nm_port: 9001,
                client_port: 9101,
                files: vec!["report.txt".to_string(), "memo.txt".to_string()],
            }
        );
    }

    #[test]
    fn parses_register_ss_with_zero_files() {
        let first = FirstLine::parse("REGISTER_SS 9001 9101 0").unwrap();
        assert_eq!(
            first,
            FirstLine::RegisterSs {
                nm_port: 9001,
                client_port: 9101,
                files: vec![],
            }
        );
    }

    #[test]
    fn rejects_register_ss_count_mismatch() {
        let err = FirstLine::parse("REGISTER_SS 9001 9101 3 a.txt b.txt").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
    }

    #[test]
    fn parses_register_client() {
        let first = FirstLine::parse("REGISTER_CLIENT alice 8001 0").unwrap();
        assert_eq!(
            first,
            FirstLine::RegisterClient {
                username: "alice".to_string(),
                nm_port: 8001,
                ss_port: 0,
            }
        );
    }

    #[test]
    fn rejects_unknown_first_line() {
        let err = FirstLine::parse("VIEW report.txt").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
    }

    #[test]
    fn response_render_formats_code_colon_message() {
        assert_eq!(Response::ok("created 'a.txt'").render(), "0:created 'a.txt'");
        let err = Response::err(DocError::file_not_found("a.txt"));
        assert_eq!(err.render(), "1:no such file 'a.txt'");
    }
}
