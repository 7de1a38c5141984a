#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Line-oriented wire framing shared by the name server and storage server.
//!
//! Every connection in the workspace, NM↔client, NM↔SS, and client↔SS, speaks
//! newline-terminated text. This crate owns the one place that reads a line
//! off a socket and the two small vocabularies built on top of it: the NM's
//! `<code>:<message>` reply format ([`nm`]) and the SS's tagged status frames
//! ([`ss`]). Neither module owns a socket; callers hand in anything that
//! implements [`std::io::BufRead`]/[`std::io::Write`], which keeps this crate
//! testable without a real `TcpStream`.

pub mod command;
pub mod nm;
pub mod ss;

use std::io::{self, BufRead, Write};

/// Reads one newline-terminated line, stripping a trailing `\r\n` or `\n`.
///
/// Returns `Ok(None)` on a clean EOF (zero bytes read) so callers can tell a
/// closed connection apart from an empty line. Mirrors the framing every
/// `cmd_*` handler in `original_source` assumed a blocking `recv` gave it.
///
/// # Errors
///
/// Propagates any [`std::io::Error`] from the underlying reader.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = String::new();
    let n = reader.read_line(&mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    while buf.ends_with('\n') || buf.ends_with('\r') {
        buf.pop();
    }
    Ok(Some(buf))
}

/// Writes `line` followed by a single `\n`, flushing immediately.
///
/// Every reply in the workspace is one line; flushing here means a caller
/// never has to remember to do it before the peer's next blocking read.
///
/// # Errors
///
/// Propagates any [`std::io::Error`] from the underlying writer.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn read_line_strips_crlf() {
        let mut reader = BufReader::new("VIEW report.txt\r\n".as_bytes());
        assert_eq!(
            read_line(&mut reader).unwrap(),
            Some("VIEW report.txt".to_string())
        );
    }

    #[test]
    fn read_line_strips_bare_lf() {
        let mut reader = BufReader::new("QUIT\n".as_bytes());
        assert_eq!(read_line(&mut reader).unwrap(), Some("QUIT".to_string()));
    }

    #[test]
    fn read_line_reports_eof_as_none() {
        let mut reader = BufReader::new("".as_bytes());
        assert_eq!(read_line(&mut reader).unwrap(), None);
    }

    #[test]
    fn write_line_appends_single_newline() {
        let mut out = Vec::new();
        write_line(&mut out, "0:ok").unwrap();
        assert_eq!(out, b"0:ok\n");
    }
}
