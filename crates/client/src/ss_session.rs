//! An ad hoc Client↔SS connection opened after an `SS_INFO` redirect.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use common::DocError;
use wire::ss::StatusFrame;

use crate::error::ClientError;

/// A direct connection to a storage server, opened after a `READ`, `STREAM`,
/// or `WRITE` redirect from the name server.
///
/// Lives only as long as one data-plane operation: a `VIEW`, a `STREAM`
/// playback, or one `WRITE_LOCK`..`WRITE_UNLOCK` session.
pub struct SsSession {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl SsSession {
    /// Dials `ip:port` as advertised by an `SS_INFO` redirect.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the connection cannot be established.
    pub fn connect(ip: &str, port: u16) -> Result<Self, ClientError> {
        let stream = TcpStream::connect((ip, port))?;
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        Ok(Self { reader, writer })
    }

    /// Sends one line and returns the raw reply line, unparsed.
    ///
    /// Used for `VIEW`/`INFO`/checkpoint-listing exchanges, where the reply
    /// is a raw payload rather than a [`StatusFrame`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] on a transport failure or
    /// [`ClientError::Disconnected`] on a clean EOF.
    pub fn send_raw(&mut self, command: &str) -> Result<String, ClientError> {
        wire::write_line(&mut self.writer, command)?;
        wire::read_line(&mut self.reader)?.ok_or(ClientError::Disconnected)
    }

    /// Sends one line and parses the reply as a [`StatusFrame`].
    ///
    /// # Errors
    ///
    /// As [`Self::send_raw`], plus [`ClientError::Protocol`] if the reply is
    /// not a recognized status frame, or carries an `ERROR:` frame.
    pub fn send_status(&mut self, command: &str) -> Result<StatusFrame, ClientError> {
        let line = self.send_raw(command)?;
        let frame = StatusFrame::parse(&line)
            .map_err(|()| DocError::system_error(format!("malformed status frame '{line}'")))?;
        match frame {
            StatusFrame::Error(err) => Err(err.into()),
            other => Ok(other),
        }
    }

    /// Sends one line without waiting for a reply, used to kick off a
    /// `STREAM` session whose subsequent lines arrive unprompted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] on a transport failure.
    pub fn send_only(&mut self, command: &str) -> Result<(), ClientError> {
        wire::write_line(&mut self.writer, command)?;
        Ok(())
    }

    /// Reads one line without sending anything first.
    ///
    /// Used inside a `STREAM` session's word-by-word playback loop, where
    /// the server pushes lines unprompted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] on a transport failure.
    pub fn read_line(&mut self) -> Result<Option<String>, ClientError> {
        Ok(wire::read_line(&mut self.reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader as StdBufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn send_status_surfaces_an_error_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = StdBufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line.trim_end(), "WRITE_LOCK doc.txt 0");
            writeln!(writer, "ERROR:FILE_LOCKED sentence 0 held by bob").unwrap();
        });

        let mut ss = SsSession::connect("127.0.0.1", addr.port()).unwrap();
        let err = ss.send_status("WRITE_LOCK doc.txt 0").unwrap_err();
        match err {
            ClientError::Protocol(e) => assert_eq!(e.code(), common::ErrorCode::FileLocked),
            other => panic!("expected Protocol, got {other:?}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn stream_playback_reads_words_until_stop() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = StdBufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line.trim_end(), "STREAM doc.txt");
            writeln!(writer, "Hello").unwrap();
            writeln!(writer, "world.").unwrap();
            writeln!(writer, "STOP").unwrap();
        });

        let mut ss = SsSession::connect("127.0.0.1", addr.port()).unwrap();
        ss.send_only("STREAM doc.txt").unwrap();
        let mut words = Vec::new();
        loop {
            match ss.read_line().unwrap() {
                Some(line) if line == "STOP" => break,
                Some(line) => words.push(line),
                None => break,
            }
        }
        assert_eq!(words, vec!["Hello".to_string(), "world.".to_string()]);
        server.join().unwrap();
    }
}
