//! One function per command a user can issue, mirroring the `cmd_*` surface
//! of the original terminal client: NM-routed commands send one line over
//! the existing [`NmSession`] and return its reply body; data-plane commands
//! additionally follow the `SS_INFO` redirect the name server replies with
//! and open a throwaway [`SsSession`] against the storage server.

use common::DocError;
use wire::ss::SsInfo;

use crate::error::ClientError;
use crate::nm_session::NmSession;
use crate::ss_session::SsSession;

/// Maps a single-letter access type (`R`/`W`, either case) to the wire
/// token `ADDACCESS`/`REQACCESS` expect.
///
/// # Errors
///
/// Returns [`ClientError::Protocol`] wrapping `INVALID_OPERATION` for
/// anything other than `R` or `W`.
pub fn access_right_token(access_type: char) -> Result<&'static str, ClientError> {
    match access_type.to_ascii_uppercase() {
        'R' => Ok("READ"),
        'W' => Ok("WRITE"),
        other => Err(DocError::invalid_operation(format!("unknown access type '{other}', expected R or W")).into()),
    }
}

/// `LIST`: the filenames visible to the caller.
pub fn list_files(nm: &mut NmSession) -> Result<Vec<String>, ClientError> {
    let reply = nm.send("LIST")?;
    Ok(reply.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
}

/// `VIEW <name>`: the file's full canonical content, fetched through the
/// name server's control channel (no redirect).
pub fn view_file(nm: &mut NmSession, filename: &str) -> Result<String, ClientError> {
    nm.send(&format!("VIEW {filename}"))
}

/// `CREATE <name>`.
pub fn create_file(nm: &mut NmSession, filename: &str) -> Result<String, ClientError> {
    nm.send(&format!("CREATE {filename}"))
}

/// `DELETE <name>`. Owner-only; the name server enforces this.
pub fn delete_file(nm: &mut NmSession, filename: &str) -> Result<String, ClientError> {
    nm.send(&format!("DELETE {filename}"))
}

/// `INFO <name>`: merged NM/SS metadata report.
pub fn file_info(nm: &mut NmSession, filename: &str) -> Result<String, ClientError> {
    nm.send(&format!("INFO {filename}"))
}

/// `EXEC <name> <program…>`: runs `program` with the file's content on its
/// stdin, through the host shell the name server delegates to.
pub fn exec_file(nm: &mut NmSession, filename: &str, program: &str) -> Result<String, ClientError> {
    nm.send(&format!("EXEC {filename} {program}"))
}

/// `UNDO <name>`: reverts the file's most recent committed edit.
pub fn undo_file(nm: &mut NmSession, filename: &str) -> Result<String, ClientError> {
    nm.send(&format!("UNDO {filename}"))
}

/// `ADDACCESS <name> <user> <READ|WRITE>`. Owner-only.
pub fn add_access(nm: &mut NmSession, filename: &str, target_user: &str, access_type: char) -> Result<String, ClientError> {
    let right = access_right_token(access_type)?;
    nm.send(&format!("ADDACCESS {filename} {target_user} {right}"))
}

/// `REMACCESS <name> <user>`. Owner-only.
pub fn remove_access(nm: &mut NmSession, filename: &str, target_user: &str) -> Result<String, ClientError> {
    nm.send(&format!("REMACCESS {filename} {target_user}"))
}

/// `REQACCESS <name> <READ|WRITE>`: files a pending request against the
/// file's owner.
pub fn request_access(nm: &mut NmSession, filename: &str, access_type: char) -> Result<String, ClientError> {
    let right = access_right_token(access_type)?;
    nm.send(&format!("REQACCESS {filename} {right}"))
}

/// `LISTREQUESTS <name>`. Owner-only.
pub fn list_requests(nm: &mut NmSession, filename: &str) -> Result<String, ClientError> {
    nm.send(&format!("LISTREQUESTS {filename}"))
}

/// `PROCESSREQUEST <name> <user> <APPROVE|DENY>`. Owner-only.
pub fn process_request(nm: &mut NmSession, filename: &str, target_user: &str, approve: bool) -> Result<String, ClientError> {
    let decision = if approve { "APPROVE" } else { "DENY" };
    nm.send(&format!("PROCESSREQUEST {filename} {target_user} {decision}"))
}

/// `CHECKPOINT <name> <tag>`. Requires write access.
pub fn checkpoint(nm: &mut NmSession, filename: &str, tag: &str) -> Result<String, ClientError> {
    nm.send(&format!("CHECKPOINT {filename} {tag}"))
}

/// `VIEWCHECKPOINT <name> <tag>`.
pub fn view_checkpoint(nm: &mut NmSession, filename: &str, tag: &str) -> Result<String, ClientError> {
    nm.send(&format!("VIEWCHECKPOINT {filename} {tag}"))
}

/// `REVERT <name> <tag>`. Requires write access.
pub fn revert_checkpoint(nm: &mut NmSession, filename: &str, tag: &str) -> Result<String, ClientError> {
    nm.send(&format!("REVERT {filename} {tag}"))
}

/// `LISTCHECKPOINTS <name>`.
pub fn list_checkpoints(nm: &mut NmSession, filename: &str) -> Result<String, ClientError> {
    nm.send(&format!("LISTCHECKPOINTS {filename}"))
}

/// Follows a `READ`/`STREAM`/`WRITE` reply's `SS_INFO <ip> <port>` redirect
/// and opens a direct connection to the named storage server.
fn follow_redirect(reply: &str) -> Result<SsSession, ClientError> {
    let info = SsInfo::parse(reply)
        .map_err(|()| DocError::system_error(format!("expected SS_INFO redirect, got '{reply}'")))?;
    SsSession::connect(&info.ip, info.port)
}

/// `READ <name>`: redirects to the owning storage server and fetches the
/// file's content with one direct `VIEW`.
pub fn read_file(nm: &mut NmSession, filename: &str) -> Result<String, ClientError> {
    let reply = nm.send(&format!("READ {filename}"))?;
    let mut ss = follow_redirect(&reply)?;
    ss.send_raw(&format!("VIEW {filename}"))
}

/// `STREAM <name>`: redirects to the owning storage server and plays the
/// file back word by word, invoking `on_word` for every line up to (not
/// including) the terminating `STOP`.
pub fn stream_file(nm: &mut NmSession, filename: &str, mut on_word: impl FnMut(&str)) -> Result<(), ClientError> {
    let reply = nm.send(&format!("STREAM {filename}"))?;
    let mut ss = follow_redirect(&reply)?;
    ss.send_only(&format!("STREAM {filename}"))?;
    loop {
        match ss.read_line()? {
            Some(line) if line == "STOP" => break,
            Some(line) => on_word(&line),
            None => break,
        }
    }
    Ok(())
}

/// An open `WRITE_LOCK`..`WRITE_UNLOCK` session against one sentence of one
/// file, held on a throwaway [`SsSession`] for the session's lifetime.
pub struct WriteSession {
    ss: SsSession,
    filename: String,
    sentence: usize,
}

impl WriteSession {
    /// `WRITE <name> <s#>`: redirects to the owning storage server and
    /// acquires the sentence lock.
    ///
    /// # Errors
    ///
    /// [`ClientError::Protocol`] with `FILE_LOCKED` if another client holds
    /// this sentence, or `INVALID_SENTENCE` if `sentence` is out of range.
    pub fn open(nm: &mut NmSession, filename: &str, sentence: usize) -> Result<Self, ClientError> {
        let reply = nm.send(&format!("WRITE {filename} {sentence}"))?;
        let mut ss = follow_redirect(&reply)?;
        ss.send_status(&format!("WRITE_LOCK {filename} {sentence}"))?;
        Ok(Self {
            ss,
            filename: filename.to_string(),
            sentence,
        })
    }

    /// Inserts whitespace-tokenized `content` at `word_index` within the
    /// draft. Takes effect only once [`Self::commit`] is called.
    pub fn insert(&mut self, word_index: usize, content: &str) -> Result<(), ClientError> {
        self.ss.send_status(&format!("{word_index} {content}"))?;
        Ok(())
    }

    /// `ETIRW`: commits every insert issued so far onto the live document.
    pub fn commit(&mut self) -> Result<(), ClientError> {
        self.ss.send_status("ETIRW")?;
        Ok(())
    }

    /// `WRITE_UNLOCK <name> <s#>`: releases the sentence lock, consuming
    /// this session. An uncommitted draft is discarded by the server.
    pub fn unlock(mut self) -> Result<(), ClientError> {
        self.ss
            .send_status(&format!("WRITE_UNLOCK {} {}", self.filename, self.sentence))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_right_token_accepts_either_case() {
        assert_eq!(access_right_token('r').unwrap(), "READ");
        assert_eq!(access_right_token('W').unwrap(), "WRITE");
    }

    #[test]
    fn access_right_token_rejects_unknown_letter() {
        let err = access_right_token('x').unwrap_err();
        match err {
            ClientError::Protocol(e) => assert_eq!(e.code(), common::ErrorCode::InvalidOperation),
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[test]
    fn follow_redirect_rejects_non_redirect_reply() {
        let err = follow_redirect("not a redirect").unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
