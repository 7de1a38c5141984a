//! Per-connection command dispatch for the storage server's wire dialect,
//! per spec.md §4.7/§4.9. Access control is the name server's job; by the
//! time a command reaches here the caller has already been redirected with
//! an `SS_INFO` frame or forwarded over the NM↔SS control channel, so every
//! handler here trusts its caller and only checks file/sentence existence.

use std::sync::Arc;

use common::{DocError, ErrorCode};
use wire::ss::{InfoPayload, StatusFrame};

use crate::file_entry::{FileEntry, SentenceLease};
use crate::store::Store;

/// One connection's mutable session state: at most one held sentence lock
/// at a time, matching spec.md §4.7 ("a session is single-client").
pub struct SsSession {
    store: Arc<Store>,
    lease: Option<ActiveLease>,
}

struct ActiveLease {
    filename: String,
    sentence_index: usize,
    lease: SentenceLease,
}

/// What a dispatched command asks the connection loop to do next.
pub enum DispatchOutcome {
    /// Write this single line as the reply.
    Line(String),
    /// Stream this file's words, per [`crate::stream::stream_to`].
    Stream(Arc<FileEntry>),
}

impl SsSession {
    /// Starts a fresh, lock-free session over `store`.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store, lease: None }
    }

    /// Dispatches one parsed command line.
    pub fn dispatch(&mut self, cmd: &wire::command::Command, now: i64) -> DispatchOutcome {
        if self.lease.is_some() {
            return self.dispatch_in_session(cmd);
        }
        if cmd.name == "STREAM" {
            return self.op_stream(cmd);
        }
        let result = match cmd.name.as_str() {
            "VIEW" => self.op_view(cmd, now),
            "CREATE" => self.op_create(cmd),
            "DELETE" => self.op_delete(cmd),
            "INFO" => self.op_info(cmd),
            "WRITE_LOCK" | "WRITE" => self.op_write_lock(cmd),
            "UNDO" => self.op_undo(cmd),
            "CHECKPOINT" => self.op_checkpoint(cmd),
            "VIEWCHECKPOINT" => self.op_view_checkpoint(cmd),
            "REVERT" => self.op_revert(cmd),
            "LISTCHECKPOINTS" => self.op_list_checkpoints(cmd),
            "WRITE_UNLOCK" => Err(DocError::invalid_operation("no active WRITE session")),
            _ => Err(DocError::invalid_operation(format!("unknown command '{}'", cmd.name))),
        };
        DispatchOutcome::Line(render(result))
    }

    fn dispatch_in_session(&mut self, cmd: &wire::command::Command) -> DispatchOutcome {
        let result = if cmd.name == "ETIRW" {
            self.commit()
        } else if cmd.name == "WRITE_UNLOCK" {
            self.unlock(cmd)
        } else if let Ok(word_index) = cmd.name.parse::<usize>() {
            self.insert(word_index, &cmd.rejoin_args())
        } else {
            Err(DocError::invalid_operation(
                "expected '<word_index> <content>', 'ETIRW', or 'WRITE_UNLOCK' inside a WRITE session",
            ))
        };
        DispatchOutcome::Line(render(result))
    }

    fn resolve(&self, name: &str) -> Result<Arc<FileEntry>, DocError> {
        self.store.get(name).ok_or_else(|| DocError::file_not_found(name))
    }

    fn op_view(&self, cmd: &wire::command::Command, now: i64) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("VIEW requires a filename"))?;
        Ok(self.resolve(filename)?.view(now))
    }

    fn op_create(&self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("CREATE requires a filename"))?;
        self.store.create(filename)?;
        Ok(StatusFrame::Success.render())
    }

    fn op_delete(&self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("DELETE requires a filename"))?;
        self.store.delete(filename)?;
        Ok(StatusFrame::Success.render())
    }

    fn op_info(&self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("INFO requires a filename"))?;
        let entry = self.resolve(filename)?;
        let stats = entry.stats();
        let last_access = entry.last_access();
        Ok(InfoPayload {
            size: stats.size as u64,
            words: stats.word_count as u64,
            chars: stats.char_count,
            last_access: if last_access == 0 { None } else { Some(last_access) },
        }
        .render())
    }

    fn op_stream(&self, cmd: &wire::command::Command) -> DispatchOutcome {
        let Some(filename) = cmd.arg(0) else {
            return DispatchOutcome::Line(render(Err(DocError::invalid_operation("STREAM requires a filename"))));
        };
        match self.resolve(filename) {
            Ok(entry) => DispatchOutcome::Stream(entry),
            Err(err) => DispatchOutcome::Line(render(Err(err))),
        }
    }

    fn op_write_lock(&mut self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("WRITE requires a filename"))?;
        let index: usize = cmd
            .arg(1)
            .ok_or_else(|| DocError::invalid_operation("WRITE requires a sentence index"))?
            .parse()
            .map_err(|_| DocError::new(ErrorCode::InvalidSentence, "sentence index must be an integer"))?;
        let entry = self.resolve(filename)?;
        let lease = entry.write_lock(index)?;
        self.lease = Some(ActiveLease {
            filename: filename.to_string(),
            sentence_index: index,
            lease,
        });
        Ok(StatusFrame::Locked.render())
    }

    fn insert(&self, word_index: usize, content: &str) -> Result<String, DocError> {
        let active = self.lease.as_ref().expect("insert only dispatched inside a session");
        active.lease.insert(word_index, content)?;
        Ok(StatusFrame::Success.render())
    }

    fn commit(&mut self) -> Result<String, DocError> {
        let active = self.lease.as_mut().expect("commit only dispatched inside a session");
        active.lease.commit()?;
        Ok(StatusFrame::Success.render())
    }

    fn unlock(&mut self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let active = self.lease.as_ref().expect("unlock only dispatched inside a session");
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("WRITE_UNLOCK requires a filename"))?;
        let index: usize = cmd
            .arg(1)
            .ok_or_else(|| DocError::invalid_operation("WRITE_UNLOCK requires a sentence index"))?
            .parse()
            .map_err(|_| DocError::new(ErrorCode::InvalidSentence, "sentence index must be an integer"))?;
        if filename != active.filename || index != active.sentence_index {
            return Err(DocError::invalid_operation("WRITE_UNLOCK does not match the held session"));
        }
        self.lease = None;
        Ok(StatusFrame::Unlocked.render())
    }

    fn op_undo(&self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("UNDO requires a filename"))?;
        self.resolve(filename)?.undo()?;
        Ok(StatusFrame::Success.render())
    }

    fn op_checkpoint(&self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("CHECKPOINT requires a filename"))?;
        let tag = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("CHECKPOINT requires a tag"))?;
        self.resolve(filename)?.create_checkpoint(tag)?;
        Ok(StatusFrame::Success.render())
    }

    fn op_view_checkpoint(&self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("VIEWCHECKPOINT requires a filename"))?;
        let tag = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("VIEWCHECKPOINT requires a tag"))?;
        self.resolve(filename)?.view_checkpoint(tag, crate::config::DEFAULT_MAX_CONTENT_BYTES)
    }

    fn op_revert(&self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("REVERT requires a filename"))?;
        let tag = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("REVERT requires a tag"))?;
        self.resolve(filename)?.revert_checkpoint(tag)?;
        Ok(StatusFrame::Success.render())
    }

    fn op_list_checkpoints(&self, cmd: &wire::command::Command) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("LISTCHECKPOINTS requires a filename"))?;
        let entries = self.resolve(filename)?.list_checkpoints()?;
        Ok(entries
            .into_iter()
            .map(|e| format!("{}:{}", e.tag, e.modified))
            .collect::<Vec<_>>()
            .join(","))
    }
}

fn render(result: Result<String, DocError>) -> String {
    match result {
        Ok(body) => body,
        Err(err) => StatusFrame::Error(err).render(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::Logger;
    use wire::command::Command;

    fn session() -> (tempfile::TempDir, SsSession) {
        session_with_content("Hello world.")
    }

    fn session_with_content(content: &str) -> (tempfile::TempDir, SsSession) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.txt"), content).unwrap();
        let logger = Logger::open(dir.path().join("ss_log.txt")).unwrap();
        let store = Arc::new(Store::boot(dir.path().to_path_buf(), 50, 1024 * 1024, &logger));
        (dir, SsSession::new(store))
    }

    fn line(outcome: DispatchOutcome) -> String {
        match outcome {
            DispatchOutcome::Line(s) => s,
            DispatchOutcome::Stream(_) => panic!("expected Line outcome"),
        }
    }

    #[test]
    fn view_on_missing_file_is_file_not_found() {
        let (_dir, mut sess) = session();
        let reply = line(sess.dispatch(&Command::parse("VIEW nope.txt"), 0));
        assert_eq!(reply, "ERROR:FILE_NOT_FOUND no such file 'nope.txt'");
    }

    #[test]
    fn create_then_view_round_trips() {
        let (_dir, mut sess) = session_with_content("");
        assert_eq!(line(sess.dispatch(&Command::parse("CREATE new.txt"), 0)), "SUCCESS");
        assert_eq!(line(sess.dispatch(&Command::parse("VIEW new.txt"), 0)), "");
    }

    #[test]
    fn full_write_session_commits_insert() {
        let (_dir, mut sess) = session();

        assert_eq!(line(sess.dispatch(&Command::parse("WRITE doc.txt 0"), 0)), "LOCKED");
        assert_eq!(line(sess.dispatch(&Command::parse("2 there"), 0)), "SUCCESS");
        assert_eq!(line(sess.dispatch(&Command::parse("ETIRW"), 0)), "SUCCESS");
        assert_eq!(line(sess.dispatch(&Command::parse("WRITE_UNLOCK doc.txt 0"), 0)), "UNLOCKED");
        assert_eq!(line(sess.dispatch(&Command::parse("VIEW doc.txt"), 0)), "Hello world there.");
    }

    #[test]
    fn second_lock_on_same_sentence_fails_while_session_open() {
        let (_dir, mut sess) = session();
        assert_eq!(line(sess.dispatch(&Command::parse("WRITE doc.txt 0"), 0)), "LOCKED");
        let reply = line(sess.dispatch(&Command::parse("ETIRW"), 0));
        assert_eq!(reply, "SUCCESS");
    }

    #[test]
    fn unmatched_write_unlock_is_rejected() {
        let (_dir, mut sess) = session();
        assert_eq!(line(sess.dispatch(&Command::parse("WRITE doc.txt 0"), 0)), "LOCKED");
        let reply = line(sess.dispatch(&Command::parse("WRITE_UNLOCK other.txt 0"), 0));
        assert!(reply.starts_with("ERROR:INVALID_OPERATION"));
    }
}
