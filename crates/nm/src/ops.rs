//! The command table: one function per NM operation in spec.md §4.4,
//! dispatched by name from [`crate::server::NmServer::dispatch`].

use common::{DocError, ErrorCode};
use logging::LogContext;
use wire::nm::{Command, Response};
use wire::ss::{InfoPayload, SsInfo, StatusFrame};

use crate::acl::{AccessRight, RequestDecision};
use crate::metadata::{FileMetadata, FileMetadataHandle};
use crate::server::NmServer;

impl NmServer {
    /// Routes one parsed command to its handler and renders the result.
    pub fn dispatch(&self, cmd: &Command, user: &str, ctx: &LogContext) -> Response {
        let result = match cmd.name.as_str() {
            "VIEW" => self.op_view(cmd, user),
            "CREATE" => self.op_create(cmd, user),
            "DELETE" => self.op_delete(cmd, user),
            "INFO" => self.op_info(cmd, user),
            "READ" | "STREAM" => self.op_redirect(cmd, user, AccessRight::Read),
            "WRITE" => self.op_redirect(cmd, user, AccessRight::Write),
            "UNDO" => self.op_undo(cmd, user),
            "EXEC" => self.op_exec(cmd, user),
            "LIST" => self.op_list(user),
            "ADDACCESS" => self.op_add_access(cmd, user),
            "REMACCESS" => self.op_rem_access(cmd, user),
            "REQACCESS" => self.op_req_access(cmd, user),
            "LISTREQUESTS" => self.op_list_requests(cmd, user),
            "PROCESSREQUEST" => self.op_process_request(cmd, user),
            "CHECKPOINT" => self.op_checkpoint(cmd, user),
            "VIEWCHECKPOINT" => self.op_view_checkpoint(cmd, user),
            "REVERT" => self.op_revert(cmd, user),
            "LISTCHECKPOINTS" => self.op_list_checkpoints(cmd, user),
            _ => Err(DocError::invalid_operation(format!("unknown command '{}'", cmd.name))),
        };
        if let Err(err) = &result {
            self.logger.warn(ctx, &cmd.name, err.detail());
        } else {
            self.logger.info(ctx, &cmd.name, cmd.rejoin_args());
        }
        result.into()
    }

    fn resolve(&self, name: &str) -> Result<FileMetadataHandle, DocError> {
        self.index.lookup(name).ok_or_else(|| DocError::file_not_found(name))
    }

    fn require_access(meta: &FileMetadata, user: &str, min: AccessRight) -> Result<(), DocError> {
        if meta.check_access(user) >= min {
            Ok(())
        } else {
            Err(DocError::unauthorized(&meta.filename))
        }
    }

    fn op_view(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("VIEW requires a filename"))?;
        let handle = self.resolve(filename)?;
        let ss_id = {
            let meta = handle.lock().unwrap();
            Self::require_access(&meta, user, AccessRight::Read)?;
            meta.ss_id
        };
        let reply = self.ss_pool.forward_to_ss(ss_id, &format!("VIEW {filename}"))?;
        if let Ok(StatusFrame::Error(err)) = StatusFrame::parse(&reply) {
            return Err(err);
        }
        Ok(reply)
    }

    fn op_create(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("CREATE requires a filename"))?;
        if self.index.lookup(filename).is_some() {
            return Err(DocError::new(ErrorCode::FileExists, format!("'{filename}' already exists")));
        }
        let ss_id = self.ss_pool.create_on_next_ss(filename)?;
        let now = common::timestamp::now_epoch();
        let meta = std::sync::Arc::new(std::sync::Mutex::new(FileMetadata::new(filename, user, ss_id, now)));
        self.index.insert(filename, meta)?;
        Ok(format!("created '{filename}'"))
    }

    fn op_delete(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("DELETE requires a filename"))?;
        let handle = self.resolve(filename)?;
        let ss_id = {
            let meta = handle.lock().unwrap();
            if meta.owner != user {
                return Err(DocError::new(ErrorCode::PermissionDenied, "only the owner may delete"));
            }
            meta.ss_id
        };
        let reply = self.ss_pool.forward_to_ss(ss_id, &format!("DELETE {filename}"))?;
        if let Ok(StatusFrame::Error(err)) = StatusFrame::parse(&reply) {
            return Err(err);
        }
        if let Some(server) = self.ss_pool.get(ss_id) {
            server.files.lock().unwrap().remove(filename);
        }
        self.index.remove(filename);
        Ok(format!("deleted '{filename}'"))
    }

    fn op_info(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("INFO requires a filename"))?;
        let handle = self.resolve(filename)?;
        let (owner, ss_id) = {
            let meta = handle.lock().unwrap();
            Self::require_access(&meta, user, AccessRight::Read)?;
            (meta.owner.clone(), meta.ss_id)
        };
        let reply = self.ss_pool.forward_to_ss(ss_id, &format!("INFO {filename}"))?;
        let info = InfoPayload::parse(&reply)
            .map_err(|()| DocError::system_error("malformed INFO reply from storage server"))?;
        {
            let mut meta = handle.lock().unwrap();
            meta.size = info.size;
            meta.word_count = info.words;
            meta.char_count = info.chars;
            if let Some(ts) = info.last_access {
                meta.last_access = ts;
            }
        }
        Ok(format!("OWNER:{owner} {}", info.render()))
    }

    fn op_redirect(&self, cmd: &Command, user: &str, min: AccessRight) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("filename required"))?;
        let handle = self.resolve(filename)?;
        let ss_id = {
            let meta = handle.lock().unwrap();
            Self::require_access(&meta, user, min)?;
            meta.ss_id
        };
        let server = self
            .ss_pool
            .get(ss_id)
            .ok_or_else(|| DocError::new(ErrorCode::SsNotFound, "no active storage server"))?;
        if !server.is_active() {
            return Err(DocError::new(ErrorCode::SsDisconnected, "storage server unreachable"));
        }
        Ok(SsInfo {
            ip: server.ip.clone(),
            port: server.client_port,
        }
        .render())
    }

    fn op_undo(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("UNDO requires a filename"))?;
        let handle = self.resolve(filename)?;
        let ss_id = {
            let meta = handle.lock().unwrap();
            Self::require_access(&meta, user, AccessRight::Write)?;
            meta.ss_id
        };
        let reply = self.ss_pool.forward_to_ss(ss_id, &format!("UNDO {filename}"))?;
        match StatusFrame::parse(&reply) {
            Ok(StatusFrame::Success) => Ok(format!("reverted last edit to '{filename}'")),
            Ok(StatusFrame::Error(err)) => Err(err),
            _ => Err(DocError::system_error("malformed UNDO reply from storage server")),
        }
    }

    fn op_exec(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("EXEC requires a filename"))?;
        let program = cmd.args.get(1..).map(|a| a.join(" ")).filter(|s| !s.is_empty())
            .ok_or_else(|| DocError::invalid_operation("EXEC requires a program"))?;
        let handle = self.resolve(filename)?;
        let ss_id = {
            let meta = handle.lock().unwrap();
            Self::require_access(&meta, user, AccessRight::Read)?;
            meta.ss_id
        };
        let content = self.ss_pool.forward_to_ss(ss_id, &format!("VIEW {filename}"))?;
        self.command_runner.run(&program, &content)
    }

    fn op_list(&self, user: &str) -> Result<String, DocError> {
        let names = self.index.list();
        let visible: Vec<String> = names
            .into_iter()
            .filter(|name| {
                self.index
                    .lookup(name)
                    .map(|h| h.lock().unwrap().check_access(user) > AccessRight::None)
                    .unwrap_or(false)
            })
            .collect();
        Ok(visible.join(","))
    }

    fn op_add_access(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("ADDACCESS requires a filename"))?;
        let target = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("ADDACCESS requires a user"))?;
        let right = parse_right(cmd.arg(2))?;
        let handle = self.resolve(filename)?;
        handle.lock().unwrap().add_access(user, target, right)?;
        Ok(format!("granted {target} {right:?} on '{filename}'"))
    }

    fn op_rem_access(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("REMACCESS requires a filename"))?;
        let target = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("REMACCESS requires a user"))?;
        let handle = self.resolve(filename)?;
        handle.lock().unwrap().remove_access(user, target)?;
        Ok(format!("revoked {target} on '{filename}'"))
    }

    fn op_req_access(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("REQACCESS requires a filename"))?;
        let right = parse_right(cmd.arg(1))?;
        let handle = self.resolve(filename)?;
        handle.lock().unwrap().request_access(user, right)?;
        Ok(format!("requested {right:?} on '{filename}'"))
    }

    fn op_list_requests(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("LISTREQUESTS requires a filename"))?;
        let handle = self.resolve(filename)?;
        let meta = handle.lock().unwrap();
        if meta.owner != user {
            return Err(DocError::new(ErrorCode::PermissionDenied, "only the owner may list requests"));
        }
        Ok(meta
            .requests
            .iter()
            .map(|r| format!("{}:{:?}", r.user, r.right))
            .collect::<Vec<_>>()
            .join(","))
    }

    fn op_process_request(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("PROCESSREQUEST requires a filename"))?;
        let target = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("PROCESSREQUEST requires a user"))?;
        let decision = match cmd.arg(2) {
            Some("APPROVE") => RequestDecision::Approve,
            Some("DENY") => RequestDecision::Deny,
            _ => return Err(DocError::invalid_operation("expected APPROVE or DENY")),
        };
        let handle = self.resolve(filename)?;
        handle.lock().unwrap().process_request(user, target, decision)?;
        Ok(format!("{decision:?} {target} on '{filename}'"))
    }

    fn op_checkpoint(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("CHECKPOINT requires a filename"))?;
        let tag = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("CHECKPOINT requires a tag"))?;
        let ss_id = self.require_write(filename, user)?;
        let reply = self.ss_pool.forward_to_ss(ss_id, &format!("CHECKPOINT {filename} {tag}"))?;
        match StatusFrame::parse(&reply) {
            Ok(StatusFrame::Success) => Ok(format!("checkpoint '{tag}' created for '{filename}'")),
            Ok(StatusFrame::Error(err)) => Err(err),
            _ => Err(DocError::system_error("malformed CHECKPOINT reply from storage server")),
        }
    }

    fn op_view_checkpoint(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("VIEWCHECKPOINT requires a filename"))?;
        let tag = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("VIEWCHECKPOINT requires a tag"))?;
        let handle = self.resolve(filename)?;
        let ss_id = {
            let meta = handle.lock().unwrap();
            Self::require_access(&meta, user, AccessRight::Read)?;
            meta.ss_id
        };
        let reply = self.ss_pool.forward_to_ss(ss_id, &format!("VIEWCHECKPOINT {filename} {tag}"))?;
        if let Ok(StatusFrame::Error(err)) = StatusFrame::parse(&reply) {
            return Err(err);
        }
        Ok(reply)
    }

    fn op_revert(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("REVERT requires a filename"))?;
        let tag = cmd.arg(1).ok_or_else(|| DocError::invalid_operation("REVERT requires a tag"))?;
        let ss_id = self.require_write(filename, user)?;
        let reply = self.ss_pool.forward_to_ss(ss_id, &format!("REVERT {filename} {tag}"))?;
        match StatusFrame::parse(&reply) {
            Ok(StatusFrame::Success) => Ok(format!("reverted '{filename}' to checkpoint '{tag}'")),
            Ok(StatusFrame::Error(err)) => Err(err),
            _ => Err(DocError::system_error("malformed REVERT reply from storage server")),
        }
    }

    fn op_list_checkpoints(&self, cmd: &Command, user: &str) -> Result<String, DocError> {
        let filename = cmd.arg(0).ok_or_else(|| DocError::invalid_operation("LISTCHECKPOINTS requires a filename"))?;
        let handle = self.resolve(filename)?;
        let ss_id = {
            let meta = handle.lock().unwrap();
            Self::require_access(&meta, user, AccessRight::Read)?;
            meta.ss_id
        };
        let reply = self.ss_pool.forward_to_ss(ss_id, &format!("LISTCHECKPOINTS {filename}"))?;
        if let Ok(StatusFrame::Error(err)) = StatusFrame::parse(&reply) {
            return Err(err);
        }
        Ok(reply)
    }

    fn require_write(&self, filename: &str, user: &str) -> Result<u64, DocError> {
        let handle = self.resolve(filename)?;
        let meta = handle.lock().unwrap();
        Self::require_access(&meta, user, AccessRight::Write)?;
        Ok(meta.ss_id)
    }
}

fn parse_right(token: Option<&str>) -> Result<AccessRight, DocError> {
    match token {
        Some("READ") => Ok(AccessRight::Read),
        Some("WRITE") => Ok(AccessRight::Write),
        _ => Err(DocError::invalid_operation("expected READ or WRITE")),
    }
}
