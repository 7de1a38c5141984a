//! Access rights, ACL entries, and the request/approve/deny workflow laid
//! out in spec.md §4.2.

use common::DocError;

use crate::metadata::FileMetadata;

/// A level of access to a file. Variants are declared in increasing order
/// so `Ord`/`PartialOrd` give the right "at-least-right" comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessRight {
    /// No grant at all; the owner's implicit access is never represented
    /// this way.
    None,
    /// May `VIEW`/`READ`/`STREAM` but not acquire a write lock.
    Read,
    /// May additionally `WRITE`/`ETIRW`/`UNDO`.
    Write,
}

/// One grant in a file's ACL.
#[derive(Clone, Debug)]
pub struct AclEntry {
    /// The granted username.
    pub user: String,
    /// The granted right.
    pub right: AccessRight,
}

/// One pending `REQACCESS` awaiting an `APPROVE`/`DENY` from the owner.
#[derive(Clone, Debug)]
pub struct PendingRequest {
    /// The requesting username.
    pub user: String,
    /// The right being requested.
    pub right: AccessRight,
}

/// The outcome an owner can choose for a pending request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestDecision {
    /// Grant the requested right and clear the request.
    Approve,
    /// Clear the request without granting anything.
    Deny,
}

impl FileMetadata {
    /// Grants or updates `user`'s ACL entry to `right`. Fails
    /// `PermissionDenied` unless `caller` is the file's owner.
    pub fn add_access(
        &mut self,
        caller: &str,
        user: &str,
        right: AccessRight,
    ) -> Result<(), DocError> {
        self.require_owner(caller)?;
        if let Some(entry) = self.acl.iter_mut().find(|e| e.user == user) {
            entry.right = right;
        } else {
            self.acl.push(AclEntry {
                user: user.to_string(),
                right,
            });
        }
        Ok(())
    }

    /// Removes `user`'s ACL entry entirely. Fails `PermissionDenied` unless
    /// `caller` is the file's owner. A no-op (not an error) if `user` had no
    /// entry to begin with.
    pub fn remove_access(&mut self, caller: &str, user: &str) -> Result<(), DocError> {
        self.require_owner(caller)?;
        self.acl.retain(|entry| entry.user != user);
        Ok(())
    }

    /// Records a pending request for `right` from `user`.
    ///
    /// Fails `InvalidOperation` if `user` is the owner or already holds at
    /// least `right`; an existing pending entry for `user` is replaced
    /// rather than duplicated.
    pub fn request_access(&mut self, user: &str, right: AccessRight) -> Result<(), DocError> {
        if user == self.owner || self.check_access(user) >= right {
            return Err(DocError::invalid_operation(
                "already have at least the requested access",
            ));
        }
        if let Some(existing) = self.requests.iter_mut().find(|r| r.user == user) {
            existing.right = right;
        } else {
            self.requests.push(PendingRequest {
                user: user.to_string(),
                right,
            });
        }
        Ok(())
    }

    /// Resolves the pending request from `target`, granting on
    /// [`RequestDecision::Approve`]. Fails `PermissionDenied` unless
    /// `caller` is the owner, and `InvalidOperation` if no request from
    /// `target` is pending.
    ///
    /// On `Approve`, the grant is applied before the request is removed, so
    /// a failure mid-grant (there currently is none) would leave the
    /// request intact rather than silently dropping it.
    pub fn process_request(
        &mut self,
        caller: &str,
        target: &str,
        decision: RequestDecision,
    ) -> Result<(), DocError> {
        self.require_owner(caller)?;
        let index = self
            .requests
            .iter()
            .position(|r| r.user == target)
            .ok_or_else(|| DocError::invalid_operation(format!("no pending request from '{target}'")))?;

        if decision == RequestDecision::Approve {
            let right = self.requests[index].right;
            self.add_access(caller, target, right)?;
        }
        self.requests.remove(index);
        Ok(())
    }

    fn require_owner(&self, caller: &str) -> Result<(), DocError> {
        if caller != self.owner {
            return Err(DocError::new(
                common::ErrorCode::PermissionDenied,
                "only the owner may manage access",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> FileMetadata {
        FileMetadata::new("report.txt", "alice", 1, 1_700_000_000)
    }

    #[test]
    fn owner_has_implicit_write() {
        let m = meta();
        assert_eq!(m.check_access("alice"), AccessRight::Write);
        assert_eq!(m.check_access("bob"), AccessRight::None);
    }

    #[test]
    fn add_access_requires_owner() {
        let mut m = meta();
        let err = m.add_access("bob", "carol", AccessRight::Read).unwrap_err();
        assert_eq!(err.code(), common::ErrorCode::PermissionDenied);
    }

    #[test]
    fn add_access_updates_existing_entry() {
        let mut m = meta();
        m.add_access("alice", "bob", AccessRight::Read).unwrap();
        m.add_access("alice", "bob", AccessRight::Write).unwrap();
        assert_eq!(m.acl.len(), 1);
        assert_eq!(m.check_access("bob"), AccessRight::Write);
    }

    #[test]
    fn request_access_rejects_owner_and_redundant_request() {
        let mut m = meta();
        assert!(m.request_access("alice", AccessRight::Read).is_err());
        m.add_access("alice", "bob", AccessRight::Write).unwrap();
        assert!(m.request_access("bob", AccessRight::Read).is_err());
    }

    #[test]
    fn process_request_approve_grants_and_clears() {
        let mut m = meta();
        m.request_access("bob", AccessRight::Read).unwrap();
        m.process_request("alice", "bob", RequestDecision::Approve)
            .unwrap();
        assert_eq!(m.check_access("bob"), AccessRight::Read);
        assert!(m.requests.is_empty());
    }

    #[test]
    fn process_request_deny_only_clears() {
        let mut m = meta();
        m.request_access("bob", AccessRight::Write).unwrap();
        m.process_request("alice", "bob", RequestDecision::Deny)
            .unwrap();
        assert_eq!(m.check_access("bob"), AccessRight::None);
        assert!(m.requests.is_empty());
    }

    #[test]
    fn process_request_missing_is_invalid_operation() {
        let mut m = meta();
        let err = m
            .process_request("alice", "bob", RequestDecision::Approve)
            .unwrap_err();
        assert_eq!(err.code(), common::ErrorCode::InvalidOperation);
    }
}
