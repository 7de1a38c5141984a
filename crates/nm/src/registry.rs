//! The persistent user registry: `username|last_ip|first_seen|last_seen|
//! active` lines, loaded once at startup and rewritten atomically after
//! every mutation, per spec.md §4.3.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One registered user's last-known session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    /// The username.
    pub username: String,
    /// IP address of the most recent session.
    pub last_ip: String,
    /// Unix epoch seconds of this user's first-ever session.
    pub first_seen: i64,
    /// Unix epoch seconds of this user's most recent session.
    pub last_seen: i64,
    /// Whether the user currently has an open connection.
    pub active: bool,
}

impl UserRecord {
    fn render(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.username, self.last_ip, self.first_seen, self.last_seen, self.active as u8
        )
    }

    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(5, '|');
        Some(Self {
            username: fields.next()?.to_string(),
            last_ip: fields.next()?.to_string(),
            first_seen: fields.next()?.parse().ok()?,
            last_seen: fields.next()?.parse().ok()?,
            active: fields.next()? != "0",
        })
    }
}

/// The persistent set of known users, serialized to a flat file.
pub struct UserRegistry {
    path: PathBuf,
    users: Mutex<BTreeMap<String, UserRecord>>,
}

impl UserRegistry {
    /// Loads the registry from `path`. A missing file is treated as an
    /// empty registry rather than an error, matching a fresh install.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`io::Error`] for any failure other than the
    /// file not existing.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut users = BTreeMap::new();
        match fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    if let Some(record) = UserRecord::parse(line) {
                        users.insert(record.username.clone(), record);
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    /// Marks `user` active or inactive, recording `ip` and updating
    /// `first_seen`/`last_seen` as appropriate, then persists the whole
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`io::Error`] if the rewrite fails.
    pub fn mark_user_active(&self, user: &str, ip: &str, active: bool, now: i64) -> io::Result<()> {
        {
            let mut users = self.users.lock().unwrap();
            let record = users.entry(user.to_string()).or_insert_with(|| UserRecord {
                username: user.to_string(),
                last_ip: ip.to_string(),
                first_seen: now,
                last_seen: now,
                active,
            });
            record.last_ip = ip.to_string();
            record.last_seen = now;
            record.active = active;
        }
        self.persist()
    }

    /// Returns a snapshot of every registered user.
    #[must_use]
    pub fn snapshot(&self) -> Vec<UserRecord> {
        self.users.lock().unwrap().values().cloned().collect()
    }

    fn persist(&self) -> io::Result<()> {
        let users = self.users.lock().unwrap();
        let mut out = String::new();
        for record in users.values() {
            out.push_str(&record.render());
            out.push('\n');
        }
        write_atomic(&self.path, out.as_bytes())
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(contents)?;
        tmp.flush()?;
    }
    fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = UserRegistry::load(dir.path().join("users.txt")).unwrap();
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn mark_active_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.txt");
        let registry = UserRegistry::load(&path).unwrap();
        registry.mark_user_active("alice", "10.0.0.1", true, 100).unwrap();
        registry.mark_user_active("alice", "10.0.0.2", false, 200).unwrap();

        let reloaded = UserRegistry::load(&path).unwrap();
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.len(), 1);
        let alice = &snapshot[0];
        assert_eq!(alice.last_ip, "10.0.0.2");
        assert_eq!(alice.first_seen, 100);
        assert_eq!(alice.last_seen, 200);
        assert!(!alice.active);
    }

    #[test]
    fn record_round_trips_through_render_and_parse() {
        let record = UserRecord {
            username: "bob".to_string(),
            last_ip: "127.0.0.1".to_string(),
            first_seen: 1,
            last_seen: 2,
            active: true,
        };
        let parsed = UserRecord::parse(&record.render()).unwrap();
        assert_eq!(parsed, record);
    }
}
