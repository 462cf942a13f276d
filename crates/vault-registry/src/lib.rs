#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `vault-registry` maintains the account table in memory and mirrors it to
//! a persistent text-line file (`users.txt`, under the storage root) on
//! every mutation. It implements the five operations named by the
//! specification: [`Registry::register`], [`Registry::login`],
//! [`Registry::get`], [`Registry::add_to_quota`], and
//! [`Registry::release_quota`], plus [`Registry::persist`].
//!
//! # Design
//!
//! A registry-wide [`Mutex`] protects the structural fields — the set of
//! accounts, the username index, and the next-id counter. Each account's
//! mutable `quota_used` field is behind its own per-account `Mutex`. The
//! registry-wide lock is always acquired before any per-account lock; this
//! module never exposes the per-account lock to callers, so that ordering
//! cannot be violated from outside.
//!
//! Persistence never happens while holding the per-account lock of the
//! account whose field was just written: [`Registry::add_to_quota`] and
//! [`Registry::release_quota`] snapshot under the per-account lock, release
//! it, and only then call [`Registry::persist`], which takes the
//! registry-wide lock and (briefly, one at a time) each account's lock to
//! read its current `quota_used`.
//!
//! # Invariants
//!
//! - `0 <= quota_used <= quota_limit` for every account, always.
//! - Usernames are unique; `id` is assigned at registration and never
//!   reused, even across a reload from disk.
//! - [`Registry::persist`] always rewrites the entire file; a reader that
//!   opens it mid-write either sees the previous complete contents or the
//!   new complete contents, never a torn mix, because the file is written
//!   to a temporary path and renamed into place.

mod auth;

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use vault_core::{account::is_valid_username, Account, VaultError, VaultErrorKind};

pub use auth::{hash_password, verify_password};

struct AccountRecord {
    id: u64,
    username: String,
    password_hash: String,
    quota_used: Mutex<u64>,
}

struct State {
    by_id: HashMap<u64, Arc<AccountRecord>>,
    id_by_username: HashMap<String, u64>,
    next_id: u64,
}

/// The persisted account registry.
pub struct Registry {
    storage_root: PathBuf,
    max_users: usize,
    quota_limit: u64,
    state: Mutex<State>,
}

impl Registry {
    /// Loads the registry mirror file under `storage_root` if present, or
    /// starts empty if it is absent. `quota_limit` and `max_users` apply to
    /// every account this registry manages.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the registry file exists but cannot be read.
    pub fn load(storage_root: &Path, quota_limit: u64, max_users: usize) -> io::Result<Self> {
        let registry = Self {
            storage_root: storage_root.to_path_buf(),
            max_users,
            quota_limit,
            state: Mutex::new(State {
                by_id: HashMap::new(),
                id_by_username: HashMap::new(),
                next_id: 0,
            }),
        };
        registry.load_from_disk()?;
        Ok(registry)
    }

    fn registry_path(&self) -> PathBuf {
        self.storage_root.join("users.txt")
    }

    fn load_from_disk(&self) -> io::Result<()> {
        let path = self.registry_path();
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for line in BufReader::new(file).lines() {
            let line = line?;
            let mut parts = line.splitn(3, ' ');
            let (Some(username), Some(password_hash), Some(quota_str)) =
                (parts.next(), parts.next(), parts.next())
            else {
                break;
            };
            let Ok(quota_used) = quota_str.trim().parse::<u64>() else {
                break;
            };
            if state.by_id.len() >= self.max_users {
                break;
            }

            let id = state.next_id;
            state.next_id += 1;
            state.id_by_username.insert(username.to_string(), id);
            state.by_id.insert(
                id,
                Arc::new(AccountRecord {
                    id,
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    quota_used: Mutex::new(quota_used),
                }),
            );
        }
        info!(accounts = state.by_id.len(), "loaded registry from disk");
        Ok(())
    }

    /// Registers a new account, creating its storage directory and
    /// persisting the registry before returning.
    ///
    /// # Errors
    ///
    /// Returns [`VaultErrorKind::InvalidInput`] for a malformed username,
    /// [`VaultErrorKind::AuthFailed`] if the username is already taken,
    /// [`VaultErrorKind::Capacity`] if the registry is at `max_users`, or
    /// [`VaultErrorKind::Internal`] if the storage directory cannot be
    /// created or the registry cannot be persisted.
    pub fn register(&self, username: &str, password: &str) -> Result<u64, VaultError> {
        if !is_valid_username(username) {
            return Err(VaultError::invalid_input("Invalid username"));
        }
        let password_hash = hash_password(password)?;

        let id = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.id_by_username.contains_key(username) {
                return Err(VaultError::auth_failed("Username already exists"));
            }
            if state.by_id.len() >= self.max_users {
                return Err(VaultError::capacity("Registry is full"));
            }

            let id = state.next_id;
            state.next_id += 1;
            state.id_by_username.insert(username.to_string(), id);
            state.by_id.insert(
                id,
                Arc::new(AccountRecord {
                    id,
                    username: username.to_string(),
                    password_hash,
                    quota_used: Mutex::new(0),
                }),
            );
            id
        };

        vault_storage::ensure_user_dir(&self.storage_root, username)
            .map_err(|e| VaultError::internal(format!("could not create user directory: {e}")))?;
        self.persist()
            .map_err(|e| VaultError::internal(format!("could not persist registry: {e}")))?;
        info!(%username, id, "registered account");
        Ok(id)
    }

    /// Authenticates `username`/`password` against the registry.
    ///
    /// # Errors
    ///
    /// Returns [`VaultErrorKind::AuthFailed`] for an unknown username or a
    /// wrong password. The same error is used for both so that a failed
    /// login does not reveal whether the username exists.
    pub fn login(&self, username: &str, password: &str) -> Result<u64, VaultError> {
        let record = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state
                .id_by_username
                .get(username)
                .and_then(|id| state.by_id.get(id))
                .cloned()
        };

        match record {
            Some(record) if verify_password(password, &record.password_hash) => Ok(record.id),
            _ => Err(VaultError::auth_failed("Invalid credentials")),
        }
    }

    /// Returns a snapshot of the account with the given id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<Account> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let record = state.by_id.get(&id)?;
        let quota_used = *record.quota_used.lock().unwrap_or_else(|e| e.into_inner());
        Some(Account {
            id: record.id,
            username: record.username.clone(),
            password_hash: record.password_hash.clone(),
            quota_used,
        })
    }

    /// Reserves `bytes` against the account's quota.
    ///
    /// # Errors
    ///
    /// Returns [`VaultErrorKind::NotFound`] for an unknown account id, or
    /// [`VaultErrorKind::QuotaExceeded`] if `quota_used + bytes` would
    /// exceed the configured quota limit; the quota is left unchanged in
    /// that case.
    pub fn add_to_quota(&self, id: u64, bytes: u64) -> Result<u64, VaultError> {
        let record = self.record(id)?;
        let new_quota = {
            let mut quota_used = record.quota_used.lock().unwrap_or_else(|e| e.into_inner());
            let candidate = quota_used.saturating_add(bytes);
            if candidate > self.quota_limit {
                return Err(VaultError::quota_exceeded("Quota exceeded"));
            }
            *quota_used = candidate;
            candidate
        };

        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to persist registry after quota reservation");
        }
        Ok(new_quota)
    }

    /// Releases `bytes` from the account's quota, clamping at zero.
    ///
    /// Never fails on underflow (e.g. if the accounted size and the actual
    /// freed size disagree); returns the account's new quota usage.
    ///
    /// # Errors
    ///
    /// Returns [`VaultErrorKind::NotFound`] for an unknown account id.
    pub fn release_quota(&self, id: u64, bytes: u64) -> Result<u64, VaultError> {
        let record = self.record(id)?;
        let new_quota = {
            let mut quota_used = record.quota_used.lock().unwrap_or_else(|e| e.into_inner());
            *quota_used = quota_used.saturating_sub(bytes);
            *quota_used
        };

        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to persist registry after quota release");
        }
        Ok(new_quota)
    }

    /// The per-account quota limit this registry enforces.
    #[must_use]
    pub fn quota_limit(&self) -> u64 {
        self.quota_limit
    }

    fn record(&self, id: u64) -> Result<Arc<AccountRecord>, VaultError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| VaultError::new(VaultErrorKind::NotFound, "Invalid user"))
    }

    /// Rewrites the full registry file from the in-memory state.
    ///
    /// The registry-wide lock is held for the whole call; each account's
    /// lock is taken, read, and released one at a time while building the
    /// output, so the registry-wide lock is never held simultaneously with
    /// more than one per-account lock.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temporary file cannot be written, or
    /// the rename into place fails.
    pub fn persist(&self) -> io::Result<()> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let mut ids: Vec<&u64> = state.by_id.keys().collect();
        ids.sort_unstable();

        let mut contents = String::new();
        for id in ids {
            let record = &state.by_id[id];
            let quota_used = *record.quota_used.lock().unwrap_or_else(|e| e.into_inner());
            contents.push_str(&record.username);
            contents.push(' ');
            contents.push_str(&record.password_hash);
            contents.push(' ');
            contents.push_str(&quota_used.to_string());
            contents.push('\n');
        }

        fs::create_dir_all(&self.storage_root)?;
        let tmp_path = self.storage_root.join("users.txt.tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(contents.as_bytes())?;
            tmp.flush()?;
        }
        fs::rename(&tmp_path, self.registry_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn registry(dir: &Path) -> Registry {
        Registry::load(dir, 1024, 10).unwrap()
    }

    #[test]
    fn register_then_login_round_trips() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path());

        let id = registry.register("alice", "hunter2").unwrap();
        assert_eq!(registry.login("alice", "hunter2").unwrap(), id);
    }

    #[test]
    fn login_rejects_wrong_password() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path());
        registry.register("alice", "hunter2").unwrap();

        let err = registry.login("alice", "wrong").unwrap_err();
        assert_eq!(err.kind(), vault_core::VaultErrorKind::AuthFailed);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path());
        registry.register("alice", "hunter2").unwrap();

        let err = registry.register("alice", "different").unwrap_err();
        assert_eq!(err.kind(), vault_core::VaultErrorKind::AuthFailed);
    }

    #[test]
    fn registration_creates_the_user_directory() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path());
        registry.register("alice", "hunter2").unwrap();
        assert!(dir.path().join("alice").is_dir());
    }

    #[test]
    fn quota_reservation_refuses_to_exceed_the_limit() {
        let dir = tempdir().unwrap();
        let registry = Registry::load(dir.path(), 100, 10).unwrap();
        let id = registry.register("alice", "hunter2").unwrap();

        registry.add_to_quota(id, 60).unwrap();
        let err = registry.add_to_quota(id, 50).unwrap_err();
        assert_eq!(err.kind(), vault_core::VaultErrorKind::QuotaExceeded);
        assert_eq!(registry.get(id).unwrap().quota_used, 60);
    }

    #[test]
    fn release_quota_clamps_at_zero() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path());
        let id = registry.register("alice", "hunter2").unwrap();

        registry.add_to_quota(id, 10).unwrap();
        registry.release_quota(id, 100).unwrap();
        assert_eq!(registry.get(id).unwrap().quota_used, 0);
    }

    #[test]
    fn registration_hard_caps_at_max_users() {
        let dir = tempdir().unwrap();
        let registry = Registry::load(dir.path(), 1024, 1).unwrap();
        registry.register("alice", "pw").unwrap();

        let err = registry.register("bob", "pw").unwrap_err();
        assert_eq!(err.kind(), vault_core::VaultErrorKind::Capacity);
    }

    #[test]
    fn persistence_survives_a_reload() {
        let dir = tempdir().unwrap();
        let id = {
            let registry = registry(dir.path());
            let id = registry.register("alice", "hunter2").unwrap();
            registry.add_to_quota(id, 42).unwrap();
            id
        };

        let reloaded = registry(dir.path());
        assert_eq!(reloaded.login("alice", "hunter2").unwrap(), id);
        assert_eq!(reloaded.get(id).unwrap().quota_used, 42);
    }

    #[test]
    fn ids_are_never_reused_even_after_reload() {
        let dir = tempdir().unwrap();
        {
            let registry = registry(dir.path());
            registry.register("alice", "pw").unwrap();
        }
        let registry = registry(dir.path());
        let id = registry.register("bob", "pw").unwrap();
        assert_eq!(id, 1);
    }
}
