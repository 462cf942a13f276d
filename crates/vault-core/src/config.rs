//! Daemon-wide configuration.
//!
//! Every field here corresponds to one row of the "recognized options"
//! table in the specification: `PORT`, `SESSION_POOL_SIZE`,
//! `FILE_POOL_SIZE`, `CONNECTION_QUEUE_CAPACITY`, `TASK_QUEUE_CAPACITY`,
//! `STORAGE_ROOT`, `USER_QUOTA`, `MAX_USERS`. The daemon binary (in
//! `vault-daemon`) is responsible for turning CLI flags and an optional
//! TOML file into a `VaultConfig`; this crate only defines the shape and
//! its defaults so every consumer agrees on them.

use std::path::PathBuf;

/// TCP port the listener binds by default.
pub const DEFAULT_PORT: u16 = 8080;
/// Default number of session workers.
pub const DEFAULT_SESSION_POOL_SIZE: usize = 5;
/// Default number of file workers.
pub const DEFAULT_FILE_POOL_SIZE: usize = 3;
/// Default bounded capacity of the connection queue.
pub const DEFAULT_CONNECTION_QUEUE_CAPACITY: usize = 10;
/// Default bounded capacity of the task queue.
pub const DEFAULT_TASK_QUEUE_CAPACITY: usize = 10;
/// Default per-user byte quota: 100 MiB.
pub const DEFAULT_USER_QUOTA: u64 = 100 * 1024 * 1024;
/// Default hard cap on registered accounts.
pub const DEFAULT_MAX_USERS: usize = 1000;
/// Default TCP listen backlog.
pub const DEFAULT_LISTEN_BACKLOG: u32 = 16;
/// Maximum line length (excluding terminator) accepted by the protocol codec.
pub const MAX_LINE_LEN: usize = 1024;
/// Maximum accepted `UPLOAD` body size in bytes (512 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;

/// Fully resolved daemon configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultConfig {
    /// TCP port to bind.
    pub port: u16,
    /// Number of session workers.
    pub session_pool_size: usize,
    /// Number of file workers.
    pub file_pool_size: usize,
    /// Bounded capacity of the connection queue.
    pub connection_queue_capacity: usize,
    /// Bounded capacity of the task queue.
    pub task_queue_capacity: usize,
    /// Directory holding the per-user subdirectories and the registry file.
    pub storage_root: PathBuf,
    /// Per-account byte quota.
    pub user_quota: u64,
    /// Hard cap on registered accounts.
    pub max_users: usize,
    /// TCP listen backlog.
    pub listen_backlog: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_pool_size: DEFAULT_SESSION_POOL_SIZE,
            file_pool_size: DEFAULT_FILE_POOL_SIZE,
            connection_queue_capacity: DEFAULT_CONNECTION_QUEUE_CAPACITY,
            task_queue_capacity: DEFAULT_TASK_QUEUE_CAPACITY,
            storage_root: PathBuf::from("storage"),
            user_quota: DEFAULT_USER_QUOTA,
            max_users: DEFAULT_MAX_USERS,
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
        }
    }
}

impl VaultConfig {
    /// Path to the registry mirror file under the storage root.
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.storage_root.join("users.txt")
    }

    /// Path to a given user's per-account storage directory.
    #[must_use]
    pub fn user_dir(&self, username: &str) -> PathBuf {
        self.storage_root.join(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_specification_table() {
        let config = VaultConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.session_pool_size, 5);
        assert_eq!(config.file_pool_size, 3);
        assert_eq!(config.user_quota, 100 * 1024 * 1024);
        assert_eq!(config.max_users, 1000);
    }

    #[test]
    fn registry_and_user_dir_are_rooted_at_storage_root() {
        let config = VaultConfig {
            storage_root: PathBuf::from("/srv/vault"),
            ..VaultConfig::default()
        };
        assert_eq!(config.registry_path(), PathBuf::from("/srv/vault/users.txt"));
        assert_eq!(config.user_dir("alice"), PathBuf::from("/srv/vault/alice"));
    }
}
