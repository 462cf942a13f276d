//! Command-line and optional TOML-file configuration for the `vaultd`
//! binary.
//!
//! The distilled specification treats configuration as a table of
//! recognized options (`PORT`, `SESSION_POOL_SIZE`, …); this module is the
//! part of the ambient stack that turns CLI flags and an optional overlay
//! file into the [`VaultConfig`] every other crate consumes. CLI flags take
//! priority over the config file, which takes priority over
//! [`VaultConfig::default`].

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use vault_core::VaultConfig;

/// `vaultd` — the multi-user network file store daemon.
#[derive(Parser, Debug)]
#[command(name = "vaultd", about = "Multi-user network file store daemon")]
pub struct Args {
    /// TCP port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of session worker threads.
    #[arg(long)]
    pub session_workers: Option<usize>,

    /// Number of file worker threads.
    #[arg(long)]
    pub file_workers: Option<usize>,

    /// Maximum number of connections held in the connection queue.
    #[arg(long)]
    pub connection_queue_capacity: Option<usize>,

    /// Maximum number of tasks held in the task queue.
    #[arg(long)]
    pub task_queue_capacity: Option<usize>,

    /// Directory holding the per-user subdirectories and the registry file.
    #[arg(long)]
    pub storage_root: Option<PathBuf>,

    /// Per-account byte quota.
    #[arg(long)]
    pub user_quota: Option<u64>,

    /// Hard cap on the number of registered accounts.
    #[arg(long)]
    pub max_users: Option<usize>,

    /// Optional TOML file overlaying these defaults before CLI flags apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

/// The subset of [`VaultConfig`] fields a TOML overlay file may set. Every
/// field is optional; anything absent falls through to the built-in
/// default or an earlier layer.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    session_pool_size: Option<usize>,
    file_pool_size: Option<usize>,
    connection_queue_capacity: Option<usize>,
    task_queue_capacity: Option<usize>,
    storage_root: Option<PathBuf>,
    user_quota: Option<u64>,
    max_users: Option<usize>,
    listen_backlog: Option<u32>,
}

/// Failure to load or parse a TOML overlay file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read config file {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file's contents were not valid TOML, or used an unknown key.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Resolves [`Args`] into a fully populated [`VaultConfig`]: defaults, then
/// an optional TOML overlay, then CLI flags, each layer overriding the
/// last only where it sets a field explicitly.
///
/// # Errors
///
/// Returns [`ConfigError`] if `--config` names a file that cannot be read
/// or does not parse as valid TOML.
pub fn resolve(args: &Args) -> Result<VaultConfig, ConfigError> {
    let mut config = VaultConfig::default();

    if let Some(path) = &args.config {
        apply_file(&mut config, path)?;
    }

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(n) = args.session_workers {
        config.session_pool_size = n;
    }
    if let Some(n) = args.file_workers {
        config.file_pool_size = n;
    }
    if let Some(n) = args.connection_queue_capacity {
        config.connection_queue_capacity = n;
    }
    if let Some(n) = args.task_queue_capacity {
        config.task_queue_capacity = n;
    }
    if let Some(root) = &args.storage_root {
        config.storage_root = root.clone();
    }
    if let Some(quota) = args.user_quota {
        config.user_quota = quota;
    }
    if let Some(n) = args.max_users {
        config.max_users = n;
    }

    Ok(config)
}

fn apply_file(config: &mut VaultConfig, path: &Path) -> Result<(), ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: FileConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(v) = file.port {
        config.port = v;
    }
    if let Some(v) = file.session_pool_size {
        config.session_pool_size = v;
    }
    if let Some(v) = file.file_pool_size {
        config.file_pool_size = v;
    }
    if let Some(v) = file.connection_queue_capacity {
        config.connection_queue_capacity = v;
    }
    if let Some(v) = file.task_queue_capacity {
        config.task_queue_capacity = v;
    }
    if let Some(v) = file.storage_root {
        config.storage_root = v;
    }
    if let Some(v) = file.user_quota {
        config.user_quota = v;
    }
    if let Some(v) = file.max_users {
        config.max_users = v;
    }
    if let Some(v) = file.listen_backlog {
        config.listen_backlog = v;
    }
    Ok(())
}

/// Maps `-v`/`-q` counts onto a `tracing` level filter, defaulting to
/// `INFO` when neither is given.
#[must_use]
pub fn log_level(args: &Args) -> tracing::Level {
    let net = i16::from(args.verbose) - i16::from(args.quiet);
    match net {
        ..=-2 => tracing::Level::ERROR,
        -1 => tracing::Level::WARN,
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        2.. => tracing::Level::TRACE,
    }
}
