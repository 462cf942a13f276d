#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `vault-daemon` wires the pipeline named by the specification together:
//! a [`listener`] that accepts connections and pushes them onto a
//! [`vault_queue::BoundedQueue`], a pool of [`session`] workers that drain
//! that queue and speak the wire protocol, a second `BoundedQueue` carrying
//! [`task::Task`]s to a pool of [`file_worker`] threads, and the five-step
//! shutdown sequence in [`run`] that unwinds all of it without deadlocking
//! a session mid-rendezvous.
//!
//! # Design
//!
//! Nothing here is a global: the connection queue, the task queue, the
//! [`vault_registry::Registry`], and the resolved [`vault_core::VaultConfig`]
//! are constructed once in [`run`] and handed to every worker as `Arc`s.
//! The only process-wide state is the shutdown tripwire
//! ([`listener::install_shutdown_handler`]), which by its nature must be
//! reachable from a signal handler.

/// CLI flags and optional TOML-file configuration resolution.
pub mod cli;
/// The connection handed from the listener to a session worker.
pub mod connection;
/// The file worker loop and its UPLOAD/DOWNLOAD/DELETE/LIST handlers.
pub mod file_worker;
/// The accept loop, socket binding, and shutdown signal handling.
pub mod listener;
/// Spawning and joining the session and file worker thread pools.
pub mod pool;
/// The session worker loop: authentication and the command loop.
pub mod session;
/// The task rendezvous shared by one session worker and one file worker.
pub mod task;

use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{error, info};
use vault_core::VaultConfig;
use vault_registry::Registry;

use crate::connection::Connection;
use crate::task::Task;

/// Exit code used when the daemon could not even parse its configuration
/// or prepare its resources, distinct from a runtime failure.
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Runs the daemon to completion: resolves configuration, prepares
/// storage and the registry, spawns both worker pools, serves connections
/// until a shutdown signal arrives, then unwinds everything in the order
/// the specification requires.
///
/// # Errors
///
/// Returns an [`ExitCode`] rather than propagating errors, matching the
/// CLI-entry-point convention used elsewhere in the workspace: a thin
/// `main` maps this value straight onto the process's exit status.
pub fn run(args: &cli::Args) -> ExitCode {
    let config = match cli::resolve(args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.storage_root) {
        error!(error = %e, root = %config.storage_root.display(), "could not create storage root");
        return ExitCode::FAILURE;
    }

    let registry = match Registry::load(&config.storage_root, config.user_quota, config.max_users) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!(error = %e, "could not load registry");
            return ExitCode::FAILURE;
        }
    };

    let listener = match listener::bind(&config) {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, port = config.port, "could not bind listening socket");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = match listener::install_shutdown_handler() {
        Ok(flag) => flag,
        Err(e) => {
            error!(error = %e, "could not install signal handler");
            return ExitCode::FAILURE;
        }
    };

    let config = Arc::new(config);
    let connection_queue = Arc::new(vault_queue::BoundedQueue::<Connection>::new(
        config.connection_queue_capacity,
    ));
    let task_queue = Arc::new(vault_queue::BoundedQueue::<Arc<Task>>::new(
        config.task_queue_capacity,
    ));

    let session_handles = pool::spawn_session_workers(
        config.session_pool_size,
        Arc::clone(&connection_queue),
        Arc::clone(&registry),
        Arc::clone(&config),
        Arc::clone(&task_queue),
    );
    let file_handles = pool::spawn_file_workers(
        config.file_pool_size,
        Arc::clone(&task_queue),
        Arc::clone(&registry),
        Arc::clone(&config),
    );

    info!(
        port = config.port,
        session_workers = config.session_pool_size,
        file_workers = config.file_pool_size,
        "vaultd ready"
    );
    listener::run_accept_loop(&listener, &connection_queue, &shutdown);
    shutdown.store(true, Ordering::SeqCst);

    // Shutdown order matters: the connection queue drains first so every
    // in-flight session gets a chance to submit and await its last task
    // before the task queue (and the file workers reading it) disappear
    // out from under it.
    connection_queue.shutdown();
    pool::join_all(session_handles);

    task_queue.shutdown();
    pool::join_all(file_handles);

    if let Err(e) = registry.persist() {
        error!(error = %e, "failed to persist registry during shutdown");
        return ExitCode::FAILURE;
    }

    info!("vaultd shut down cleanly");
    ExitCode::SUCCESS
}
