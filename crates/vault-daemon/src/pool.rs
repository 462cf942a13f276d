//! Spawns and joins the two thread pools: session workers pop accepted
//! connections, file workers pop tasks.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::info;
use vault_core::VaultConfig;
use vault_registry::Registry;

use crate::connection::Connection;
use crate::task::Task;
use crate::{file_worker, session};

/// Spawns `count` session worker threads, each looping
/// `connection_queue.pop()` → [`session::serve`] until the connection
/// queue shuts down and drains.
pub fn spawn_session_workers(
    count: usize,
    connection_queue: Arc<vault_queue::BoundedQueue<Connection>>,
    registry: Arc<Registry>,
    config: Arc<VaultConfig>,
    task_queue: Arc<vault_queue::BoundedQueue<Arc<Task>>>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|index| {
            let connection_queue = Arc::clone(&connection_queue);
            let registry = Arc::clone(&registry);
            let config = Arc::clone(&config);
            let task_queue = Arc::clone(&task_queue);
            thread::Builder::new()
                .name(format!("session-worker-{index}"))
                .spawn(move || {
                    loop {
                        match connection_queue.pop() {
                            Ok(connection) => {
                                session::serve(connection, &registry, &config, &task_queue);
                            }
                            Err(_shutting_down) => {
                                info!(index, "session worker exiting: connection queue drained");
                                return;
                            }
                        }
                    }
                })
                .expect("spawning a session worker thread")
        })
        .collect()
}

/// Spawns `count` file worker threads, each running [`file_worker::run`]
/// until the task queue shuts down and drains.
pub fn spawn_file_workers(
    count: usize,
    task_queue: Arc<vault_queue::BoundedQueue<Arc<Task>>>,
    registry: Arc<Registry>,
    config: Arc<VaultConfig>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|index| {
            let task_queue = Arc::clone(&task_queue);
            let registry = Arc::clone(&registry);
            let config = Arc::clone(&config);
            thread::Builder::new()
                .name(format!("file-worker-{index}"))
                .spawn(move || {
                    file_worker::run(&task_queue, &registry, &config);
                })
                .expect("spawning a file worker thread")
        })
        .collect()
}

/// Joins every handle in `handles`, logging (but not propagating) any
/// thread that panicked.
pub fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let name = handle.thread().name().unwrap_or("worker").to_string();
        if handle.join().is_err() {
            tracing::error!(thread = %name, "worker thread panicked");
        }
    }
}
