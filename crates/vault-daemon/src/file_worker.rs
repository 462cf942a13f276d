//! The file worker loop: pops a [`Task`] off the shared task queue, executes
//! the filesystem operation it names, and signals the waiting session
//! worker with a [`TaskResult`].
//!
//! `UPLOAD` is special: a file worker only pre-checks the target (does it
//! already exist?) and replies `READY:`. The quota reservation and the
//! actual byte transfer happen on the session worker's own thread once the
//! client has sent its `SIZE` line — that traffic never goes through the
//! task queue, since it would otherwise tie up a file worker for the
//! duration of a potentially large transfer.

use std::fs;

use tracing::{info, warn};
use vault_core::VaultConfig;
use vault_registry::Registry;

use crate::task::{CommandKind, Task, TaskResult};

/// Runs one file worker's pop-execute loop until the task queue shuts down
/// and drains.
pub fn run(
    queue: &vault_queue::BoundedQueue<std::sync::Arc<Task>>,
    registry: &Registry,
    config: &VaultConfig,
) {
    loop {
        let task = match queue.pop() {
            Ok(task) => task,
            Err(_shutting_down) => {
                info!("file worker exiting: task queue drained and shut down");
                return;
            }
        };
        let result = execute(&task, registry, config);
        task.complete(result);
    }
}

/// Executes a single task's command against the filesystem and registry.
#[must_use]
pub fn execute(task: &Task, registry: &Registry, config: &VaultConfig) -> TaskResult {
    let request = &task.request;
    match request.kind {
        CommandKind::Upload => execute_upload_precheck(task, config),
        CommandKind::Download => execute_download(task, config),
        CommandKind::Delete => execute_delete(task, registry, config),
        CommandKind::List => execute_list(task, registry, config),
    }
}

fn target_path(task: &Task, config: &VaultConfig) -> Result<std::path::PathBuf, TaskResult> {
    let filename = task
        .request
        .filename
        .as_deref()
        .expect("file commands always carry a filename");
    vault_storage::safe_file_path(&config.storage_root, &task.request.username, filename)
        .map_err(|e| TaskResult::err(e.wire_line()))
}

fn execute_upload_precheck(task: &Task, config: &VaultConfig) -> TaskResult {
    let path = match target_path(task, config) {
        Ok(path) => path,
        Err(result) => return result,
    };
    if path.exists() {
        return TaskResult::err("ERROR: File already exists. Delete it first.");
    }
    TaskResult::ok("READY: Send file size as: SIZE <bytes>")
}

fn execute_download(task: &Task, config: &VaultConfig) -> TaskResult {
    let path = match target_path(task, config) {
        Ok(path) => path,
        Err(result) => return result,
    };
    match fs::metadata(&path) {
        Ok(meta) if meta.is_file() => {
            TaskResult::ok_with_size(format!("SIZE: {}", meta.len()), meta.len())
        }
        _ => TaskResult::err("ERROR: File not found"),
    }
}

fn execute_delete(task: &Task, registry: &Registry, config: &VaultConfig) -> TaskResult {
    let path = match target_path(task, config) {
        Ok(path) => path,
        Err(result) => return result,
    };
    let size = match fs::metadata(&path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return TaskResult::err("ERROR: File not found"),
    };
    if let Err(e) = fs::remove_file(&path) {
        warn!(error = %e, path = %path.display(), "failed to remove file");
        return TaskResult::err("ERROR: Could not delete file");
    }

    let quota_used = match registry.release_quota(task.request.account_id, size) {
        Ok(used) => used,
        Err(e) => {
            warn!(error = %e, "failed to release quota after delete");
            return TaskResult::err("ERROR: Could not update quota");
        }
    };
    let limit_mb = registry.quota_limit() / (1024 * 1024);
    TaskResult::ok(format!(
        "OK: File deleted ({size} bytes freed). Quota: {} / {limit_mb} MB",
        vault_core::format_megabytes(quota_used)
    ))
}

fn execute_list(task: &Task, registry: &Registry, config: &VaultConfig) -> TaskResult {
    let dir = config.user_dir(&task.request.username);
    let mut files = Vec::new();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, dir = %dir.display(), "failed to read user directory");
            return TaskResult::err("ERROR: Could not list files");
        }
    };
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        files.push((name.into_owned(), meta.len()));
    }
    files.sort();

    let account = registry.get(task.request.account_id);
    let quota_used = account.as_ref().map_or(0, |a| a.quota_used);
    let quota_limit = registry.quota_limit();

    let mut message = format!("{} files, {quota_used}/{quota_limit} bytes", files.len());
    for (name, size) in files {
        message.push('\n');
        message.push_str(&name);
        message.push('\t');
        message.push_str(&size.to_string());
    }
    TaskResult::ok(message)
}
