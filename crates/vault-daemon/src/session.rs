//! The session worker loop: authenticates a connection, then serves its
//! command loop until `QUIT`, a protocol error, or the peer disconnecting.
//!
//! Every filesystem operation is delegated to a file worker via a
//! submitted [`Task`]; this module owns only the wire protocol and the
//! upload/download byte-streaming that never touches the task queue. Quota
//! reservation for an upload is the one piece of accounting that happens
//! directly against the [`Registry`] here rather than through a task: it is
//! in-memory bookkeeping, not a filesystem operation, so routing it through
//! a file worker would only add latency without adding safety.

use std::io::{BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use tracing::{info, info_span, warn};
use vault_core::{VaultConfig, VaultError};
use vault_protocol::{
    command::{parse_post_auth, parse_pre_auth, parse_upload_size, PostAuthCommand, PreAuthCommand},
    read_line, write_line, LineError,
};
use vault_registry::Registry;

use crate::connection::Connection;
use crate::task::{CommandKind, Task, TaskRequest, TaskResult};

const WELCOME: &str = "WELCOME: vault daemon ready. REGISTER <user> <pass> or LOGIN <user> <pass>.";

/// Serves one accepted connection end to end.
pub fn serve(
    connection: Connection,
    registry: &Registry,
    config: &VaultConfig,
    task_queue: &vault_queue::BoundedQueue<Arc<Task>>,
) {
    let peer = connection.peer;
    let span = info_span!("session", %peer);
    let _guard = span.enter();

    let (mut reader, mut writer) = match connection.split() {
        Ok(halves) => halves,
        Err(e) => {
            warn!(error = %e, "failed to prepare connection");
            return;
        }
    };

    if write_line(&mut writer, WELCOME).is_err() {
        return;
    }

    let Some((account_id, username)) = authenticate(&mut reader, &mut writer, registry) else {
        return;
    };
    info!(%username, "session authenticated");

    command_loop(
        &mut reader,
        &mut writer,
        account_id,
        &username,
        registry,
        config,
        task_queue,
    );
    info!(%username, "session closed");
}

/// Runs the pre-auth loop: accepts any number of `REGISTER` attempts and
/// failed `LOGIN` attempts, returning once a `LOGIN` succeeds or the
/// connection ends.
fn authenticate(
    reader: &mut BufReader<TcpStream>,
    writer: &mut TcpStream,
    registry: &Registry,
) -> Option<(u64, String)> {
    loop {
        let line = match read_line(reader) {
            Ok(line) => line,
            Err(LineError::Eof) => return None,
            Err(LineError::Oversize) => {
                let _ = write_line(writer, &VaultError::invalid_input("Line too long").wire_line());
                continue;
            }
            Err(LineError::Io(_)) => return None,
        };

        let command = match parse_pre_auth(&line) {
            Ok(command) => command,
            Err(e) => {
                let _ = write_line(writer, &e.wire_line());
                continue;
            }
        };

        match command {
            PreAuthCommand::Register { username, password } => {
                match registry.register(&username, &password) {
                    Ok(_id) => {
                        let _ = write_line(writer, "OK: Registered. You may now LOGIN.");
                    }
                    Err(e) => {
                        let _ = write_line(writer, &e.wire_line());
                    }
                }
            }
            PreAuthCommand::Login { username, password } => {
                match registry.login(&username, &password) {
                    Ok(id) => {
                        let _ = write_line(writer, "OK: Logged in.");
                        return Some((id, username));
                    }
                    Err(e) => {
                        let _ = write_line(writer, &e.wire_line());
                    }
                }
            }
        }
    }
}

/// Runs the authenticated command loop until `QUIT` or disconnect.
#[allow(clippy::too_many_arguments)]
fn command_loop(
    reader: &mut BufReader<TcpStream>,
    writer: &mut TcpStream,
    account_id: u64,
    username: &str,
    registry: &Registry,
    config: &VaultConfig,
    task_queue: &vault_queue::BoundedQueue<Arc<Task>>,
) {
    loop {
        let line = match read_line(reader) {
            Ok(line) => line,
            Err(LineError::Eof | LineError::Io(_)) => return,
            Err(LineError::Oversize) => {
                let _ = write_line(writer, &VaultError::invalid_input("Line too long").wire_line());
                continue;
            }
        };

        let command = match parse_post_auth(&line) {
            Ok(command) => command,
            Err(e) => {
                let _ = write_line(writer, &e.wire_line());
                continue;
            }
        };

        match command {
            PostAuthCommand::Quit => {
                let _ = write_line(writer, "Goodbye: see you next time.");
                return;
            }
            PostAuthCommand::Upload { filename } => {
                if handle_upload(
                    reader, writer, account_id, username, &filename, registry, config, task_queue,
                )
                .is_err()
                {
                    return;
                }
            }
            PostAuthCommand::Download { filename } => {
                if handle_download(writer, account_id, username, &filename, config, task_queue)
                    .is_err()
                {
                    return;
                }
            }
            PostAuthCommand::Delete { filename } => {
                handle_delete(writer, account_id, username, &filename, task_queue);
            }
            PostAuthCommand::List => {
                handle_list(writer, account_id, username, task_queue);
            }
        }
    }
}

fn submit(
    task_queue: &vault_queue::BoundedQueue<Arc<Task>>,
    kind: CommandKind,
    account_id: u64,
    username: &str,
    filename: Option<String>,
) -> TaskResult {
    let task = Task::new(TaskRequest {
        kind,
        account_id,
        username: username.to_string(),
        filename,
    });
    if task_queue.push(Arc::clone(&task)).is_err() {
        return TaskResult::err(VaultError::shutting_down().wire_line());
    }
    task.wait()
}

#[allow(clippy::too_many_arguments)]
fn handle_upload(
    reader: &mut BufReader<TcpStream>,
    writer: &mut TcpStream,
    account_id: u64,
    username: &str,
    filename: &str,
    registry: &Registry,
    config: &VaultConfig,
    task_queue: &vault_queue::BoundedQueue<Arc<Task>>,
) -> std::io::Result<()> {
    let precheck = submit(
        task_queue,
        CommandKind::Upload,
        account_id,
        username,
        Some(filename.to_string()),
    );
    write_line(writer, &precheck.message)?;
    if !precheck.ok {
        return Ok(());
    }

    let size_line = match read_line(reader) {
        Ok(line) => line,
        Err(_) => return Err(std::io::Error::other("connection lost awaiting SIZE")),
    };
    let size = match parse_upload_size(&size_line, vault_core::config::MAX_UPLOAD_BYTES) {
        Ok(size) => size,
        Err(e) => return write_line(writer, &e.wire_line()),
    };

    let path = match vault_storage::safe_file_path(&config.storage_root, username, filename) {
        Ok(path) => path,
        Err(e) => return write_line(writer, &e.wire_line()),
    };

    let quota_used = match registry.add_to_quota(account_id, size) {
        Ok(used) => used,
        Err(e) => return write_line(writer, &e.wire_line()),
    };

    write_line(writer, "OK: Send file data")?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".vault-upload-tmp");
    let tmp_path = path.with_file_name(tmp_name);
    match stream_upload_body(reader, &tmp_path, size).and_then(|()| std::fs::rename(&tmp_path, &path)) {
        Ok(()) => {
            let limit_mb = registry.quota_limit() / (1024 * 1024);
            write_line(
                writer,
                &format!(
                    "SUCCESS: File uploaded ({size} bytes). Quota: {} / {limit_mb} MB",
                    vault_core::format_megabytes(quota_used)
                ),
            )
        }
        Err(e) => {
            warn!(error = %e, "upload body incomplete");
            let _ = std::fs::remove_file(&tmp_path);
            if let Err(e) = registry.release_quota(account_id, size) {
                warn!(error = %e, "failed to release quota after incomplete upload");
            }
            write_line(writer, "ERROR: Incomplete upload")
        }
    }
}

fn handle_download(
    writer: &mut TcpStream,
    account_id: u64,
    username: &str,
    filename: &str,
    config: &VaultConfig,
    task_queue: &vault_queue::BoundedQueue<Arc<Task>>,
) -> std::io::Result<()> {
    let result = submit(
        task_queue,
        CommandKind::Download,
        account_id,
        username,
        Some(filename.to_string()),
    );
    write_line(writer, &result.message)?;
    if !result.ok {
        return Ok(());
    }
    let Some(size) = result.size else {
        return Ok(());
    };

    let path = match vault_storage::safe_file_path(&config.storage_root, username, filename) {
        Ok(path) => path,
        Err(e) => return write_line(writer, &e.wire_line()),
    };
    let mut file = std::fs::File::open(&path)?;
    let mut buf = [0u8; 8192];
    let mut remaining = size;
    while remaining > 0 {
        let to_read = remaining.min(buf.len() as u64) as usize;
        let n = file.read(&mut buf[..to_read])?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

fn handle_delete(
    writer: &mut TcpStream,
    account_id: u64,
    username: &str,
    filename: &str,
    task_queue: &vault_queue::BoundedQueue<Arc<Task>>,
) {
    let result = submit(
        task_queue,
        CommandKind::Delete,
        account_id,
        username,
        Some(filename.to_string()),
    );
    let _ = write_line(writer, &result.message);
}

fn handle_list(
    writer: &mut TcpStream,
    account_id: u64,
    username: &str,
    task_queue: &vault_queue::BoundedQueue<Arc<Task>>,
) {
    let result = submit(task_queue, CommandKind::List, account_id, username, None);
    let _ = write_line(writer, &result.message);
}

fn stream_upload_body(
    reader: &mut BufReader<TcpStream>,
    path: &std::path::Path,
    size: u64,
) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    let mut remaining = size;
    let mut buf = [0u8; 8192];
    while remaining > 0 {
        let to_read = remaining.min(buf.len() as u64) as usize;
        reader.read_exact(&mut buf[..to_read])?;
        file.write_all(&buf[..to_read])?;
        remaining -= to_read as u64;
    }
    file.flush()
}
