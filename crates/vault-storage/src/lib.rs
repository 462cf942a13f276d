#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! Storage layout is a flat tree: `<storage_root>/<username>/<filename>`
//! plus a `users.txt` registry mirror directly under the root. This crate
//! owns the two things every filesystem-touching command needs before it
//! may safely `open`/`stat`/`remove` anything: a validated, single-segment
//! filename, and the resolved path it maps to.
//!
//! # Invariants
//!
//! - [`safe_file_path`] never returns a path outside
//!   `<storage_root>/<username>/`: any filename containing a path
//!   separator or a `..` segment is rejected before a path is built.
//! - [`ensure_user_dir`] is idempotent; calling it for an existing
//!   directory is not an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use vault_core::VaultError;

/// Creates the user's storage directory if it does not already exist.
///
/// # Errors
///
/// Returns the underlying I/O error if directory creation fails for a
/// reason other than the directory already existing.
pub fn ensure_user_dir(storage_root: &Path, username: &str) -> io::Result<PathBuf> {
    let dir = storage_root.join(username);
    let existed = dir.is_dir();
    fs::create_dir_all(&dir)?;
    if !existed {
        info!(%username, dir = %dir.display(), "created user storage directory");
    }
    Ok(dir)
}

/// Validates `filename` as a single, safe path segment and resolves it to
/// `<storage_root>/<username>/<filename>`.
///
/// A filename is rejected if it is empty, contains a `/` (or, on Windows,
/// `\`), or is exactly `.` or `..`. This is deliberately stricter than
/// "does not escape the directory" — the specification calls for any
/// filename containing `/` or `..` to be refused outright, not merely for
/// escaping attempts to be neutralised.
///
/// # Errors
///
/// Returns [`VaultError::invalid_input`] if the filename fails validation.
pub fn safe_file_path(
    storage_root: &Path,
    username: &str,
    filename: &str,
) -> Result<PathBuf, VaultError> {
    if !is_safe_filename(filename) {
        return Err(VaultError::invalid_input(format!(
            "Invalid filename: {filename}"
        )));
    }
    Ok(storage_root.join(username).join(filename))
}

/// Whether `filename` is a single safe path segment: non-empty, containing
/// no path separator, and not `.` or `..`.
#[must_use]
pub fn is_safe_filename(filename: &str) -> bool {
    if filename.is_empty() || filename == "." || filename == ".." {
        return false;
    }
    if filename.contains('/') || filename.contains('\\') {
        return false;
    }
    if filename.contains('\0') {
        return false;
    }
    true
}
