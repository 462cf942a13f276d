#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `vault-core` holds the types shared by every other crate in the
//! workspace: the [`Account`] record, the [`VaultConfig`] the daemon binary
//! assembles from CLI flags and an optional config file, and the
//! [`VaultError`] kinds that every layer of the pipeline maps its failures
//! onto before a session worker turns them into a wire-protocol reply.
//!
//! # Design
//!
//! Nothing here touches sockets or the filesystem. Lower layers
//! (`vault-registry`, `vault-storage`, `vault-protocol`, `vault-daemon`)
//! depend on this crate; it depends on nothing workspace-local.
//!
//! # Invariants
//!
//! - [`Account::quota_used`] never exceeds the quota limit configured for
//!   the registry that owns it.
//! - [`format_megabytes`] always renders with two decimal places, matching
//!   the wording clients parse out of `SUCCESS:`/`OK:` reply lines.

/// Account record and identity rules.
pub mod account;
/// Daemon-wide configuration, defaults, and the recognized option table.
pub mod config;
/// Shared error kinds and their client-facing propagation policy.
pub mod error;

pub use account::Account;
pub use config::VaultConfig;
pub use error::{VaultError, VaultErrorKind};

/// Formats a byte count as megabytes with two decimal places (e.g. `"1.50"`).
#[must_use]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}

/// Formats a byte count as the most appropriate of B / KB / MB, matching the
/// human-readable sizing used by the original prototype's directory listing.
#[must_use]
pub fn format_human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_megabytes_rounds_to_two_decimals() {
        assert_eq!(format_megabytes(0), "0.00");
        assert_eq!(format_megabytes(1024 * 1024), "1.00");
        assert_eq!(format_megabytes(1_572_864), "1.50");
    }

    #[test]
    fn format_human_size_picks_the_largest_sensible_unit() {
        assert_eq!(format_human_size(5), "5 B");
        assert_eq!(format_human_size(2048), "2.00 KB");
        assert_eq!(format_human_size(5 * 1024 * 1024), "5.00 MB");
    }
}
