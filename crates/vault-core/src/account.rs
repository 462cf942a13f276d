//! The persisted account record.

use serde::{Deserialize, Serialize};

/// A registered user: identity, password hash, and quota usage.
///
/// `id` is assigned at registration and is never reused, even across a
/// registry restart — the registry tracks a monotonic high-water mark
/// separately from the live account count so that deleting support (were it
/// ever added) could not resurrect a stale id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Stable, non-negative, never-reused identifier.
    pub id: u64,
    /// Unique username, at most 63 bytes, containing no whitespace.
    pub username: String,
    /// PHC-format Argon2id hash of the account's password.
    pub password_hash: String,
    /// Bytes currently consumed by the account's files.
    pub quota_used: u64,
}

/// Maximum length, in bytes, of a username.
pub const MAX_USERNAME_LEN: usize = 63;

/// Checks whether `username` is an acceptable identifier: non-empty, at
/// most [`MAX_USERNAME_LEN`] bytes, and free of whitespace.
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && !username.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace_usernames() {
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("tab\tchar"));
    }

    #[test]
    fn rejects_usernames_longer_than_limit() {
        let long = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(!is_valid_username(&long));
        let ok = "a".repeat(MAX_USERNAME_LEN);
        assert!(is_valid_username(&ok));
    }

    #[test]
    fn accepts_ordinary_usernames() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("bob_2"));
    }
}
