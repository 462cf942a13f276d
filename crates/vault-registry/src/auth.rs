//! Password hashing.
//!
//! The original prototype (and the distilled specification) stored
//! passwords verbatim. This workspace resolves that open question with
//! Argon2id: [`hash_password`] produces a self-describing PHC string
//! (algorithm, version, parameters, salt, and hash all bundled together),
//! and [`verify_password`] lets the `argon2` crate perform the constant-time
//! comparison rather than hand-rolling one.

use argon2::Argon2;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::rngs::OsRng;

use vault_core::VaultError;

/// Hashes `password` into a PHC-format string suitable for storage in the
/// registry file.
///
/// # Errors
///
/// Returns [`VaultError::internal`] if the underlying hashing primitive
/// fails, which only happens on allocation failure or an invalid parameter
/// set (neither is expected with this crate's fixed [`Argon2`] parameters).
pub fn hash_password(password: &str) -> Result<String, VaultError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| VaultError::internal(format!("password hashing failed: {e}")))
}

/// Verifies `password` against a previously stored PHC hash string.
///
/// Returns `false` (rather than an error) both when the password is wrong
/// and when `stored_hash` is malformed, so callers cannot distinguish a
/// corrupt registry entry from a wrong password.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
