//! Shared error kinds and their client-facing propagation policy.
//!
//! Every layer of the pipeline (registry, storage, protocol, daemon)
//! ultimately reports failures through [`VaultError`] so that the session
//! worker can apply one consistent policy when turning an error into a wire
//! reply: some errors become an `ERROR:` line and the session continues,
//! some close the connection, and `Internal` does both (best-effort
//! message, then close).

use std::fmt;

/// The abstract error kinds named by the specification's error-handling
/// design: malformed input, missing authentication, failed authentication,
/// quota exhaustion, missing files, name collisions, queue saturation,
/// transport failure, and unclassified internal failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultErrorKind {
    /// Malformed command or unsafe filename.
    InvalidInput,
    /// A post-auth command arrived before `LOGIN` succeeded.
    AuthRequired,
    /// Bad credentials, or a username that is already taken.
    AuthFailed,
    /// The requested operation would exceed the account's quota.
    QuotaExceeded,
    /// No such file.
    NotFound,
    /// An `UPLOAD` target that already exists.
    AlreadyExists,
    /// A bounded queue was full while the server was shutting down.
    Capacity,
    /// The connection was lost or a socket write failed.
    Transport,
    /// An unclassified internal failure (allocation, filesystem, …).
    Internal,
    /// The server is shutting down.
    ShuttingDown,
}

impl VaultErrorKind {
    /// Whether this kind is reported to the client as an `ERROR:` line
    /// while the session continues (as opposed to closing the connection).
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::InvalidInput
                | Self::AuthRequired
                | Self::AuthFailed
                | Self::QuotaExceeded
                | Self::NotFound
                | Self::AlreadyExists
                | Self::Capacity
        )
    }
}

/// A workspace-wide error carrying both an abstract [`VaultErrorKind`] and a
/// human-readable message suitable for direct use in an `ERROR:` reply line.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("{message}")]
pub struct VaultError {
    kind: VaultErrorKind,
    message: String,
}

impl VaultError {
    /// Builds a new error of the given kind with the given client-facing
    /// message (without the `ERROR: ` prefix or trailing newline).
    pub fn new(kind: VaultErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The abstract kind of this error.
    #[must_use]
    pub const fn kind(&self) -> VaultErrorKind {
        self.kind
    }

    /// The message text, without any wire-protocol framing.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convenience constructor for [`VaultErrorKind::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::InvalidInput, message)
    }

    /// Convenience constructor for [`VaultErrorKind::AuthFailed`].
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::AuthFailed, message)
    }

    /// Convenience constructor for [`VaultErrorKind::QuotaExceeded`].
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::QuotaExceeded, message)
    }

    /// Convenience constructor for [`VaultErrorKind::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::NotFound, message)
    }

    /// Convenience constructor for [`VaultErrorKind::AlreadyExists`].
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::AlreadyExists, message)
    }

    /// Convenience constructor for [`VaultErrorKind::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Internal, message)
    }

    /// Convenience constructor for [`VaultErrorKind::Capacity`].
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Capacity, message)
    }

    /// Convenience constructor for [`VaultErrorKind::ShuttingDown`].
    pub fn shutting_down() -> Self {
        Self::new(VaultErrorKind::ShuttingDown, "server is shutting down")
    }

    /// Renders the canonical `ERROR: <message>` wire line for this error.
    ///
    /// Callers that need a different leading keyword (none of the error
    /// kinds currently do) should format the message directly instead.
    #[must_use]
    pub fn wire_line(&self) -> String {
        format!("ERROR: {}", self.message)
    }
}

impl fmt::Display for VaultErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidInput => "InvalidInput",
            Self::AuthRequired => "AuthRequired",
            Self::AuthFailed => "AuthFailed",
            Self::QuotaExceeded => "QuotaExceeded",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::Capacity => "Capacity",
            Self::Transport => "Transport",
            Self::Internal => "Internal",
            Self::ShuttingDown => "ShuttingDown",
        };
        f.write_str(name)
    }
}
