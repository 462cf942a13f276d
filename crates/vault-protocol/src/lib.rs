#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! The wire protocol is line-oriented ASCII with optional binary bodies.
//! This crate owns the two layers underneath the session worker: LF-framed
//! line I/O ([`line`]) and the command grammar that turns a line into a
//! typed [`command::PreAuthCommand`] or [`command::PostAuthCommand`]
//! ([`command`]). Binary body transfer itself (`read_exact`/streaming to a
//! file) is plain `std::io` and lives in the session worker, since it needs
//! no protocol-specific framing beyond the byte count already carried in a
//! `SIZE` line.
//!
//! # Invariants
//!
//! - A line is at most [`MAX_LINE_LEN`] bytes, excluding its terminator.
//! - Pre-auth and post-auth command sets are disjoint; nothing in this
//!   crate enforces *which* set is active at a given time — that is session
//!   state owned by `vault-daemon`.

/// Command grammar: parses a line into a typed command.
pub mod command;
/// LF-terminated line framing.
pub mod line;

pub use command::{PostAuthCommand, PreAuthCommand};
pub use line::{read_line, write_line, LineError};
pub use vault_core::config::MAX_LINE_LEN;
