//! Command grammar: pre-auth and post-auth verbs are disjoint, and every
//! parse failure is a [`VaultError::invalid_input`] rather than a panic.

use vault_core::VaultError;

/// A command accepted before `LOGIN` succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreAuthCommand {
    /// `REGISTER <user> <pass>`.
    Register { username: String, password: String },
    /// `LOGIN <user> <pass>`.
    Login { username: String, password: String },
}

/// A command accepted once a session has authenticated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostAuthCommand {
    /// `UPLOAD <name>`.
    Upload { filename: String },
    /// `DOWNLOAD <name>`.
    Download { filename: String },
    /// `DELETE <name>`.
    Delete { filename: String },
    /// `LIST`.
    List,
    /// `QUIT`.
    Quit,
}

/// Parses a pre-auth line into a [`PreAuthCommand`].
///
/// # Errors
///
/// Returns [`VaultError::invalid_input`] for an unknown verb, a missing
/// argument, or extra trailing tokens.
pub fn parse_pre_auth(line: &str) -> Result<PreAuthCommand, VaultError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["REGISTER", username, password] => Ok(PreAuthCommand::Register {
            username: (*username).to_string(),
            password: (*password).to_string(),
        }),
        ["LOGIN", username, password] => Ok(PreAuthCommand::Login {
            username: (*username).to_string(),
            password: (*password).to_string(),
        }),
        [] => Err(VaultError::invalid_input("Empty command")),
        _ => Err(VaultError::invalid_input(
            "Invalid format. Use: REGISTER <username> <password> or LOGIN <username> <password>",
        )),
    }
}

/// Parses a post-auth line into a [`PostAuthCommand`].
///
/// # Errors
///
/// Returns [`VaultError::invalid_input`] for an unknown verb, a missing
/// filename on a command that requires one, or extra trailing tokens.
pub fn parse_post_auth(line: &str) -> Result<PostAuthCommand, VaultError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["UPLOAD", filename] => Ok(PostAuthCommand::Upload {
            filename: (*filename).to_string(),
        }),
        ["DOWNLOAD", filename] => Ok(PostAuthCommand::Download {
            filename: (*filename).to_string(),
        }),
        ["DELETE", filename] => Ok(PostAuthCommand::Delete {
            filename: (*filename).to_string(),
        }),
        ["LIST"] => Ok(PostAuthCommand::List),
        ["QUIT"] => Ok(PostAuthCommand::Quit),
        ["UPLOAD" | "DOWNLOAD" | "DELETE"] => {
            Err(VaultError::invalid_input("Missing filename"))
        }
        [] => Err(VaultError::invalid_input("Empty command")),
        _ => Err(VaultError::invalid_input("Unknown command")),
    }
}

/// Parses the `SIZE <n>` line a client sends after an `UPLOAD` `READY:`
/// reply.
///
/// # Errors
///
/// Returns [`VaultError::invalid_input`] if the line is not exactly `SIZE`
/// followed by a non-negative integer, or if the value exceeds
/// `max_upload_bytes`.
pub fn parse_upload_size(line: &str, max_upload_bytes: u64) -> Result<u64, VaultError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let ["SIZE", value] = tokens.as_slice() else {
        return Err(VaultError::invalid_input("Invalid SIZE format"));
    };
    let size: u64 = value
        .parse()
        .map_err(|_| VaultError::invalid_input("Invalid SIZE format"))?;
    if size > max_upload_bytes {
        return Err(VaultError::invalid_input("Upload too large"));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_register_and_login() {
        assert_eq!(
            parse_pre_auth("REGISTER alice hunter2").unwrap(),
            PreAuthCommand::Register {
                username: "alice".into(),
                password: "hunter2".into()
            }
        );
        assert_eq!(
            parse_pre_auth("LOGIN alice hunter2").unwrap(),
            PreAuthCommand::Login {
                username: "alice".into(),
                password: "hunter2".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_pre_auth_verbs_and_wrong_arity() {
        assert!(parse_pre_auth("PING").is_err());
        assert!(parse_pre_auth("REGISTER alice").is_err());
        assert!(parse_pre_auth("REGISTER alice one two").is_err());
    }

    #[test]
    fn parses_every_post_auth_verb() {
        assert_eq!(
            parse_post_auth("UPLOAD hello.txt").unwrap(),
            PostAuthCommand::Upload {
                filename: "hello.txt".into()
            }
        );
        assert_eq!(
            parse_post_auth("DOWNLOAD hello.txt").unwrap(),
            PostAuthCommand::Download {
                filename: "hello.txt".into()
            }
        );
        assert_eq!(
            parse_post_auth("DELETE hello.txt").unwrap(),
            PostAuthCommand::Delete {
                filename: "hello.txt".into()
            }
        );
        assert_eq!(parse_post_auth("LIST").unwrap(), PostAuthCommand::List);
        assert_eq!(parse_post_auth("QUIT").unwrap(), PostAuthCommand::Quit);
    }

    #[test]
    fn rejects_file_commands_missing_a_filename() {
        assert!(parse_post_auth("UPLOAD").is_err());
        assert!(parse_post_auth("DOWNLOAD").is_err());
    }

    #[test]
    fn parses_a_valid_size_line() {
        assert_eq!(parse_upload_size("SIZE 11", 1024).unwrap(), 11);
    }

    #[test]
    fn rejects_a_size_line_over_the_limit_or_malformed() {
        assert!(parse_upload_size("SIZE 9999", 1024).is_err());
        assert!(parse_upload_size("SIZE abc", 1024).is_err());
        assert!(parse_upload_size("WRONG 11", 1024).is_err());
    }
}
