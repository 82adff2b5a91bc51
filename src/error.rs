use std::path::PathBuf;

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Error during file I/O operations
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization
    #[error("json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    /// Error when user input fails.
    #[error("inquire error: {0}")]
    Inquire(#[from] inquire::InquireError),
    /// Error when executing Git commands
    #[error("git command failed: {0}")]
    GitCommand(String),
    /// Error during input validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Alias is already taken by a stored profile.
    #[error("profile alias already exists: '{0}'")]
    DuplicateAlias(String),
    /// Specific profile alias is not found.
    #[error("profile not found: '{0}'")]
    ProfileNotFound(String),
    /// ssh-keygen is missing or exited with an error.
    #[error("failed to generate SSH key for '{alias}': {reason}")]
    KeyGenerationFailed { alias: String, reason: String },
    /// SSH config block could not be written. The key is kept for a retry.
    #[error(
        "failed to update SSH config for '{alias}': {source} (key kept at {}, run add again to retry)",
        key_path.display()
    )]
    ConfigWriteFailed {
        alias: String,
        key_path: PathBuf,
        #[source]
        source: Box<AppError>,
    },
    /// Profile store could not be written after key and config were set up.
    #[error("failed to save profile '{alias}': {source} (key and SSH config are in place, run add again to retry)")]
    StoreWriteFailed {
        alias: String,
        #[source]
        source: Box<AppError>,
    },
    /// SSH authentication could not be confirmed.
    #[error("connection test inconclusive for '{alias}': {detail}")]
    ConnectionProbeInconclusive { alias: String, detail: String },
    /// Some removal steps failed; the rest were carried out.
    #[error("profile '{alias}' was only partially removed: {}", failures.join("; "))]
    PartialRemoval { alias: String, failures: Vec<String> },
    /// Error during UTF-8 conversion.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}
