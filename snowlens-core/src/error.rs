//! Error types for Snowlens
//!
//! This module defines all error types used throughout the Snowlens
//! application, providing descriptive error messages for validation,
//! private-key handling, warehouse connections, secrets storage, and
//! query execution.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Snowlens operations
#[derive(Debug, Error)]
pub enum SnowlensError {
    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Private-key parsing and decryption errors
    #[error("Private key error: {0}")]
    Key(#[from] KeyError),

    /// Warehouse connection errors
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// Secrets store errors
    #[error("Secrets store error: {0}")]
    Store(#[from] StoreError),

    /// Query execution errors
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised before any network call is made
///
/// A submission that fails validation must redisplay the form with the
/// message instead of reaching the warehouse client with empty fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was left empty
    #[error("Required field is empty: {0}")]
    EmptyField(&'static str),

    /// The account locator could not be derived from the input
    #[error("Invalid account locator: {0}")]
    InvalidAccount(String),

    /// The requested time window ends before it starts
    #[error("Invalid time window: end {end} is not after start {start}")]
    InvalidWindow {
        /// Window start as entered
        start: String,
        /// Window end as entered
        end: String,
    },
}

/// Errors related to private-key parsing and decryption
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key material could not be parsed
    #[error("Failed to parse private key: {0}")]
    Malformed(String),

    /// Decryption failed, typically because the passphrase is wrong
    #[error("Failed to decrypt private key (wrong passphrase?): {0}")]
    Decrypt(String),

    /// The key is marked encrypted but no passphrase was supplied
    #[error("Private key is marked encrypted but no passphrase was supplied")]
    MissingPassphrase,

    /// Re-encoding the parsed key failed
    #[error("Failed to re-encode private key: {0}")]
    Encode(String),
}

/// Errors related to opening a warehouse session
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The warehouse rejected the credentials
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP transport failure (unreachable host, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server response could not be interpreted
    #[error("Malformed server response: {0}")]
    BadResponse(String),

    /// The external browser SSO flow did not complete
    #[error("Browser SSO flow failed: {0}")]
    Browser(String),
}

/// Errors related to the secrets file
#[derive(Debug, Error)]
pub enum StoreError {
    /// The secrets file exists but could not be read
    #[error("Failed to read secrets file {path}: {reason}")]
    Read {
        /// Path to the secrets file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The secrets file could not be written
    #[error("Failed to write secrets file {path}: {reason}")]
    Write {
        /// Path to the secrets file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The secrets file is not valid TOML
    #[error("Failed to parse secrets file {path}: {reason}")]
    Parse {
        /// Path to the secrets file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// A profile could not be serialized for storage
    #[error("Failed to serialize connection profile: {0}")]
    Serialize(String),

    /// No saved connection exists under the given key
    #[error("No saved connection named '{0}'")]
    NotFound(String),

    /// The configuration directory could not be determined
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

/// Errors related to query execution
#[derive(Debug, Error)]
pub enum QueryError {
    /// The warehouse reported a failure for the statement
    #[error("Query execution failed: {0}")]
    Execution(String),

    /// HTTP transport failure while executing the statement
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A result row did not match the expected shape
    #[error("Malformed result row: {0}")]
    MalformedRow(String),

    /// The session token was rejected; the cached session is stale
    #[error("Session expired: {0}")]
    SessionExpired(String),
}

/// Result type alias for Snowlens operations
pub type Result<T> = std::result::Result<T, SnowlensError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Result type alias for private-key operations
pub type KeyResult<T> = std::result::Result<T, KeyError>;

/// Result type alias for connection operations
pub type ConnectResult<T> = std::result::Result<T, ConnectError>;

/// Result type alias for secrets store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for query operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;
