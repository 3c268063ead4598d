//! Error types for mailguard.
//!
//! The security scanner itself has no error type — it is a total function
//! over its input domain. Errors only arise at the I/O edges (transport,
//! SMTP, configuration) and in the polling service.

/// Top-level error type for the daemon.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail transport errors (IMAP connect, fetch, move).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect to {host}:{port}: {reason}")]
    ConnectFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Authentication failed for {user}")]
    AuthFailed { user: String },

    #[error("Failed to select folder {folder}: {reason}")]
    SelectFailed { folder: String, reason: String },

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Message not found: {id}")]
    MessageNotFound { id: String },

    #[error("Failed to move message {id} to {destination}: {reason}")]
    MoveFailed {
        id: String,
        destination: String,
        reason: String,
    },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// SMTP notification errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build report mail: {0}")]
    BuildFailed(String),

    #[error("SMTP send failed: {0}")]
    SendFailed(String),
}

/// Polling service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Service already running")]
    AlreadyRunning,

    #[error("Scan pass failed: {0}")]
    PassFailed(String),
}

/// Result type alias for the daemon.
pub type Result<T> = std::result::Result<T, Error>;
