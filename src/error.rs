//! Error types for rep-outreach.

use uuid::Uuid;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Roster fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Roster load failures. No partial roster is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Roster request failed: {0}")]
    Transport(String),

    #[error("Roster source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Roster response was malformed: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rewrite round-trip failures. The caller's current text is never touched.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("Rewriting is not configured")]
    NotConfigured,

    #[error("No legislator is selected")]
    NoSelection,

    #[error("A rewrite is already in progress for this legislator")]
    InFlight,

    #[error("Rewriting service failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Rewriting service returned no text")]
    EmptyOutput,
}

/// Mail handoff errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid mail URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("No valid recipient addresses")]
    NoRecipients,

    #[error("No sender address is configured")]
    SenderNotConfigured,

    #[error("Failed to build message: {0}")]
    Build(String),
}

/// Outreach session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid session id: {0}")]
    InvalidId(String),

    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("Record index {index} out of range (roster has {len} records)")]
    RecordOutOfRange { index: usize, len: usize },

    #[error("No legislator is selected")]
    NoSelection,
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
