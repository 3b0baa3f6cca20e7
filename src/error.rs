use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Custom error type for site_hook operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Invalid config file: line {line_no} has no '=' separator: {line:?}")]
    MalformedConfigLine { line_no: usize, line: String },

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Command `{command}` failed to start: {source}")]
    CommandSpawn { command: String, source: io::Error },

    #[error("Command `{command}` exited with {status}\n{stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Command `{command}` timed out after {}s", .timeout.as_secs())]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("Command `{command}` cancelled by shutdown")]
    Cancelled { command: String },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Helper type for Results that use HookError
pub type Result<T> = std::result::Result<T, HookError>;

/// Reasons a webhook delivery is turned away before dispatch.
#[derive(Debug, thiserror::Error)]
pub enum WebhookRejection {
    #[error("missing signature header")]
    MissingSignature,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("missing X-GitHub-Event header")]
    MissingEventType,

    #[error("could not parse {event} payload: {reason}")]
    Decode { event: String, reason: String },

    #[error("unsupported content type {0:?}")]
    UnsupportedContentType(String),
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        let status = match self {
            WebhookRejection::MissingSignature | WebhookRejection::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            WebhookRejection::MissingEventType
            | WebhookRejection::Decode { .. }
            | WebhookRejection::UnsupportedContentType(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}
