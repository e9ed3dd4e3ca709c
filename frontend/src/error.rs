use reqwest::StatusCode;
use thiserror::Error;

use crate::api::ApiError;

/// Coarse classification used by callers that only need to branch on the failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    RemoteOperation,
    Transport,
    InFlight,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Malformed input detected locally. Never results in a network call.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    /// The service processed the request and declined it.
    #[error("{message}")]
    RemoteOperation {
        status: u16,
        code: String,
        message: String,
    },
    /// Network, timeout or decode failure. The remote outcome is unknown.
    #[error("{0}")]
    Transport(String),
    #[error("Another request is still in progress")]
    InFlight,
    #[error("Session storage failed: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        ClientError::Transport(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Authentication(_) => ErrorKind::Authentication,
            ClientError::Authorization(_) => ErrorKind::Authorization,
            ClientError::RemoteOperation { .. } => ErrorKind::RemoteOperation,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::InFlight => ErrorKind::InFlight,
            ClientError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Errors that end the bulk job: the request never reached a point where the
    /// service could account for it.
    pub fn is_transport_level(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Authentication(_)
        )
    }

    /// Map a non-success HTTP response to an error, using the service payload when present.
    pub fn from_response(status: StatusCode, body: Option<ApiError>) -> Self {
        let message = body
            .as_ref()
            .map(|e| e.error.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_message(status));
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Authentication(message),
            StatusCode::FORBIDDEN => ClientError::Authorization(message),
            _ => ClientError::RemoteOperation {
                status: status.as_u16(),
                code: body
                    .map(|e| e.code)
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "REMOTE_ERROR".to_string()),
                message,
            },
        }
    }
}

fn default_message(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "Authentication required".to_string(),
        StatusCode::FORBIDDEN => "Access denied".to_string(),
        other => format!("Request failed with status {}", other.as_u16()),
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Transport(format!("Request timed out: {}", err))
        } else if err.is_decode() {
            ClientError::Transport(format!("Failed to parse response: {}", err))
        } else {
            ClientError::Transport(format!("Request failed: {}", err))
        }
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        messages.sort();
        messages.dedup();
        ClientError::Validation(messages.join("; "))
    }
}

/// User-visible message channel. Informational messages and failures are distinct
/// variants, so callers never have to inspect message text to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error { kind: ErrorKind, message: String },
}

impl Notice {
    pub fn info(msg: impl Into<String>) -> Self {
        Notice::Info(msg.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::Info(msg) => msg,
            Notice::Error { message, .. } => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error { .. })
    }
}

impl From<&ClientError> for Notice {
    fn from(err: &ClientError) -> Self {
        Notice::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
