use thiserror::Error;

/// Failure envelope for a single remote call.
///
/// The remote's own status and body are carried unchanged so callers can
/// surface exactly what the service said.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{operation} failed: HTTP {status} - {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned an unexpected payload: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate limiting, server errors and connection trouble are worth another attempt.
    /// Anything else is the remote rejecting the request.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            RemoteError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            RemoteError::Decode { .. } => false,
        }
    }
}
