use listsync_models::{FilterError, UserRef};
use listsync_sources::RemoteError;
use thiserror::Error;

/// Everything a sync operation can fail with.
///
/// Remote failures pass through unchanged; the caller decides what to show.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("credential for '{user}' is expired and could not be refreshed: {reason}")]
    AuthExpired { user: UserRef, reason: String },
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("{0}")]
    Validation(String),
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation(message.into())
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, SyncError::AuthExpired { .. })
    }
}

impl From<FilterError> for SyncError {
    fn from(err: FilterError) -> Self {
        SyncError::Validation(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
