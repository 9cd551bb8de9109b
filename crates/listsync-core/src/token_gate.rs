use async_trait::async_trait;
use chrono::Utc;
use listsync_config::CredentialStore;
use listsync_models::{Credential, UserRef};
use listsync_sources::TokenRefresher;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::error::{SyncError, SyncResult};

/// Where credentials live between runs
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self, user: &UserRef) -> anyhow::Result<Option<Credential>>;
    async fn save(&self, credential: &Credential) -> anyhow::Result<()>;
}

/// `credentials.toml` backed store.
///
/// The file is re-read on every load so a token imported while the daemon
/// runs is picked up on the next operation.
pub struct FileTokenStore {
    store: Mutex<CredentialStore>,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            store: Mutex::new(CredentialStore::new(path)),
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, user: &UserRef) -> anyhow::Result<Option<Credential>> {
        let mut store = self.store.lock().await;
        store.load()?;
        Ok(store.get(user))
    }

    async fn save(&self, credential: &Credential) -> anyhow::Result<()> {
        let mut store = self.store.lock().await;
        store.load()?;
        store.set(credential.clone());
        store.save()
    }
}

/// Hands out a usable credential for a user, refreshing it first when it has expired.
pub struct TokenGate {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    default_user: Option<UserRef>,
    // Refresh tokens are single use; one refresh per user at a time
    locks: Mutex<HashMap<UserRef, Arc<Mutex<()>>>>,
}

impl TokenGate {
    pub fn new(store: Arc<dyn TokenStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            default_user: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// User assumed when an operation does not name one
    pub fn with_default_user(mut self, user: Option<UserRef>) -> Self {
        self.default_user = user;
        self
    }

    pub fn default_user(&self) -> Option<&UserRef> {
        self.default_user.as_ref()
    }

    fn resolve_user(&self, user: Option<&UserRef>) -> SyncResult<UserRef> {
        user.or(self.default_user.as_ref())
            .cloned()
            .ok_or_else(|| SyncError::validation("No user given and no default user configured"))
    }

    async fn lock_for(&self, user: &UserRef) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(user.clone()).or_default().clone()
    }

    /// Returns a credential for `user` (or the default user) that is valid now.
    ///
    /// An expired credential is refreshed and the result persisted before it is
    /// returned. A credential that cannot be refreshed is never handed out.
    pub async fn prepare(&self, user: Option<&UserRef>) -> SyncResult<Credential> {
        let user = self.resolve_user(user)?;
        let lock = self.lock_for(&user).await;
        let _guard = lock.lock().await;

        let stored = self
            .store
            .load(&user)
            .await
            .map_err(|e| SyncError::AuthExpired {
                user: user.clone(),
                reason: format!("stored credential could not be read: {:#}", e),
            })?
            .ok_or_else(|| SyncError::AuthExpired {
                user: user.clone(),
                reason: "no stored credential".to_string(),
            })?;

        if !stored.is_expired(Utc::now()) {
            debug!(user = %user, expires_at = %stored.expires_at, "Using stored credential");
            return Ok(stored);
        }

        info!(user = %user, expired_at = %stored.expires_at, "Access token expired, refreshing");
        let refreshed = self.refresher.refresh(&stored).await.map_err(|e| {
            warn!(user = %user, error = %e, "Token refresh failed");
            SyncError::AuthExpired {
                user: user.clone(),
                reason: e.to_string(),
            }
        })?;

        // The old refresh token is spent at this point, so keep going with the
        // new credential even if it could not be written back.
        if let Err(e) = self.store.save(&refreshed).await {
            warn!(user = %user, error = %e, "Refreshed credential could not be persisted");
        }
        info!(user = %user, expires_at = %refreshed.expires_at, "Access token refreshed");
        Ok(refreshed)
    }
}
