use async_trait::async_trait;
use listsync_models::{Credential, FilterSpec, MediaItem, MediaKind, Page, PageCursor};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use crate::error::RemoteError;
use crate::traits::{BatchOutcome, ListDetails, ListSummary, RemoteListApi, SearchTarget, TokenRefresher};
use crate::trakt::api::{self, ApiContext};
use crate::trakt::auth;

pub const DEFAULT_API_URL: &str = "https://api.trakt.tv";

/// Bounded exponential backoff for transient failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: base, 2x base, 4x base, ... capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Trakt implementation of the remote list service.
///
/// Holds no per-user state: the credential travels with each call, so a
/// single client is shared by every concurrent sync run.
#[derive(Clone)]
pub struct TraktClient {
    client: Arc<Client>,
    api_url: String,
    client_id: String,
    client_secret: String,
    retry: RetryPolicy,
}

impl TraktClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: Arc::new(auth::create_trakt_client(Duration::from_secs(30))),
            api_url: DEFAULT_API_URL.to_string(),
            client_id,
            client_secret,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Arc::new(auth::create_trakt_client(timeout));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn ctx(&self) -> ApiContext<'_> {
        ApiContext {
            client: &self.client,
            api_url: &self.api_url,
            client_id: &self.client_id,
            retry: &self.retry,
        }
    }

    /// Username slug the given access token belongs to
    pub async fn username_for(&self, access_token: &str) -> Result<String, RemoteError> {
        api::get_username(&self.ctx(), access_token).await
    }
}

impl std::fmt::Debug for TraktClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraktClient")
            .field("api_url", &self.api_url)
            .field("retry", &self.retry)
            .finish()
    }
}

#[async_trait]
impl RemoteListApi for TraktClient {
    async fn search(
        &self,
        credential: &Credential,
        target: SearchTarget<'_>,
        filter: &FilterSpec,
        cursor: PageCursor,
    ) -> Result<Page<MediaItem>, RemoteError> {
        api::search(&self.ctx(), credential, target, filter, cursor).await
    }

    async fn list_items(
        &self,
        credential: &Credential,
        owner: &str,
        list_id: u64,
        kind: MediaKind,
        cursor: PageCursor,
    ) -> Result<Page<MediaItem>, RemoteError> {
        api::list_items(&self.ctx(), credential, owner, list_id, kind, cursor).await
    }

    async fn get_list(&self, credential: &Credential, owner: &str, id: u64) -> Result<ListSummary, RemoteError> {
        api::get_list(&self.ctx(), credential, owner, id).await
    }

    async fn create_list(
        &self,
        credential: &Credential,
        owner: &str,
        details: &ListDetails,
    ) -> Result<ListSummary, RemoteError> {
        api::create_list(&self.ctx(), credential, owner, details).await
    }

    async fn update_list(
        &self,
        credential: &Credential,
        owner: &str,
        id: u64,
        details: &ListDetails,
    ) -> Result<ListSummary, RemoteError> {
        api::update_list(&self.ctx(), credential, owner, id, details).await
    }

    async fn delete_list(&self, credential: &Credential, owner: &str, list_id: u64) -> Result<(), RemoteError> {
        api::delete_list(&self.ctx(), credential, owner, list_id).await
    }

    async fn add_list_items(
        &self,
        credential: &Credential,
        owner: &str,
        list_id: u64,
        items: &[MediaItem],
    ) -> Result<BatchOutcome, RemoteError> {
        api::add_list_items(&self.ctx(), credential, owner, list_id, items).await
    }

    async fn remove_list_items(
        &self,
        credential: &Credential,
        owner: &str,
        list_id: u64,
        items: &[MediaItem],
    ) -> Result<BatchOutcome, RemoteError> {
        api::remove_list_items(&self.ctx(), credential, owner, list_id, items).await
    }
}

#[async_trait]
impl TokenRefresher for TraktClient {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, RemoteError> {
        auth::refresh_access_token(&self.client, &self.api_url, &self.client_id, &self.client_secret, credential).await
    }
}
