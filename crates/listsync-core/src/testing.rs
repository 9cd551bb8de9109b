//! In-memory stand-ins for the remote service and credential storage

use async_trait::async_trait;
use chrono::{Duration, Utc};
use listsync_models::{Credential, FilterSpec, MediaIds, MediaItem, MediaKind, Page, PageCursor, RemoteList, UserRef};
use listsync_sources::{BatchOutcome, ListDetails, ListSummary, RemoteError, RemoteListApi, SearchTarget, TokenRefresher};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use crate::engine::{EngineOptions, SyncEngine};
use crate::token_gate::{TokenGate, TokenStore};

pub fn credential(user: &str, valid_for: Duration) -> Credential {
    Credential {
        user: UserRef::new(user),
        access_token: format!("{}-token", user),
        refresh_token: format!("{}-refresh", user),
        expires_at: Utc::now() + valid_for,
    }
}

pub fn movie(id: u64) -> MediaItem {
    MediaItem::new(MediaKind::Movie, format!("Movie {}", id), Some(2000), MediaIds::trakt(id))
}

pub fn show(id: u64) -> MediaItem {
    MediaItem::new(MediaKind::Show, format!("Show {}", id), Some(2010), MediaIds::trakt(id))
}

pub fn movies(ids: std::ops::Range<u64>) -> Vec<MediaItem> {
    ids.map(movie).collect()
}

/// A list already created remotely, owned by alice
pub fn created_list(id: u64, slug: &str, kind: MediaKind) -> RemoteList {
    let mut list = RemoteList::new(slug, UserRef::new("alice"), kind, FilterSpec::default());
    list.id = Some(id);
    list.slug = Some(slug.to_string());
    list.process = true;
    list
}

#[derive(Default)]
pub struct MemoryTokenStore {
    credentials: Mutex<HashMap<UserRef, Credential>>,
}

impl MemoryTokenStore {
    pub fn with(credential: Credential) -> Self {
        let store = Self::default();
        store.credentials.lock().unwrap().insert(credential.user.clone(), credential);
        store
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self, user: &UserRef) -> anyhow::Result<Option<Credential>> {
        Ok(self.credentials.lock().unwrap().get(user).cloned())
    }

    async fn save(&self, credential: &Credential) -> anyhow::Result<()> {
        self.credentials.lock().unwrap().insert(credential.user.clone(), credential.clone());
        Ok(())
    }
}

pub struct FakeRefresher {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeRefresher {
    pub fn succeeding() -> Self {
        Self { fail: false, calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { fail: true, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for FakeRefresher {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            return Err(RemoteError::Status {
                operation: "refresh token",
                status: 401,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(Credential {
            user: credential.user.clone(),
            access_token: format!("{}-refreshed", credential.access_token),
            refresh_token: format!("{}-refreshed", credential.refresh_token),
            expires_at: Utc::now() + Duration::hours(24),
        })
    }
}

#[derive(Default)]
struct FakeState {
    search_pages: HashMap<MediaKind, Vec<Vec<MediaItem>>>,
    fail_search_page: Option<u32>,
    lists: BTreeMap<u64, (String, String)>,
    contents: HashMap<u64, Vec<MediaItem>>,
    list_page_size: usize,
    next_id: u64,
    calls: Vec<String>,
    tokens: Vec<String>,
    show_filters: Option<(Vec<String>, Vec<String>)>,
}

/// Remote list service held entirely in memory. Every call is recorded.
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                list_page_size: 100,
                next_id: 123,
                ..FakeState::default()
            }),
        }
    }

    /// Search results for `kind`, one vector per page
    pub fn with_search_pages(self, kind: MediaKind, pages: Vec<Vec<MediaItem>>) -> Self {
        self.state.lock().unwrap().search_pages.insert(kind, pages);
        self
    }

    pub fn failing_search_page(self, page: u32) -> Self {
        self.state.lock().unwrap().fail_search_page = Some(page);
        self
    }

    pub fn with_list(self, id: u64, slug: &str, items: Vec<MediaItem>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.lists.insert(id, (slug.to_string(), slug.to_string()));
            state.contents.insert(id, items);
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(prefix)).count()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().tokens.clone()
    }

    pub fn contents(&self, id: u64) -> Vec<MediaItem> {
        self.state.lock().unwrap().contents.get(&id).cloned().unwrap_or_default()
    }

    pub fn has_list(&self, id: u64) -> bool {
        self.state.lock().unwrap().contents.contains_key(&id)
    }

    /// Slug the remote currently reports for a list
    pub fn remote_slug(&self, id: u64) -> Option<String> {
        self.state.lock().unwrap().lists.get(&id).map(|(slug, _)| slug.clone())
    }

    pub fn show_filters(&self) -> Option<(Vec<String>, Vec<String>)> {
        self.state.lock().unwrap().show_filters.clone()
    }

    fn record(&self, call: String, credential: &Credential) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.tokens.push(credential.access_token.clone());
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

fn not_found(operation: &'static str) -> RemoteError {
    RemoteError::Status {
        operation,
        status: 404,
        body: "not found".to_string(),
    }
}

#[async_trait]
impl RemoteListApi for FakeApi {
    async fn search(
        &self,
        credential: &Credential,
        target: SearchTarget<'_>,
        _filter: &FilterSpec,
        cursor: PageCursor,
    ) -> Result<Page<MediaItem>, RemoteError> {
        self.record(format!("search {} {}", target.kind(), cursor.page), credential);
        let mut state = self.state.lock().unwrap();
        if let SearchTarget::Shows { certifications, networks } = target {
            state.show_filters = Some((
                certifications.iter().cloned().collect(),
                networks.iter().cloned().collect(),
            ));
        }
        if state.fail_search_page == Some(cursor.page) {
            return Err(RemoteError::Status {
                operation: "search",
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        let pages = state.search_pages.get(&target.kind()).cloned().unwrap_or_default();
        let items = pages.get(cursor.page as usize - 1).cloned().unwrap_or_default();
        Ok(Page::new(items, cursor.page, pages.len() as u32))
    }

    async fn list_items(
        &self,
        credential: &Credential,
        _owner: &str,
        list_id: u64,
        kind: MediaKind,
        cursor: PageCursor,
    ) -> Result<Page<MediaItem>, RemoteError> {
        self.record(format!("list_items {} {} {}", list_id, kind, cursor.page), credential);
        let state = self.state.lock().unwrap();
        let items: Vec<MediaItem> = state
            .contents
            .get(&list_id)
            .ok_or_else(|| not_found("get list items"))?
            .iter()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect();
        let size = state.list_page_size;
        let total_pages = items.len().div_ceil(size).max(1) as u32;
        let page = items
            .chunks(size)
            .nth(cursor.page as usize - 1)
            .map(|chunk| chunk.to_vec())
            .unwrap_or_default();
        Ok(Page::new(page, cursor.page, total_pages))
    }

    async fn get_list(&self, credential: &Credential, _owner: &str, id: u64) -> Result<ListSummary, RemoteError> {
        self.record(format!("get_list {}", id), credential);
        let state = self.state.lock().unwrap();
        let (slug, name) = state.lists.get(&id).cloned().ok_or_else(|| not_found("get list"))?;
        Ok(ListSummary { id, slug, name })
    }

    async fn create_list(
        &self,
        credential: &Credential,
        _owner: &str,
        details: &ListDetails,
    ) -> Result<ListSummary, RemoteError> {
        self.record(format!("create_list {}", details.name), credential);
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let slug = format!("{}-{}", slugify(&details.name), id);
        state.lists.insert(id, (slug.clone(), details.name.clone()));
        state.contents.insert(id, Vec::new());
        Ok(ListSummary { id, slug, name: details.name.clone() })
    }

    async fn update_list(
        &self,
        credential: &Credential,
        _owner: &str,
        id: u64,
        details: &ListDetails,
    ) -> Result<ListSummary, RemoteError> {
        self.record(format!("update_list {}", id), credential);
        let mut state = self.state.lock().unwrap();
        if !state.lists.contains_key(&id) {
            return Err(not_found("update list"));
        }
        // Renaming re-slugs the list, like the real service
        let slug = slugify(&details.name);
        state.lists.insert(id, (slug.clone(), details.name.clone()));
        Ok(ListSummary { id, slug, name: details.name.clone() })
    }

    async fn delete_list(&self, credential: &Credential, _owner: &str, list_id: u64) -> Result<(), RemoteError> {
        self.record(format!("delete_list {}", list_id), credential);
        let mut state = self.state.lock().unwrap();
        state.contents.remove(&list_id).ok_or_else(|| not_found("delete list"))?;
        state.lists.remove(&list_id);
        Ok(())
    }

    async fn add_list_items(
        &self,
        credential: &Credential,
        _owner: &str,
        list_id: u64,
        items: &[MediaItem],
    ) -> Result<BatchOutcome, RemoteError> {
        self.record(format!("add_items {} {}", list_id, items.len()), credential);
        let mut state = self.state.lock().unwrap();
        let contents = state.contents.get_mut(&list_id).ok_or_else(|| not_found("add list items"))?;
        let mut outcome = BatchOutcome::default();
        for item in items {
            if contents.iter().any(|existing| existing.key() == item.key()) {
                outcome.existing += 1;
            } else {
                contents.push(item.clone());
                outcome.changed += 1;
            }
        }
        Ok(outcome)
    }

    async fn remove_list_items(
        &self,
        credential: &Credential,
        _owner: &str,
        list_id: u64,
        items: &[MediaItem],
    ) -> Result<BatchOutcome, RemoteError> {
        self.record(format!("remove_items {} {}", list_id, items.len()), credential);
        let mut state = self.state.lock().unwrap();
        let contents = state.contents.get_mut(&list_id).ok_or_else(|| not_found("remove list items"))?;
        let mut outcome = BatchOutcome::default();
        for item in items {
            let before = contents.len();
            contents.retain(|existing| existing.key() != item.key());
            if contents.len() < before {
                outcome.changed += 1;
            } else {
                outcome.not_found += 1;
            }
        }
        Ok(outcome)
    }
}

/// Engine over `api` with alice holding a credential valid for `valid_for`
pub fn engine_with(api: Arc<FakeApi>, valid_for: Duration, refresher: Arc<FakeRefresher>) -> SyncEngine {
    let options = EngineOptions {
        page_size: 100,
        page_delay: std::time::Duration::ZERO,
    };
    engine_with_options(api, valid_for, refresher, options)
}

pub fn engine_with_options(
    api: Arc<FakeApi>,
    valid_for: Duration,
    refresher: Arc<FakeRefresher>,
    options: EngineOptions,
) -> SyncEngine {
    let store = Arc::new(MemoryTokenStore::with(credential("alice", valid_for)));
    let gate = TokenGate::new(store, refresher).with_default_user(Some(UserRef::new("alice")));
    SyncEngine::new(api, Arc::new(gate), options)
}

pub fn engine(api: Arc<FakeApi>) -> SyncEngine {
    engine_with(api, Duration::hours(1), Arc::new(FakeRefresher::succeeding()))
}
