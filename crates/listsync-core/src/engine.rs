use chrono::Utc;
use listsync_config::SyncOptions;
use listsync_models::{MediaItem, MediaKind, RemoteList, UserRef};
use listsync_sources::{BatchOutcome, ListDetails, ListSummary, Privacy, RemoteListApi, SearchTarget, ME};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use crate::dedup::Deduplicator;
use crate::error::{SyncError, SyncResult};
use crate::paging::{walk_pages, PagePolicy};
use crate::token_gate::TokenGate;

/// Description written on every list this tool manages
pub const LIST_DESCRIPTION: &str = "Kept up to date automatically by listsync.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Results per search page
    pub page_size: u32,
    /// Pause between list-content pages
    pub page_delay: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            page_delay: Duration::from_millis(500),
        }
    }
}

impl From<&SyncOptions> for EngineOptions {
    fn from(options: &SyncOptions) -> Self {
        Self {
            page_size: options.page_size,
            page_delay: Duration::from_millis(options.page_delay_ms),
        }
    }
}

/// List operations against the remote service.
///
/// Every remote call resolves its credential through the [`TokenGate`] right
/// before it goes out (once per page for paged reads) and passes it down
/// explicitly, so one engine can serve many users concurrently.
pub struct SyncEngine {
    api: Arc<dyn RemoteListApi>,
    tokens: Arc<TokenGate>,
    options: EngineOptions,
}

impl SyncEngine {
    pub fn new(api: Arc<dyn RemoteListApi>, tokens: Arc<TokenGate>, options: EngineOptions) -> Self {
        Self { api, tokens, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn details(name: &str) -> ListDetails {
        ListDetails {
            name: name.to_string(),
            description: LIST_DESCRIPTION.to_string(),
            privacy: Privacy::Public,
            display_numbers: false,
            allow_comments: false,
        }
    }

    fn require_id(list: &RemoteList, operation: &str) -> SyncResult<u64> {
        list.id.ok_or_else(|| {
            SyncError::validation(format!("Cannot {} list '{}': it has no remote id", operation, list.name))
        })
    }

    fn require_slug<'a>(list: &'a RemoteList, operation: &str) -> SyncResult<&'a str> {
        list.slug.as_deref().ok_or_else(|| {
            SyncError::validation(format!("Cannot {} list '{}': it has no slug", operation, list.name))
        })
    }

    /// Id the remote addresses the list by. The list must have both its id and slug.
    fn require_remote(list: &RemoteList, operation: &str) -> SyncResult<u64> {
        Self::require_slug(list, operation)?;
        Self::require_id(list, operation)
    }

    fn require_kind(items: &[MediaItem], kind: MediaKind) -> SyncResult<()> {
        match items.iter().find(|item| item.kind != kind) {
            Some(item) => Err(SyncError::validation(format!(
                "'{}' is a {}, expected only {} items",
                item.title,
                item.kind,
                kind
            ))),
            None => Ok(()),
        }
    }

    /// Creates the list remotely and returns it with its assigned id and slug.
    #[instrument(skip(self, list), fields(list = %list.name, owner = %list.owner))]
    pub async fn create(&self, mut list: RemoteList) -> SyncResult<RemoteList> {
        if list.id.is_some() {
            return Err(SyncError::validation(format!("List '{}' already exists remotely", list.name)));
        }
        list.filter.validate()?;

        let credential = self.tokens.prepare(Some(&list.owner)).await?;
        let created = self.api.create_list(&credential, ME, &Self::details(&list.name)).await?;

        list.id = Some(created.id);
        list.slug = Some(created.slug);
        list.last_processed = Some(Utc::now());
        list.process = true;
        info!(id = created.id, slug = list.label(), "Created list");
        Ok(list)
    }

    /// Fetches id, slug and name of a list owned by `user` (or the default user).
    pub async fn get(&self, id: u64, user: Option<&UserRef>) -> SyncResult<ListSummary> {
        let credential = self.tokens.prepare(user).await?;
        let summary = self.api.get_list(&credential, ME, id).await?;
        debug!(id, slug = %summary.slug, "Fetched list");
        Ok(summary)
    }

    /// Pushes the list's current name to the remote and returns the list unchanged.
    ///
    /// Id and slug stay as assigned at creation; later calls address the list by id.
    #[instrument(skip(self, list), fields(list = %list.name))]
    pub async fn update(&self, list: RemoteList) -> SyncResult<RemoteList> {
        let id = Self::require_id(&list, "update")?;
        let credential = self.tokens.prepare(Some(&list.owner)).await?;
        let updated = self.api.update_list(&credential, ME, id, &Self::details(&list.name)).await?;
        info!(id, slug = list.label(), remote_slug = %updated.slug, "Updated list");
        Ok(list)
    }

    #[instrument(skip(self, list), fields(list = %list.name))]
    pub async fn delete(&self, list: &RemoteList) -> SyncResult<()> {
        let id = Self::require_remote(list, "delete")?;
        let credential = self.tokens.prepare(Some(&list.owner)).await?;
        self.api.delete_list(&credential, list.owner.as_str(), id).await?;
        info!(id, slug = list.label(), "Deleted list");
        Ok(())
    }

    /// Current contents of the list for one kind, every page, in remote order
    pub async fn get_items(&self, list: &RemoteList, kind: MediaKind) -> SyncResult<Vec<MediaItem>> {
        let id = Self::require_remote(list, "read")?;
        let owner = &list.owner;

        let mut items = Vec::new();
        let pages = walk_pages(
            PagePolicy::with_backoff(self.options.page_delay),
            None,
            move |cursor| async move {
                // A long walk can outlive the token, so every page gets a checked credential
                let credential = self.tokens.prepare(Some(owner)).await?;
                Ok::<_, SyncError>(self.api.list_items(&credential, owner.as_str(), id, kind, cursor).await?)
            },
            |page| items.extend(page),
        )
        .await?;

        debug!(list = list.label(), kind = %kind, pages, items = items.len(), "Fetched list contents");
        Ok(items)
    }

    pub async fn get_movies(&self, list: &RemoteList) -> SyncResult<Vec<MediaItem>> {
        self.get_items(list, MediaKind::Movie).await
    }

    pub async fn get_shows(&self, list: &RemoteList) -> SyncResult<Vec<MediaItem>> {
        self.get_items(list, MediaKind::Show).await
    }

    /// Everything the list's filter matches for one kind, each item once
    pub async fn search(&self, list: &RemoteList, kind: MediaKind) -> SyncResult<Vec<MediaItem>> {
        list.filter.validate()?;
        let owner = &list.owner;
        let filter = &list.filter;
        let target = SearchTarget::for_kind(kind, filter);

        let mut seen = Deduplicator::new();
        let mut items = Vec::new();
        let pages = walk_pages(
            PagePolicy::ExhaustiveUntilEqual,
            Some(self.options.page_size),
            move |cursor| async move {
                let credential = self.tokens.prepare(Some(owner)).await?;
                Ok::<_, SyncError>(self.api.search(&credential, target, filter, cursor).await?)
            },
            |page| seen.extend_unique(&mut items, page),
        )
        .await?;

        debug!(list = list.label(), kind = %kind, pages, items = items.len(), "Search complete");
        Ok(items)
    }

    pub async fn movie_search(&self, list: &RemoteList) -> SyncResult<Vec<MediaItem>> {
        self.search(list, MediaKind::Movie).await
    }

    pub async fn show_search(&self, list: &RemoteList) -> SyncResult<Vec<MediaItem>> {
        self.search(list, MediaKind::Show).await
    }

    /// Adds the items in one remote call. An empty batch makes no call.
    pub async fn add_items(&self, list: &RemoteList, items: &[MediaItem]) -> SyncResult<BatchOutcome> {
        let id = Self::require_remote(list, "add items to")?;
        if items.is_empty() {
            return Ok(BatchOutcome::default());
        }
        let credential = self.tokens.prepare(Some(&list.owner)).await?;
        let outcome = self.api.add_list_items(&credential, list.owner.as_str(), id, items).await?;
        info!(list = list.label(), requested = items.len(), added = outcome.changed, existing = outcome.existing, "Added items");
        Ok(outcome)
    }

    /// Removes the items in one remote call. An empty batch makes no call.
    pub async fn remove_items(&self, list: &RemoteList, items: &[MediaItem]) -> SyncResult<BatchOutcome> {
        let id = Self::require_remote(list, "remove items from")?;
        if items.is_empty() {
            return Ok(BatchOutcome::default());
        }
        let credential = self.tokens.prepare(Some(&list.owner)).await?;
        let outcome = self.api.remove_list_items(&credential, list.owner.as_str(), id, items).await?;
        info!(list = list.label(), requested = items.len(), removed = outcome.changed, "Removed items");
        Ok(outcome)
    }

    pub async fn add_movies(&self, list: &RemoteList, movies: &[MediaItem]) -> SyncResult<BatchOutcome> {
        Self::require_kind(movies, MediaKind::Movie)?;
        self.add_items(list, movies).await
    }

    pub async fn add_shows(&self, list: &RemoteList, shows: &[MediaItem]) -> SyncResult<BatchOutcome> {
        Self::require_kind(shows, MediaKind::Show)?;
        self.add_items(list, shows).await
    }

    pub async fn remove_movies(&self, list: &RemoteList, movies: &[MediaItem]) -> SyncResult<BatchOutcome> {
        Self::require_kind(movies, MediaKind::Movie)?;
        self.remove_items(list, movies).await
    }

    pub async fn remove_shows(&self, list: &RemoteList, shows: &[MediaItem]) -> SyncResult<BatchOutcome> {
        Self::require_kind(shows, MediaKind::Show)?;
        self.remove_items(list, shows).await
    }
}
