use async_trait::async_trait;
use listsync_models::{Credential, FilterSpec, MediaItem, MediaKind, Page, PageCursor};
use std::collections::BTreeSet;
use crate::error::RemoteError;

/// Owner handle the remote resolves to the authenticated user
pub const ME: &str = "me";

/// What a search is looking for, with the filters only that kind understands
#[derive(Debug, Clone, Copy)]
pub enum SearchTarget<'a> {
    Movies,
    Shows {
        certifications: &'a BTreeSet<String>,
        networks: &'a BTreeSet<String>,
    },
}

impl<'a> SearchTarget<'a> {
    pub fn for_kind(kind: MediaKind, filter: &'a FilterSpec) -> Self {
        match kind {
            MediaKind::Movie => SearchTarget::Movies,
            MediaKind::Show => SearchTarget::Shows {
                certifications: &filter.certifications,
                networks: &filter.networks,
            },
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            SearchTarget::Movies => MediaKind::Movie,
            SearchTarget::Shows { .. } => MediaKind::Show,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privacy {
    Private,
    Friends,
    Public,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Private => "private",
            Privacy::Friends => "friends",
            Privacy::Public => "public",
        }
    }
}

/// Body of a list create/update call
#[derive(Debug, Clone, PartialEq)]
pub struct ListDetails {
    pub name: String,
    pub description: String,
    pub privacy: Privacy,
    pub display_numbers: bool,
    pub allow_comments: bool,
}

/// Minimal view of a remote list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub id: u64,
    pub slug: String,
    pub name: String,
}

/// What the remote reported for a batch add/remove
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Items added (or deleted, for removals)
    pub changed: usize,
    /// Items already present (adds only)
    pub existing: usize,
    pub not_found: usize,
}

/// The remote list service. Every call takes the credential it runs under,
/// so one client can serve many users at once.
///
/// Lists are addressed by their numeric id, which survives renames.
#[async_trait]
pub trait RemoteListApi: Send + Sync {
    async fn search(
        &self,
        credential: &Credential,
        target: SearchTarget<'_>,
        filter: &FilterSpec,
        cursor: PageCursor,
    ) -> Result<Page<MediaItem>, RemoteError>;

    async fn list_items(
        &self,
        credential: &Credential,
        owner: &str,
        list_id: u64,
        kind: MediaKind,
        cursor: PageCursor,
    ) -> Result<Page<MediaItem>, RemoteError>;

    async fn get_list(&self, credential: &Credential, owner: &str, id: u64) -> Result<ListSummary, RemoteError>;

    async fn create_list(
        &self,
        credential: &Credential,
        owner: &str,
        details: &ListDetails,
    ) -> Result<ListSummary, RemoteError>;

    async fn update_list(
        &self,
        credential: &Credential,
        owner: &str,
        id: u64,
        details: &ListDetails,
    ) -> Result<ListSummary, RemoteError>;

    async fn delete_list(&self, credential: &Credential, owner: &str, list_id: u64) -> Result<(), RemoteError>;

    async fn add_list_items(
        &self,
        credential: &Credential,
        owner: &str,
        list_id: u64,
        items: &[MediaItem],
    ) -> Result<BatchOutcome, RemoteError>;

    async fn remove_list_items(
        &self,
        credential: &Credential,
        owner: &str,
        list_id: u64,
        items: &[MediaItem],
    ) -> Result<BatchOutcome, RemoteError>;
}

/// Exchanges a stored refresh token for a fresh credential
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, RemoteError>;
}
