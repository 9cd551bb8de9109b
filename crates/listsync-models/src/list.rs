use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::credential::UserRef;
use crate::filter::FilterSpec;
use crate::media::MediaKind;

/// Where a list is in its lifecycle.
///
/// Only `Unsynced` and `Created` are derivable from a stored list; the others
/// describe what an operation just did to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Unsynced,
    Created,
    Processing,
    Updated,
    Deleted,
}

impl fmt::Display for ListState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListState::Unsynced => "unsynced",
            ListState::Created => "created",
            ListState::Processing => "processing",
            ListState::Updated => "updated",
            ListState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// A user-owned list on the remote service, kept in line with `filter`.
///
/// `id` and `slug` are assigned by the remote on creation and never change
/// afterwards; `name` belongs to the owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub name: String,
    pub owner: UserRef,
    pub item_kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub process: bool,
    #[serde(default)]
    pub filter: FilterSpec,
}

impl RemoteList {
    pub fn new(name: impl Into<String>, owner: UserRef, item_kind: MediaKind, filter: FilterSpec) -> Self {
        Self {
            id: None,
            slug: None,
            name: name.into(),
            owner,
            item_kind,
            last_processed: None,
            process: false,
            filter,
        }
    }

    pub fn state(&self) -> ListState {
        if self.id.is_some() {
            ListState::Created
        } else {
            ListState::Unsynced
        }
    }

    /// Whether a scheduled run should reconcile this list now
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        if !self.process || self.slug.is_none() {
            return false;
        }
        match self.last_processed {
            Some(last) => now - last >= interval,
            None => true,
        }
    }

    /// Short label for logs: slug when known, name otherwise
    pub fn label(&self) -> &str {
        self.slug.as_deref().unwrap_or(&self.name)
    }
}
