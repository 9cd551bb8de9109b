use serde::{Deserialize, Serialize};
use std::fmt;
use crate::media_ids::MediaIds;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl MediaKind {
    /// Singular path segment used by the remote API (`movie`, `show`)
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
        }
    }

    /// Plural key used in batch payloads (`movies`, `shows`)
    pub fn plural(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movies",
            MediaKind::Show => "shows",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "show" | "shows" => Ok(MediaKind::Show),
            other => Err(format!("Unknown media kind: {}", other)),
        }
    }
}

/// Identity of a media record on the remote service.
///
/// Two items are the same item when their keys match, regardless of title
/// or any other field the remote happened to return on a given page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaKey {
    pub kind: MediaKind,
    pub trakt_id: u64,
}

/// A movie or show as returned by the remote service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub title: String,
    pub year: Option<u32>,
    pub ids: MediaIds,
}

impl MediaItem {
    pub fn new(kind: MediaKind, title: impl Into<String>, year: Option<u32>, ids: MediaIds) -> Self {
        Self {
            kind,
            title: title.into(),
            year,
            ids,
        }
    }

    pub fn key(&self) -> MediaKey {
        MediaKey {
            kind: self.kind,
            trakt_id: self.ids.trakt,
        }
    }
}
