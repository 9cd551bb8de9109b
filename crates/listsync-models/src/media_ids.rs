use serde::{Deserialize, Serialize};

/// Identifiers the remote service attaches to a movie or show.
///
/// `trakt` is the stable numeric id and is always present; the others are
/// cross references that may be missing for obscure titles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MediaIds {
    pub trakt: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<u32>,
}

impl MediaIds {
    /// Ids carrying only the stable remote id
    pub fn trakt(id: u64) -> Self {
        Self {
            trakt: id,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_skips_missing_ids() {
        let json = serde_json::to_value(MediaIds::trakt(5)).unwrap();
        assert_eq!(json, serde_json::json!({ "trakt": 5 }));
    }
}
