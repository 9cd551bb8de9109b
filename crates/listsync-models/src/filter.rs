use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Inclusive bounds for a numeric search constraint. Either side may be open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Range<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<T>,
}

impl<T: PartialOrd + Copy + fmt::Display> Range<T> {
    pub fn new(from: Option<T>, to: Option<T>) -> Self {
        Self { from, to }
    }

    pub fn between(from: T, to: T) -> Self {
        Self::new(Some(from), Some(to))
    }

    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// `from <= to` whenever both bounds are present
    pub fn is_valid(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }

    /// Render as the `from-to` query form, filling an open side with the given limit.
    /// A filled side never crosses the given one, so `2150-` against an upper limit of
    /// 2100 renders as `2150-2150`.
    pub fn to_param(&self, lower: T, upper: T) -> Option<String> {
        if self.is_open() {
            return None;
        }
        let from = match (self.from, self.to) {
            (Some(from), _) => from,
            (None, Some(to)) if to < lower => to,
            (None, _) => lower,
        };
        let to = match self.to {
            Some(to) => to,
            None if from > upper => from,
            None => upper,
        };
        Some(format!("{}-{}", from, to))
    }
}

impl std::str::FromStr for Range<u32> {
    type Err = String;

    /// Parses `2000-2020`, `2000-`, `-2020` or a single value `2010`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| -> Result<Option<u32>, String> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse::<u32>()
                    .map(Some)
                    .map_err(|e| format!("Invalid range bound '{}': {}", part, e))
            }
        };

        match s.split_once('-') {
            Some((from, to)) => Ok(Range::new(parse(from)?, parse(to)?)),
            None => {
                let value = parse(s)?;
                Ok(Range::new(value, value))
            }
        }
    }
}

/// Field the free-text query is matched against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Tagline,
    Overview,
    People,
    Translations,
    Aliases,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Tagline => "tagline",
            SearchField::Overview => "overview",
            SearchField::People => "people",
            SearchField::Translations => "translations",
            SearchField::Aliases => "aliases",
        }
    }
}

impl std::str::FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(SearchField::Title),
            "tagline" => Ok(SearchField::Tagline),
            "overview" => Ok(SearchField::Overview),
            "people" => Ok(SearchField::People),
            "translations" => Ok(SearchField::Translations),
            "aliases" => Ok(SearchField::Aliases),
            other => Err(format!("Unknown search field: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    InvalidRange { field: &'static str },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::InvalidRange { field } => {
                write!(f, "{} range has 'from' greater than 'to'", field)
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Search criteria a list is kept in line with.
///
/// Empty sets and open ranges place no constraint on the search.
/// `certifications` and `networks` only apply to show searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FilterSpec {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub search_fields: BTreeSet<SearchField>,
    #[serde(default)]
    pub years: Range<u32>,
    #[serde(default)]
    pub runtimes: Range<u32>,
    #[serde(default)]
    pub ratings: Range<u32>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    #[serde(default)]
    pub languages: BTreeSet<String>,
    #[serde(default)]
    pub countries: BTreeSet<String>,
    #[serde(default)]
    pub certifications: BTreeSet<String>,
    #[serde(default)]
    pub networks: BTreeSet<String>,
}

impl FilterSpec {
    pub fn validate(&self) -> Result<(), FilterError> {
        if !self.years.is_valid() {
            return Err(FilterError::InvalidRange { field: "years" });
        }
        if !self.runtimes.is_valid() {
            return Err(FilterError::InvalidRange { field: "runtimes" });
        }
        if !self.ratings.is_valid() {
            return Err(FilterError::InvalidRange { field: "ratings" });
        }
        Ok(())
    }
}
