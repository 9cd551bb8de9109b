use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The remote account a list or credential belongs to (its username slug)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserRef(String);

impl UserRef {
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OAuth grant stored for one user
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub user: UserRef,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(expires_at: DateTime<Utc>) -> Credential {
        Credential {
            user: UserRef::new("alice"),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(credential(now - Duration::seconds(1)).is_expired(now));
        assert!(!credential(now + Duration::hours(1)).is_expired(now));
        assert!(!credential(now).is_expired(now));
    }

    #[test]
    fn test_debug_masks_tokens() {
        let debug = format!("{:?}", credential(Utc::now()));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("access\""));
        assert!(!debug.contains("refresh\""));
    }
}
