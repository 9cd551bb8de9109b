use anyhow::Result;
use chrono::{DateTime, Utc};
use listsync_models::{Credential, UserRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct StoredToken {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(default)]
    users: BTreeMap<String, StoredToken>,
}

/// OAuth grants per user, kept in `credentials.toml`
pub struct CredentialStore {
    path: PathBuf,
    users: BTreeMap<String, StoredToken>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            users: BTreeMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.users = creds_data.users;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            users: self.users.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, user: &UserRef) -> Option<Credential> {
        self.users.get(user.as_str()).map(|token| Credential {
            user: user.clone(),
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token.expires_at,
        })
    }

    pub fn set(&mut self, credential: Credential) {
        self.users.insert(
            credential.user.as_str().to_string(),
            StoredToken {
                access_token: credential.access_token,
                refresh_token: credential.refresh_token,
                expires_at: credential.expires_at,
            },
        );
    }

    pub fn remove(&mut self, user: &UserRef) -> bool {
        self.users.remove(user.as_str()).is_some()
    }

    pub fn users(&self) -> Vec<UserRef> {
        self.users.keys().map(UserRef::new).collect()
    }
}
