use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use listsync_models::RemoteList;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
struct ListsData {
    #[serde(default)]
    lists: Vec<RemoteList>,
}

/// Local record of the lists this installation manages, kept in `lists.toml`.
///
/// Only lists that exist remotely are stored; they are keyed by remote id.
pub struct ListRegistry {
    path: PathBuf,
    lists: Vec<RemoteList>,
}

impl ListRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lists: Vec::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let data: ListsData = toml::from_str(&content)?;
            self.lists = data.lists;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = ListsData {
            lists: self.lists.clone(),
        };
        let content = toml::to_string_pretty(&data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn all(&self) -> &[RemoteList] {
        &self.lists
    }

    pub fn get(&self, id: u64) -> Option<&RemoteList> {
        self.lists.iter().find(|list| list.id == Some(id))
    }

    /// Insert or replace by remote id
    pub fn upsert(&mut self, list: RemoteList) -> Result<()> {
        let id = list.id
            .ok_or_else(|| anyhow::anyhow!("List '{}' has no remote id and cannot be stored", list.name))?;
        match self.lists.iter_mut().find(|existing| existing.id == Some(id)) {
            Some(existing) => *existing = list,
            None => self.lists.push(list),
        }
        Ok(())
    }

    /// Stamps a successful run on the stored copy, leaving every other field as stored
    pub fn mark_processed(&mut self, id: u64, at: DateTime<Utc>) -> bool {
        match self.lists.iter_mut().find(|list| list.id == Some(id)) {
            Some(list) => {
                list.last_processed = Some(at);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<RemoteList> {
        let index = self.lists.iter().position(|list| list.id == Some(id))?;
        Some(self.lists.remove(index))
    }

    /// Lists flagged for processing whose last run is older than `interval`
    pub fn due(&self, now: DateTime<Utc>, interval: Duration) -> Vec<RemoteList> {
        self.lists
            .iter()
            .filter(|list| list.is_due(now, interval))
            .cloned()
            .collect()
    }
}
