use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trakt: Option<TraktConfig>,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TraktConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// User whose credential is used when an operation names no owner
    #[serde(default)]
    pub default_user: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SyncOptions {
    /// Results requested per search page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pause between list-content pages
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_max_concurrent_lists")]
    pub max_concurrent_lists: usize,
    /// Minimum time between two runs over the same list
    #[serde(default = "default_process_interval_hours")]
    pub process_interval_hours: i64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_concurrent_lists: default_max_concurrent_lists(),
            process_interval_hours: default_process_interval_hours(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    "https://api.trakt.tv".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_max_concurrent_lists() -> usize {
    4
}

fn default_process_interval_hours() -> i64 {
    24
}

fn default_schedule() -> String {
    // sec min hour day month weekday
    "0 0 */6 * * *".to_string()
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let trakt = self.trakt.as_ref()
            .ok_or_else(|| anyhow::anyhow!("Trakt is not configured"))?;
        if trakt.client_id.is_empty() || trakt.client_id == "YOUR_CLIENT_ID" {
            return Err(anyhow::anyhow!("Trakt client_id is not configured"));
        }
        if trakt.client_secret.is_empty() || trakt.client_secret == "YOUR_CLIENT_SECRET" {
            return Err(anyhow::anyhow!("Trakt client_secret is not configured"));
        }

        if self.sync.page_size == 0 {
            return Err(anyhow::anyhow!("sync.page_size must be greater than zero"));
        }
        if self.sync.max_concurrent_lists == 0 {
            return Err(anyhow::anyhow!("sync.max_concurrent_lists must be greater than zero"));
        }
        if self.sync.process_interval_hours < 0 {
            return Err(anyhow::anyhow!("sync.process_interval_hours must be non-negative"));
        }

        Ok(())
    }

    pub fn is_trakt_configured(&self) -> bool {
        if let Some(ref trakt) = self.trakt {
            !trakt.client_id.is_empty()
                && trakt.client_id != "YOUR_CLIENT_ID"
                && !trakt.client_secret.is_empty()
                && trakt.client_secret != "YOUR_CLIENT_SECRET"
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn trakt(client_id: &str, client_secret: &str) -> TraktConfig {
        TraktConfig {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            api_url: default_api_url(),
            default_user: None,
        }
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let config = Config {
            trakt: Some(trakt("test_id", "test_secret")),
            sync: SyncOptions {
                page_size: 50,
                ..SyncOptions::default()
            },
            scheduler: Some(default_scheduler_config()),
        };

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.trakt.as_ref().unwrap().client_id, "test_id");
        assert_eq!(loaded.trakt.as_ref().unwrap().client_secret, "test_secret");
        assert_eq!(loaded.sync.page_size, 50);
        assert_eq!(loaded.sync.page_delay_ms, 500);
        assert_eq!(loaded.scheduler.unwrap().schedule, "0 0 */6 * * *");
    }

    #[test]
    fn test_sync_options_defaults_from_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [trakt]
            client_id = "id"
            client_secret = "secret"

            [sync]
            max_retries = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.trakt.as_ref().unwrap().api_url, "https://api.trakt.tv");
        assert_eq!(config.sync.max_retries, 1);
        assert_eq!(config.sync.page_size, 100);
        assert_eq!(config.sync.page_delay_ms, 500);
        assert_eq!(config.sync.max_concurrent_lists, 4);
        assert!(config.scheduler.is_none());
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config {
            trakt: Some(trakt("YOUR_CLIENT_ID", "YOUR_CLIENT_SECRET")),
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(!config.is_trakt_configured());

        config.trakt = Some(trakt("real_id", "real_secret"));
        assert!(config.validate().is_ok());
        assert!(config.is_trakt_configured());

        config.sync.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_trakt_section_fails_validation() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }
}
