pub mod config;
pub mod daemon;
pub mod lists;
pub mod prompts;
pub mod sync;
pub mod sync_ui;

use color_eyre::Result;
use listsync_config::{Config, ListRegistry, PathManager};
use listsync_core::{EngineOptions, FileTokenStore, SyncEngine, TokenGate};
use listsync_models::UserRef;
use listsync_sources::{RetryPolicy, TraktClient};
use std::sync::Arc;
use std::time::Duration;

/// Loads and validates `config.toml`
pub fn load_config(path_manager: &PathManager) -> Result<Config> {
    let config_file = path_manager.config_file();
    if !config_file.exists() {
        return Err(color_eyre::eyre::eyre!(
            "Configuration file not found at {}. Run 'listsync config trakt' to set up your configuration.",
            config_file.display()
        ));
    }
    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Configuration validation failed: {}", e))?;
    Ok(config)
}

/// Trakt client with the timeout and retry settings from `[sync]`
pub fn build_client(config: &Config) -> Result<TraktClient> {
    let trakt = config
        .trakt
        .as_ref()
        .ok_or_else(|| color_eyre::eyre::eyre!("Trakt is not configured. Run 'listsync config trakt'."))?;
    let sync = &config.sync;

    Ok(TraktClient::new(trakt.client_id.clone(), trakt.client_secret.clone())
        .with_api_url(trakt.api_url.clone())
        .with_timeout(Duration::from_secs(sync.request_timeout_secs))
        .with_retry(RetryPolicy {
            max_retries: sync.max_retries,
            base_delay: Duration::from_millis(sync.retry_base_delay_ms),
            ..RetryPolicy::default()
        }))
}

/// Engine wired to Trakt and the credential file
pub fn build_engine(config: &Config, path_manager: &PathManager) -> Result<SyncEngine> {
    let client = Arc::new(build_client(config)?);
    let default_user = config
        .trakt
        .as_ref()
        .and_then(|trakt| trakt.default_user.clone())
        .map(UserRef::new);

    let store = Arc::new(FileTokenStore::new(path_manager.credentials_file()));
    let gate = TokenGate::new(store, client.clone()).with_default_user(default_user);

    Ok(SyncEngine::new(client, Arc::new(gate), EngineOptions::from(&config.sync)))
}

pub fn load_registry(path_manager: &PathManager) -> Result<ListRegistry> {
    let lists_file = path_manager.lists_file();
    let mut registry = ListRegistry::new(lists_file.clone());
    registry
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load lists from {}: {}", lists_file.display(), e))?;
    Ok(registry)
}

pub fn save_registry(registry: &ListRegistry, path_manager: &PathManager) -> Result<()> {
    registry
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save lists to {}: {}", path_manager.lists_file().display(), e))
}
