pub mod config;
pub mod credentials;
pub mod lists;
pub mod paths;

pub use config::{default_scheduler_config, Config, SchedulerConfig, SyncOptions, TraktConfig};
pub use credentials::CredentialStore;
pub use lists::ListRegistry;
pub use paths::{container_base_path, PathManager};
