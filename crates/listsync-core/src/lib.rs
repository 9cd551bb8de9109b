pub mod dedup;
pub mod engine;
pub mod error;
pub mod paging;
pub mod processor;
pub mod reconcile;
pub mod token_gate;

#[cfg(test)]
mod testing;

pub use dedup::{dedup_by_key, Deduplicator, StableKey};
pub use engine::{EngineOptions, SyncEngine, LIST_DESCRIPTION};
pub use error::{SyncError, SyncResult};
pub use paging::{fetch_all, walk_pages, PagePolicy};
pub use processor::{processable, ListProcessor, ProcessOutcome};
pub use reconcile::{ListDiff, ListReconciler, ReconcileReport};
pub use token_gate::{FileTokenStore, TokenGate, TokenStore};
