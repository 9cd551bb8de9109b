use chrono::Utc;
use futures::stream::{self, StreamExt};
use listsync_models::{ListState, RemoteList};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::reconcile::{ListReconciler, ReconcileReport};

/// Result of one list's run. `list` carries the updated `last_processed`
/// on success and is returned unchanged on failure.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub list: RemoteList,
    pub result: Result<ReconcileReport, SyncError>,
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Lists a run may touch: flagged for processing and already created remotely
pub fn processable(lists: Vec<RemoteList>) -> Vec<RemoteList> {
    lists
        .into_iter()
        .filter(|list| list.process && list.id.is_some() && list.slug.is_some())
        .collect()
}

/// Reconciles many lists, a bounded number at a time.
///
/// Each list resolves its owner's credential on its own, so one list's
/// expired grant does not affect the others.
pub struct ListProcessor {
    engine: Arc<SyncEngine>,
    max_concurrent: usize,
    dry_run: bool,
}

impl ListProcessor {
    pub fn new(engine: Arc<SyncEngine>, max_concurrent: usize) -> Self {
        Self {
            engine,
            max_concurrent: max_concurrent.max(1),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn process(&self, lists: Vec<RemoteList>) -> Vec<ProcessOutcome> {
        let lists = processable(lists);
        if lists.is_empty() {
            info!("No lists to process");
            return Vec::new();
        }

        let start = Instant::now();
        info!(lists = lists.len(), max_concurrent = self.max_concurrent, dry_run = self.dry_run, "Processing lists");

        let outcomes: Vec<ProcessOutcome> = stream::iter(lists)
            .map(|list| self.process_one(list))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        info!(
            processed = outcomes.len(),
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Finished processing lists"
        );
        outcomes
    }

    async fn process_one(&self, mut list: RemoteList) -> ProcessOutcome {
        info!(list = list.label(), state = %ListState::Processing, "Processing list");
        let reconciler = ListReconciler::new(&self.engine).dry_run(self.dry_run);

        match reconciler.reconcile(&list).await {
            Ok(report) => {
                if !self.dry_run {
                    list.last_processed = Some(Utc::now());
                }
                info!(
                    list = list.label(),
                    state = %ListState::Updated,
                    added = report.added,
                    removed = report.removed,
                    "List processed"
                );
                ProcessOutcome { list, result: Ok(report) }
            }
            Err(e) => {
                warn!(list = list.label(), error = %e, "List processing failed; it stays due for the next run");
                ProcessOutcome { list, result: Err(e) }
            }
        }
    }
}
