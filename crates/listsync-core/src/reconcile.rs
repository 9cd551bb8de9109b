use listsync_models::{MediaItem, MediaKind, RemoteList};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, instrument};
use crate::dedup::StableKey;
use crate::engine::SyncEngine;
use crate::error::SyncResult;

/// What has to change for `actual` to match `desired`
#[derive(Debug, Clone, PartialEq)]
pub struct ListDiff<T> {
    pub to_add: Vec<T>,
    pub to_remove: Vec<T>,
}

impl<T: StableKey + Clone> ListDiff<T> {
    /// Items compare by stable key; both sides keep their input order.
    pub fn compute(desired: &[T], actual: &[T]) -> Self {
        let desired_keys: HashSet<T::Key> = desired.iter().map(T::stable_key).collect();
        let actual_keys: HashSet<T::Key> = actual.iter().map(T::stable_key).collect();

        let to_add = desired
            .iter()
            .filter(|item| !actual_keys.contains(&item.stable_key()))
            .cloned()
            .collect();
        let to_remove = actual
            .iter()
            .filter(|item| !desired_keys.contains(&item.stable_key()))
            .cloned()
            .collect();

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub list: String,
    pub kind: Option<MediaKind>,
    /// Items the filter currently matches
    pub desired: usize,
    /// Items the list held before this run
    pub actual: usize,
    pub to_add: usize,
    pub to_remove: usize,
    /// What the remote reported as actually changed
    pub added: usize,
    pub removed: usize,
    pub not_found: usize,
    pub dry_run: bool,
}

impl ReconcileReport {
    pub fn is_unchanged(&self) -> bool {
        self.to_add == 0 && self.to_remove == 0
    }
}

/// Brings a list's contents in line with what its filter matches
pub struct ListReconciler<'a> {
    engine: &'a SyncEngine,
    dry_run: bool,
}

impl<'a> ListReconciler<'a> {
    pub fn new(engine: &'a SyncEngine) -> Self {
        Self { engine, dry_run: false }
    }

    /// Compute diffs without touching the remote list
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Issues at most one add batch and one remove batch
    pub async fn apply(&self, list: &RemoteList, diff: &ListDiff<MediaItem>) -> SyncResult<ReconcileReport> {
        let mut report = ReconcileReport {
            list: list.label().to_string(),
            to_add: diff.to_add.len(),
            to_remove: diff.to_remove.len(),
            dry_run: self.dry_run,
            ..ReconcileReport::default()
        };
        if self.dry_run {
            return Ok(report);
        }

        if !diff.to_add.is_empty() {
            let outcome = self.engine.add_items(list, &diff.to_add).await?;
            report.added = outcome.changed;
            report.not_found += outcome.not_found;
        }
        if !diff.to_remove.is_empty() {
            let outcome = self.engine.remove_items(list, &diff.to_remove).await?;
            report.removed = outcome.changed;
            report.not_found += outcome.not_found;
        }
        Ok(report)
    }

    /// Search, read current contents, diff, apply
    #[instrument(skip(self, list), fields(list = %list.label(), kind = %list.item_kind))]
    pub async fn reconcile(&self, list: &RemoteList) -> SyncResult<ReconcileReport> {
        let kind = list.item_kind;
        let desired = self.engine.search(list, kind).await?;
        let actual = self.engine.get_items(list, kind).await?;
        let diff = ListDiff::compute(&desired, &actual);

        let mut report = self.apply(list, &diff).await?;
        report.kind = Some(kind);
        report.desired = desired.len();
        report.actual = actual.len();

        info!(
            desired = report.desired,
            actual = report.actual,
            to_add = report.to_add,
            to_remove = report.to_remove,
            dry_run = self.dry_run,
            "Reconciled list"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{created_list, engine, movie, movies, show, FakeApi};
    use std::sync::Arc;

    #[test]
    fn test_diff_adds_missing_and_removes_extra() {
        let (a, b, c, d) = (movie(1), movie(2), movie(3), movie(4));
        let diff = ListDiff::compute(&[a.clone(), b.clone(), c.clone()], &[b, c, d.clone()]);
        assert_eq!(diff.to_add, vec![a]);
        assert_eq!(diff.to_remove, vec![d]);
    }

    #[test]
    fn test_identical_sets_yield_empty_diff() {
        let items = movies(1..6);
        let mut shuffled = items.clone();
        shuffled.reverse();
        let diff = ListDiff::compute(&items, &shuffled);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_compares_by_key_not_title() {
        let mut renamed = movie(1);
        renamed.title = "Renamed upstream".to_string();
        let diff = ListDiff::compute(&[movie(1)], &[renamed]);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_preserves_order() {
        let desired = vec![movie(5), movie(3), movie(9), movie(1)];
        let diff = ListDiff::compute(&desired, &[movie(3)]);
        let ids: Vec<u64> = diff.to_add.iter().map(|m| m.ids.trakt).collect();
        assert_eq!(ids, vec![5, 9, 1]);
    }

    #[tokio::test]
    async fn test_reconcile_converges_list() {
        let api = Arc::new(
            FakeApi::new()
                .with_search_pages(MediaKind::Movie, vec![vec![movie(1), movie(2), movie(3)]])
                .with_list(1, "mine", vec![movie(2), movie(3), movie(4)]),
        );
        let engine = engine(api.clone());
        let list = created_list(1, "mine", MediaKind::Movie);

        let report = ListReconciler::new(&engine).reconcile(&list).await.unwrap();
        assert_eq!(report.desired, 3);
        assert_eq!(report.actual, 3);
        assert_eq!((report.to_add, report.to_remove), (1, 1));
        assert_eq!((report.added, report.removed), (1, 1));

        let mut ids: Vec<u64> = api.contents(1).iter().map(|m| m.ids.trakt).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_reconcile_in_sync_list_makes_no_batch_calls() {
        let api = Arc::new(
            FakeApi::new()
                .with_search_pages(MediaKind::Show, vec![vec![show(1)]])
                .with_list(1, "shows", vec![show(1)]),
        );
        let engine = engine(api.clone());

        let report = ListReconciler::new(&engine)
            .reconcile(&created_list(1, "shows", MediaKind::Show))
            .await
            .unwrap();
        assert!(report.is_unchanged());
        assert_eq!(api.count("add_items") + api.count("remove_items"), 0);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_list_untouched() {
        let api = Arc::new(
            FakeApi::new()
                .with_search_pages(MediaKind::Movie, vec![vec![movie(1)]])
                .with_list(1, "mine", vec![movie(2)]),
        );
        let engine = engine(api.clone());

        let report = ListReconciler::new(&engine)
            .dry_run(true)
            .reconcile(&created_list(1, "mine", MediaKind::Movie))
            .await
            .unwrap();
        assert!(report.dry_run);
        assert_eq!((report.to_add, report.to_remove), (1, 1));
        assert_eq!((report.added, report.removed), (0, 0));
        assert_eq!(api.contents(1), vec![movie(2)]);
    }
}
