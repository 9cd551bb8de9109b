use super::sync_ui::SyncUI;
use super::{build_engine, load_config, load_registry, save_registry};
use crate::output::{styled_table, Output};
use color_eyre::Result;
use comfy_table::Cell;
use listsync_config::PathManager;
use listsync_core::{ListProcessor, ProcessOutcome};
use owo_colors::OwoColorize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Which stored lists a run covers
#[derive(Debug, Clone, Copy)]
pub enum Selection {
    /// Flagged lists whose last run is older than the processing interval
    Due,
    /// One list, due or not
    One(u64),
}

/// Processes the selected lists and records each successful run in `lists.toml`.
pub async fn process_registry(
    processor: &ListProcessor,
    path_manager: &PathManager,
    interval: chrono::Duration,
    selection: Selection,
    dry_run: bool,
) -> Result<Vec<ProcessOutcome>> {
    let registry = load_registry(path_manager)?;
    let lists = match selection {
        Selection::Due => registry.due(chrono::Utc::now(), interval),
        Selection::One(id) => {
            let list = registry
                .get(id)
                .cloned()
                .ok_or_else(|| color_eyre::eyre::eyre!("No managed list with id {}. See 'listsync lists show'.", id))?;
            vec![list]
        }
    };

    let outcomes = processor.process(lists).await;

    if !dry_run && outcomes.iter().any(ProcessOutcome::is_success) {
        // Re-read so edits made while this run was in flight are kept
        let mut registry = load_registry(path_manager)?;
        for outcome in outcomes.iter().filter(|o| o.is_success()) {
            if let (Some(id), Some(at)) = (outcome.list.id, outcome.list.last_processed) {
                registry.mark_processed(id, at);
            }
        }
        save_registry(&registry, path_manager)?;
    }

    Ok(outcomes)
}

pub async fn run_sync(list: Option<u64>, dry_run: bool, output: &Output) -> Result<()> {
    tracing::debug!("Sync command started");

    let path_manager = PathManager::default();
    let config = load_config(&path_manager)?;
    let engine = build_engine(&config, &path_manager)?;
    let processor = ListProcessor::new(Arc::new(engine), config.sync.max_concurrent_lists).dry_run(dry_run);

    if let Some(id) = list {
        if let Some(stored) = load_registry(&path_manager)?.get(id) {
            if !stored.process {
                output.warn(format!("Processing is disabled for '{}'; nothing to do.", stored.name));
            }
        }
    }

    let selection = list.map(Selection::One).unwrap_or(Selection::Due);
    let interval = chrono::Duration::hours(config.sync.process_interval_hours);

    let ui = SyncUI::new(output.is_human() && !output.is_quiet());
    ui.set_message(if dry_run { "Computing changes (dry run)..." } else { "Reconciling lists..." });
    let start = Instant::now();
    let outcomes = process_registry(&processor, &path_manager, interval, selection, dry_run).await;
    ui.finish();
    let outcomes = outcomes?;

    report_outcomes(&outcomes, dry_run, output);

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        return Err(color_eyre::eyre::eyre!("{} of {} lists failed", failed, outcomes.len()));
    }
    if outcomes.is_empty() {
        output.info("No lists are due for processing.");
    } else {
        output.success(format!("Processed {} lists in {:.1?}", outcomes.len(), start.elapsed()));
    }
    Ok(())
}

pub fn report_outcomes(outcomes: &[ProcessOutcome], dry_run: bool, output: &Output) {
    if !output.is_human() {
        let results: Vec<_> = outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(report) => json!({
                    "success": true,
                    "id": outcome.list.id,
                    "report": report,
                }),
                Err(e) => json!({
                    "success": false,
                    "id": outcome.list.id,
                    "list": outcome.list.label(),
                    "error": e.to_string(),
                }),
            })
            .collect();
        output.json(&json!({ "dry_run": dry_run, "lists": results }));
        return;
    }

    if outcomes.is_empty() {
        return;
    }

    let mut table = styled_table();
    let (add_header, remove_header) = if dry_run { ("Would add", "Would remove") } else { ("Added", "Removed") };
    table.set_header(vec!["List", "Kind", "Matches", "Current", add_header, remove_header, "Status"]);
    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                let (added, removed) = if dry_run {
                    (report.to_add, report.to_remove)
                } else {
                    (report.added, report.removed)
                };
                table.add_row(vec![
                    Cell::new(outcome.list.label()),
                    Cell::new(outcome.list.item_kind),
                    Cell::new(report.desired),
                    Cell::new(report.actual),
                    Cell::new(format!("+{}", added)),
                    Cell::new(format!("-{}", removed)),
                    Cell::new("✓".green().to_string()),
                ]);
            }
            Err(e) => {
                table.add_row(vec![
                    Cell::new(outcome.list.label()),
                    Cell::new(outcome.list.item_kind),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("✗".red().to_string()),
                ]);
                output.error(format!("{}: {}", outcome.list.label(), e));
            }
        }
    }
    output.table(&table);
}
