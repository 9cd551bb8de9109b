use super::sync::{process_registry, Selection};
use super::{build_engine, load_config};
use crate::output::Output;
use color_eyre::Result;
use listsync_config::{default_scheduler_config, PathManager, SchedulerConfig};
use listsync_core::ListProcessor;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// One scheduled pass over the due lists. Overlapping passes are skipped.
struct ScheduledRun {
    processor: ListProcessor,
    path_manager: PathManager,
    interval: chrono::Duration,
    running: Mutex<()>,
}

impl ScheduledRun {
    async fn run(&self, trigger: &'static str) {
        let Ok(_guard) = self.running.try_lock() else {
            warn!(operation = "scheduled_sync_skipped", trigger, "Previous run still in progress, skipping");
            return;
        };

        info!(operation = "scheduled_sync_start", trigger, "Starting scheduled run");
        let start = Instant::now();
        match process_registry(&self.processor, &self.path_manager, self.interval, Selection::Due, false).await {
            Ok(outcomes) => {
                let failed = outcomes.iter().filter(|o| !o.is_success()).count();
                for outcome in outcomes.iter() {
                    if let Err(e) = &outcome.result {
                        error!(operation = "list_failed", list = outcome.list.label(), error = %e, "List processing failed");
                    }
                }
                info!(
                    operation = "scheduled_sync_complete",
                    processed = outcomes.len(),
                    failed,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Scheduled run completed"
                );
            }
            Err(e) => {
                error!(operation = "scheduled_sync_error", error = %e, "Scheduled run failed");
            }
        }
    }
}

pub struct Scheduler {
    scheduler: JobScheduler,
    run: Arc<ScheduledRun>,
    config: SchedulerConfig,
}

impl Scheduler {
    async fn new(run: ScheduledRun, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            run: Arc::new(run),
            config,
        })
    }

    /// Runs until Ctrl-C
    async fn start(&mut self) -> Result<()> {
        if self.config.run_on_startup {
            info!(operation = "scheduler_startup", "Running initial pass on startup");
            self.run.run("startup").await;
        }

        let run = self.run.clone();
        let job = Job::new_async(self.config.schedule.as_str(), move |_id, _scheduler| {
            let run = run.clone();
            Box::pin(async move {
                run.run("schedule").await;
            })
        })
        .map_err(|e| color_eyre::eyre::eyre!("Invalid schedule '{}': {}", self.config.schedule, e))?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;
        info!(operation = "scheduler_started", schedule = %self.config.schedule, "Scheduler started");

        tokio::signal::ctrl_c().await?;
        info!(operation = "scheduler_stopping", "Shutdown requested, stopping scheduler");
        self.scheduler.shutdown().await?;
        Ok(())
    }
}

pub async fn run_daemon(schedule_override: Option<String>, no_startup_sync: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create directories: {}", e))?;
    let config = load_config(&path_manager)?;

    let defaults = default_scheduler_config();
    let from_file = config.scheduler.as_ref().unwrap_or(&defaults);
    let scheduler_config = SchedulerConfig {
        schedule: schedule_override.unwrap_or_else(|| from_file.schedule.clone()),
        run_on_startup: from_file.run_on_startup && !no_startup_sync,
    };

    let engine = build_engine(&config, &path_manager)?;
    let run = ScheduledRun {
        processor: ListProcessor::new(Arc::new(engine), config.sync.max_concurrent_lists),
        interval: chrono::Duration::hours(config.sync.process_interval_hours),
        path_manager,
        running: Mutex::new(()),
    };

    output.info(format!("Daemon started with schedule '{}'. Press Ctrl-C to stop.", scheduler_config.schedule));
    let mut scheduler = Scheduler::new(run, scheduler_config).await?;
    scheduler.start().await?;
    output.info("Daemon stopped.");
    Ok(())
}
