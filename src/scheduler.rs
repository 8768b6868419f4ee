//! Scheduler: fires the four reconcilers at fixed cadences, each
//! single-instance (skip-if-busy, not queue), and a daily log cleanup.

use crate::config::Config;
use crate::finalization_service::FinalizationService;
use crate::store::Store;
use crate::sync_service::SyncService;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Scheduler {
    sync: Arc<SyncService>,
    finalization: Arc<FinalizationService>,
    store: Arc<dyn Store>,
    sync_interval: Duration,
    dispute_sweep_interval: Duration,
    finalization_sweep_interval: Duration,
    stale_proposal_sweep_interval: Duration,
    log_cleanup_interval: Duration,
    log_retention: chrono::Duration,
}

impl Scheduler {
    pub fn new(
        sync: Arc<SyncService>,
        finalization: Arc<FinalizationService>,
        store: Arc<dyn Store>,
        config: &Config,
    ) -> Self {
        Self {
            sync,
            finalization,
            store,
            sync_interval: Duration::from_secs(config.sync_interval_secs),
            dispute_sweep_interval: Duration::from_secs(config.dispute_sweep_interval_secs),
            finalization_sweep_interval: Duration::from_secs(config.finalization_sweep_interval_secs),
            stale_proposal_sweep_interval: Duration::from_secs(config.stale_proposal_sweep_interval_secs),
            log_cleanup_interval: Duration::from_secs(config.log_cleanup_interval_secs),
            log_retention: chrono::Duration::days(config.log_retention_days),
        }
    }

    /// Spawns the five periodic jobs; each runs until `cancel` fires.
    pub fn spawn_all(self: Arc<Self>, cancel: CancellationToken) {
        spawn_job("market_sync", self.sync_interval, cancel.clone(), {
            let sync = self.sync.clone();
            move || {
                let sync = sync.clone();
                async move {
                    if let Err(e) = sync.sweep().await {
                        tracing::error!(error = %e, job = "market_sync", "sweep failed");
                    }
                }
            }
        });

        spawn_job("dispute_window_sweep", self.dispute_sweep_interval, cancel.clone(), {
            let finalization = self.finalization.clone();
            move || {
                let finalization = finalization.clone();
                async move {
                    if let Err(e) = finalization.check_dispute_windows().await {
                        tracing::error!(error = %e, job = "dispute_window_sweep", "sweep failed");
                    }
                }
            }
        });

        spawn_job("finalization_sweep", self.finalization_sweep_interval, cancel.clone(), {
            let finalization = self.finalization.clone();
            move || {
                let finalization = finalization.clone();
                async move {
                    if let Err(e) = finalization.run_sweep().await {
                        tracing::error!(error = %e, job = "finalization_sweep", "sweep failed");
                    }
                }
            }
        });

        spawn_job("stale_proposal_sweep", self.stale_proposal_sweep_interval, cancel.clone(), {
            let finalization = self.finalization.clone();
            move || {
                let finalization = finalization.clone();
                async move {
                    if let Err(e) = finalization.check_old_proposals().await {
                        tracing::error!(error = %e, job = "stale_proposal_sweep", "sweep failed");
                    }
                }
            }
        });

        spawn_job("log_cleanup", self.log_cleanup_interval, cancel, {
            let store = self.store.clone();
            let retention = self.log_retention;
            move || {
                let store = store.clone();
                async move {
                    let cutoff = chrono::Utc::now() - retention;
                    match store.delete_old_sync_log(cutoff).await {
                        Ok(deleted) if deleted > 0 => {
                            tracing::info!(job = "log_cleanup", deleted, "pruned old sync log rows");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, job = "log_cleanup", "cleanup failed"),
                    }
                }
            }
        });
    }
}

/// Runs `make_tick()` on a fixed interval in its own task, skipping a tick if
/// the previous invocation of this same job is still in flight, until
/// `cancel` fires.
fn spawn_job<F, Fut>(name: &'static str, interval: Duration, cancel: CancellationToken, make_tick: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let busy = Arc::new(AtomicBool::new(false));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(job = name, "scheduler job stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if busy.swap(true, Ordering::SeqCst) {
                        tracing::debug!(job = name, "previous tick still running, skipping");
                        continue;
                    }
                    let busy = busy.clone();
                    let tick = make_tick();
                    tokio::spawn(async move {
                        tick.await;
                        busy.store(false, Ordering::SeqCst);
                    });
                }
            }
        }
    });
}
