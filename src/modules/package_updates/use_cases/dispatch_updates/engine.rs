// Dispatch engine drives the polling loop.
//
// Purpose
// - Poll every repository source, derive update and failure events, and hand
//   the combined batch to the registered handlers.
//
// Responsibilities
// - Capture before/after snapshots around a sequential refresh of all sources.
// - Stop with EngineError when a refresh fails; nothing else is fatal.
// - Dispatch detached: handlers never delay the watermark commit or the next poll.
//
// Ordering
// - Within a batch, update events precede failure events and every handler sees
//   the batch in that order. Batches of consecutive cycles may overlap in time
//   for a slow handler.

use crate::modules::package_updates::core::derive::derive_updates;
use crate::modules::package_updates::core::package::PackageSnapshot;
use crate::modules::package_updates::core::ports::{
    HealthSignal, HealthStatus, MetadataSource, SyncError,
};
use crate::modules::package_updates::use_cases::dispatch_updates::fan_out::{
    DispatchReport, HandlerRegistry, dispatch_detached,
};
use crate::modules::package_updates::use_cases::dispatch_updates::status::StatusBoard;
use crate::modules::package_updates::use_cases::track_failures::tracker::FailureLogTracker;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("refresh of {source_name} failed: {source}")]
    Refresh {
        source_name: String,
        #[source]
        source: SyncError,
    },
}

/// What to do when the very first snapshot has nothing to diff against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPolicy {
    /// Take the first snapshot as the baseline without emitting events.
    Seed,
    /// Announce every package of the first snapshot as New.
    Announce,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub interval: Duration,
    pub bootstrap: BootstrapPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            bootstrap: BootstrapPolicy::Seed,
        }
    }
}

pub struct CycleReport {
    pub cycle_id: Uuid,
    pub updates: usize,
    pub failures: usize,
    /// Handle of the detached dispatch; `None` when the batch was empty.
    pub dispatch: Option<JoinHandle<DispatchReport>>,
}

pub struct DispatchEngine {
    sources: Vec<Arc<dyn MetadataSource>>,
    tracker: FailureLogTracker,
    handlers: HandlerRegistry,
    health: Option<Arc<dyn HealthSignal>>,
    status: Arc<StatusBoard>,
    config: EngineConfig,
    bootstrapped: bool,
}

impl DispatchEngine {
    pub fn new(
        sources: Vec<Arc<dyn MetadataSource>>,
        tracker: FailureLogTracker,
        handlers: HandlerRegistry,
        config: EngineConfig,
    ) -> Self {
        let status = Arc::new(StatusBoard::new(handlers.names()));
        Self {
            sources,
            tracker,
            handlers,
            health: None,
            status,
            config,
            bootstrapped: false,
        }
    }

    pub fn with_health_signal(mut self, health: Arc<dyn HealthSignal>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn status(&self) -> Arc<StatusBoard> {
        self.status.clone()
    }

    /// Poll forever. Returns only when a repository refresh fails.
    pub async fn run(mut self) -> Result<(), EngineError> {
        loop {
            self.run_cycle().await?;
            tokio::time::sleep(self.config.interval).await;
        }
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport, EngineError> {
        let cycle_id = Uuid::now_v7();
        let span = tracing::info_span!("cycle", %cycle_id);
        self.cycle(cycle_id).instrument(span).await
    }

    async fn cycle(&mut self, cycle_id: Uuid) -> Result<CycleReport, EngineError> {
        let before = self.snapshot().await;
        self.refresh_all().await?;
        let after = self.snapshot().await;

        let updates = if !self.bootstrapped
            && before.is_empty()
            && self.config.bootstrap == BootstrapPolicy::Seed
        {
            tracing::info!(packages = after.len(), "no previous snapshot, seeding without events");
            Vec::new()
        } else {
            derive_updates(&before, &after)
        };
        drop(before);
        self.bootstrapped = true;

        let mut failures = self.tracker.poll(&after).await;
        let (update_count, failure_count) = (updates.len(), failures.events.len());

        let mut batch = updates;
        batch.append(&mut failures.events);
        let batch_size = batch.len();
        let dispatch = if batch.is_empty() {
            tracing::debug!("No update");
            None
        } else {
            tracing::info!("{batch_size} update(s)");
            Some(dispatch_detached(&self.handlers, batch))
        };

        self.tracker.commit(&failures).await;
        self.status
            .record_cycle(cycle_id, batch_size, self.tracker.watermark())
            .await;
        self.signal(HealthStatus::Up, "OK").await;

        Ok(CycleReport {
            cycle_id,
            updates: update_count,
            failures: failure_count,
            dispatch,
        })
    }

    async fn refresh_all(&self) -> Result<(), EngineError> {
        for source in &self.sources {
            tracing::info!("Syncing {}...", source.name());
            if let Err(source_error) = source.refresh().await {
                let error = EngineError::Refresh {
                    source_name: source.name().to_string(),
                    source: source_error,
                };
                tracing::error!(error = %error, "repository refresh failed");
                self.signal(HealthStatus::Down, &error.to_string()).await;
                return Err(error);
            }
        }
        Ok(())
    }

    async fn snapshot(&self) -> PackageSnapshot {
        let mut per_source = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            per_source.push(source.current_packages().await);
        }
        PackageSnapshot::merged(per_source)
    }

    async fn signal(&self, status: HealthStatus, message: &str) {
        if let Some(health) = &self.health {
            if let Err(err) = health.push(status, message).await {
                tracing::warn!(error = ?err, status = status.as_str(), "health push failed");
            }
        }
    }
}
