// Failure tracker consumes the build-failure log incrementally, emits Failed
// events for lines not seen before and advances the watermark.
//
// Purpose
// - Guarantee at-most-once reporting of failure lines across restarts.
//
// Responsibilities
// - Read the watermark once at startup; keep it in memory afterwards.
// - Advance the watermark even for stale lines so nothing blocks progress.
// - Treat a missing log or a failed watermark write as non-fatal.

use crate::modules::package_updates::core::failures::{FailureSelection, select_failures};
use crate::modules::package_updates::core::package::PackageSnapshot;
use crate::modules::package_updates::core::ports::FailureLogSource;
use crate::shared::infrastructure::watermark::WatermarkRepository;
use std::sync::Arc;

pub const FAILURE_WATERMARK: &str = "ftbfs";

pub struct FailureLogTracker {
    name: String,
    source: Arc<dyn FailureLogSource>,
    watermark_repository: Arc<dyn WatermarkRepository>,
    watermark: String,
}

impl FailureLogTracker {
    pub async fn load(
        name: impl Into<String>,
        source: Arc<dyn FailureLogSource>,
        watermark_repository: Arc<dyn WatermarkRepository>,
    ) -> Self {
        let name = name.into();
        let watermark = match watermark_repository.get(&name).await {
            Ok(stored) => stored.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "could not read {name} watermark, processing the whole log");
                String::new()
            }
        };
        tracing::debug!(%watermark, "{name} watermark loaded");
        Self {
            name,
            source,
            watermark_repository,
            watermark,
        }
    }

    pub fn watermark(&self) -> &str {
        &self.watermark
    }

    /// Fetch the log and select new failures against `after`'s build dates.
    pub async fn poll(&self, after: &PackageSnapshot) -> FailureSelection {
        match self.source.fetch().await {
            Ok(raw_log) => self.ingest(&raw_log, after),
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch the FTBFS log");
                self.unchanged()
            }
        }
    }

    pub fn ingest(&self, raw_log: &str, after: &PackageSnapshot) -> FailureSelection {
        if raw_log.trim().is_empty() {
            tracing::warn!("No FTBFS log found");
            return self.unchanged();
        }
        select_failures(raw_log, &self.watermark, |pkgbase| after.pkgbase_build_date(pkgbase))
    }

    /// Persist the watermark of a selection. Write failures are only logged;
    /// the in-memory watermark advances regardless.
    pub async fn commit(&mut self, selection: &FailureSelection) {
        if !selection.advanced_from(&self.watermark) {
            return;
        }
        self.watermark = selection.watermark.clone();
        if let Err(err) = self
            .watermark_repository
            .set(&self.name, &self.watermark)
            .await
        {
            tracing::error!(error = %err, watermark = %self.watermark, "failed to persist {} watermark", self.name);
        }
    }

    fn unchanged(&self) -> FailureSelection {
        FailureSelection {
            watermark: self.watermark.clone(),
            ..FailureSelection::default()
        }
    }
}
