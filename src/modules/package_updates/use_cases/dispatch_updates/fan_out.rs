// Isolated fan-out of one event batch to every registered handler.
//
// Purpose
// - Run each handler's `process` as its own task so an error or a panic in one
//   handler never reaches its siblings or the polling loop.
//
// Responsibilities
// - Share the batch read-only between handlers.
// - Join every handler and report who delivered and who failed.
// - Never cancel a running handler and never impose a timeout.

use crate::modules::package_updates::core::events::UpdateEvent;
use crate::modules::package_updates::core::ports::UpdateHandler;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

/// The explicit handler list built once at startup.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Arc<[Arc<dyn UpdateHandler>]>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Arc<dyn UpdateHandler>>) -> Self {
        Self {
            handlers: handlers.into(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

pub async fn fan_out(registry: &HandlerRegistry, batch: Arc<[UpdateEvent]>) -> DispatchReport {
    let mut tasks = JoinSet::new();
    for handler in registry.handlers.iter().cloned() {
        let batch = batch.clone();
        let span = tracing::info_span!("handler", name = handler.name());
        tasks.spawn(
            async move {
                let name = handler.name().to_string();
                let outcome = AssertUnwindSafe(handler.process(&batch))
                    .catch_unwind()
                    .await;
                (name, outcome)
            }
            .instrument(span),
        );
    }

    let mut report = DispatchReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(Ok(())))) => report.delivered.push(name),
            Ok((name, Ok(Err(err)))) => {
                tracing::error!(handler = %name, error = ?err, "handler failed");
                report.failed.push(name);
            }
            Ok((name, Err(_panic))) => {
                tracing::error!(handler = %name, "handler panicked");
                report.failed.push(name);
            }
            Err(err) => tracing::error!(error = %err, "handler task did not complete"),
        }
    }
    report.delivered.sort();
    report.failed.sort();
    tracing::info!(
        events = batch.len(),
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "dispatch finished"
    );
    report
}

/// Launch `fan_out` detached from the caller; the caller may drop the handle.
pub fn dispatch_detached(registry: &HandlerRegistry, batch: Vec<UpdateEvent>) -> JoinHandle<DispatchReport> {
    let registry = registry.clone();
    let batch: Arc<[UpdateEvent]> = batch.into();
    tokio::spawn(async move { fan_out(&registry, batch).await }.in_current_span())
}
