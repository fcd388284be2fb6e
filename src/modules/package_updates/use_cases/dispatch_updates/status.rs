use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub cycles_completed: u64,
    pub last_cycle_id: Option<Uuid>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_batch_size: usize,
    pub failure_watermark: String,
    pub handlers: Vec<String>,
}

/// Progress of the polling loop, readable from the status endpoint.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: RwLock<StatusSnapshot>,
}

impl StatusBoard {
    pub fn new(handlers: Vec<String>) -> Self {
        Self {
            inner: RwLock::new(StatusSnapshot {
                handlers,
                ..StatusSnapshot::default()
            }),
        }
    }

    pub async fn record_cycle(&self, cycle_id: Uuid, batch_size: usize, failure_watermark: &str) {
        let mut guard = self.inner.write().await;
        guard.cycles_completed += 1;
        guard.last_cycle_id = Some(cycle_id);
        guard.last_cycle_at = Some(Utc::now());
        guard.last_batch_size = batch_size;
        guard.failure_watermark = failure_watermark.to_string();
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().await.clone()
    }
}
