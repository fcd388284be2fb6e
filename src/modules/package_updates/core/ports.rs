// Ports define what the core needs from the outside world, without implementing it.
//
// Purpose
// - Describe the repository metadata source, the failure log, the notification
//   handlers and the health signal as traits.
//
// Boundaries
// - No concrete input or output here. Adapters implement these traits in the adapters layer.
//
// Testing guidance
// - In memory implementations live in adapters::outbound::in_memory.

use crate::modules::package_updates::core::events::UpdateEvent;
use crate::modules::package_updates::core::package::PackageRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("no server configured for {0}")]
    NoServer(String),

    #[error("unreadable database {name}: {reason}")]
    Parse { name: String, reason: String },

    #[error("cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum LogFetchError {
    #[error("{status}, message={message:?}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// One repository database, e.g. `core` for a given architecture.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &str;
    fn servers(&self) -> &[String];
    /// Re-download the database. A failure leaves the cached package set undefined.
    async fn refresh(&self) -> Result<(), SyncError>;
    async fn current_packages(&self) -> Vec<PackageRecord>;
}

#[async_trait]
pub trait FailureLogSource: Send + Sync {
    /// Raw log text; an empty string means the log is absent.
    async fn fetch(&self) -> Result<String, LogFetchError>;
}

/// A notification backend. Failures are local to the handler.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    fn name(&self) -> &str;
    async fn process(&self, events: &[UpdateEvent]) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Up,
    Down,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Up => "up",
            HealthStatus::Down => "down",
        }
    }
}

#[async_trait]
pub trait HealthSignal: Send + Sync {
    async fn push(&self, status: HealthStatus, message: &str) -> anyhow::Result<()>;
}
