// In memory implementations of the package_updates ports.
//
// Purpose
// - Support engine tests and local experiments without network access.
//
// Responsibilities
// - InMemoryMetadataSource: serve staged package lists, one per refresh.
// - StaticFailureLog: serve a fixed failure log.
// - RecordingHandler / RecordingHealth: remember what they were asked to deliver.

use crate::modules::package_updates::core::events::UpdateEvent;
use crate::modules::package_updates::core::package::PackageRecord;
use crate::modules::package_updates::core::ports::{
    FailureLogSource, HealthSignal, HealthStatus, LogFetchError, MetadataSource, SyncError,
    UpdateHandler,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

pub struct InMemoryMetadataSource {
    name: String,
    servers: Vec<String>,
    current: RwLock<Vec<PackageRecord>>,
    staged: Mutex<VecDeque<Vec<PackageRecord>>>,
    offline: AtomicBool,
}

impl InMemoryMetadataSource {
    pub fn new(name: impl Into<String>, initial: Vec<PackageRecord>) -> Self {
        let name = name.into();
        Self {
            servers: vec![format!("memory://{name}")],
            name,
            current: RwLock::new(initial),
            staged: Mutex::new(VecDeque::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Queue the package list the next refresh will install.
    pub async fn stage(&self, packages: Vec<PackageRecord>) {
        self.staged.lock().await.push_back(packages);
    }

    pub fn toggle_offline(&self) {
        self.offline.fetch_xor(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetadataSource for InMemoryMetadataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn servers(&self) -> &[String] {
        &self.servers
    }

    async fn refresh(&self) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Backend("Metadata source offline".into()));
        }
        if let Some(next) = self.staged.lock().await.pop_front() {
            *self.current.write().await = next;
        }
        Ok(())
    }

    async fn current_packages(&self) -> Vec<PackageRecord> {
        self.current.read().await.clone()
    }
}

pub struct StaticFailureLog {
    text: String,
    offline: bool,
}

impl StaticFailureLog {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offline: false,
        }
    }

    pub fn toggle_offline(&mut self) {
        self.offline = !self.offline;
    }
}

#[async_trait]
impl FailureLogSource for StaticFailureLog {
    async fn fetch(&self) -> Result<String, LogFetchError> {
        if self.offline {
            return Err(LogFetchError::Transport("Failure log offline".into()));
        }
        Ok(self.text.clone())
    }
}

/// Handler that keeps every batch it receives.
#[derive(Default)]
pub struct RecordingHandler {
    name: String,
    batches: Mutex<Vec<Vec<UpdateEvent>>>,
    delay: Option<Duration>,
    offline: bool,
}

impl RecordingHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn toggle_offline(&mut self) {
        self.offline = !self.offline;
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Some(delay);
    }

    pub async fn batches(&self) -> Vec<Vec<UpdateEvent>> {
        self.batches.lock().await.clone()
    }
}

#[async_trait]
impl UpdateHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, events: &[UpdateEvent]) -> anyhow::Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline {
            anyhow::bail!("{} offline", self.name);
        }
        self.batches.lock().await.push(events.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingHealth {
    pushes: Mutex<Vec<(HealthStatus, String)>>,
}

impl RecordingHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pushes(&self) -> Vec<(HealthStatus, String)> {
        self.pushes.lock().await.clone()
    }
}

#[async_trait]
impl HealthSignal for RecordingHealth {
    async fn push(&self, status: HealthStatus, message: &str) -> anyhow::Result<()> {
        self.pushes.lock().await.push((status, message.to_string()));
        Ok(())
    }
}
