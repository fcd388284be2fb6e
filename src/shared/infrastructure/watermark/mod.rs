// Watermark persistence for incremental consumers.
//
// Purpose
// - Remember the last processed position of a named consumer across restarts.
//
// Responsibilities
// - `get` returns None when nothing was stored yet.
// - `set` overwrites the stored value wholesale.

use async_trait::async_trait;

#[async_trait]
pub trait WatermarkRepository: Send + Sync {
    async fn get(&self, name: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, name: &str, last: &str) -> anyhow::Result<()>;
}

pub mod file;
pub mod in_memory;
