use crate::shared::infrastructure::watermark::WatermarkRepository;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryWatermarks {
    inner: RwLock<HashMap<String, String>>,
    offline: bool,
}

impl InMemoryWatermarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.offline = !self.offline;
    }
}

#[async_trait::async_trait]
impl WatermarkRepository for InMemoryWatermarks {
    async fn get(&self, name: &str) -> anyhow::Result<Option<String>> {
        if self.offline {
            anyhow::bail!("Watermark repository offline");
        }
        Ok(self.inner.read().await.get(name).cloned())
    }

    async fn set(&self, name: &str, last: &str) -> anyhow::Result<()> {
        if self.offline {
            anyhow::bail!("Watermark repository offline");
        }
        self.inner
            .write()
            .await
            .insert(name.to_string(), last.to_string());
        Ok(())
    }
}
