// File-backed watermark store: one `<name>.log` text file per consumer.
//
// Writes go to a sibling temp file and are renamed into place, so a crash
// mid-write leaves the previous watermark intact.

use crate::shared::infrastructure::watermark::WatermarkRepository;
use anyhow::Context;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileWatermarks {
    dir: PathBuf,
}

impl FileWatermarks {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.log"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl WatermarkRepository for FileWatermarks {
    async fn get(&self, name: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn set(&self, name: &str, last: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(name);
        let tmp = path.with_extension("log.tmp");
        tokio::fs::write(&tmp, last)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}
