// Pacman sync database as a MetadataSource.
//
// Purpose
// - Download `<server>/<name>.db`, read the `desc` entry of every package and
//   keep the result as the source's current package list.
//
// Responsibilities
// - Try the configured servers in order; the first good download wins.
// - Keep the last good database under `<cache>/sync/<name>.db` so a restart
//   diffs against the previous run instead of an empty snapshot.
// - Leave the in-memory package list untouched when a refresh fails.
// - Ask for the database only if it changed since the cached copy
//   (`If-Modified-Since` from the cache mtime; 304 means unchanged).

use crate::modules::package_updates::core::package::PackageRecord;
use crate::modules::package_updates::core::ports::{MetadataSource, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use reqwest::StatusCode;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::RwLock;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

enum Fetched {
    Unchanged,
    Database {
        raw: Vec<u8>,
        last_modified: Option<SystemTime>,
    },
}

pub struct SyncDatabase {
    name: String,
    servers: Vec<String>,
    cache_path: PathBuf,
    client: reqwest::Client,
    packages: RwLock<Vec<PackageRecord>>,
}

impl SyncDatabase {
    /// Register `name` with the single server `<base_url>/<name>` and load any cached copy.
    pub async fn open(
        name: impl Into<String>,
        base_url: &str,
        cache_dir: &Path,
        client: reqwest::Client,
    ) -> Self {
        let name = name.into();
        let servers = vec![format!("{}/{}", base_url.trim_end_matches('/'), name)];
        Self::with_servers(name, servers, cache_dir, client).await
    }

    pub async fn with_servers(
        name: impl Into<String>,
        servers: Vec<String>,
        cache_dir: &Path,
        client: reqwest::Client,
    ) -> Self {
        let name = name.into();
        let cache_path = cache_dir.join("sync").join(format!("{name}.db"));
        let packages = match load_cache(&name, &cache_path).await {
            Ok(packages) => packages,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring cached {name} database");
                Vec::new()
            }
        };
        tracing::debug!(packages = packages.len(), "{name} database opened");
        Self {
            name,
            servers,
            cache_path,
            client,
            packages: RwLock::new(packages),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Modification time of the cached database, if its packages are loaded.
    async fn cached_since(&self) -> Option<SystemTime> {
        if self.packages.read().await.is_empty() {
            return None;
        }
        let metadata = tokio::fs::metadata(&self.cache_path).await.ok()?;
        metadata.modified().ok()
    }

    async fn download(&self, url: &str, since: Option<SystemTime>) -> Result<Fetched, SyncError> {
        let failed = |reason: String| SyncError::Download {
            url: url.to_string(),
            reason,
        };
        let mut request = self.client.get(url);
        if let Some(since) = since {
            let since = DateTime::<Utc>::from(since).format(HTTP_DATE).to_string();
            request = request.header(IF_MODIFIED_SINCE, since);
        }
        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| failed(err.to_string()))?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(Fetched::Unchanged);
        }
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(SystemTime::from);
        let bytes = response.bytes().await.map_err(|err| failed(err.to_string()))?;
        Ok(Fetched::Database {
            raw: bytes.to_vec(),
            last_modified,
        })
    }

    async fn store_cache(&self, raw: &[u8], last_modified: Option<SystemTime>) -> Result<(), SyncError> {
        if let Some(dir) = self.cache_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.cache_path.with_extension("db.part");
        tokio::fs::write(&tmp, raw).await?;
        if let Some(modified) = last_modified {
            let file = tokio::fs::OpenOptions::new().write(true).open(&tmp).await?;
            file.into_std().await.set_modified(modified)?;
        }
        tokio::fs::rename(&tmp, &self.cache_path).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataSource for SyncDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn servers(&self) -> &[String] {
        &self.servers
    }

    async fn refresh(&self) -> Result<(), SyncError> {
        let mut last_error = SyncError::NoServer(self.name.clone());
        let since = self.cached_since().await;
        for server in &self.servers {
            let url = format!("{server}/{}.db", self.name);
            let (raw, last_modified) = match self.download(&url, since).await {
                Ok(Fetched::Database { raw, last_modified }) => (raw, last_modified),
                Ok(Fetched::Unchanged) => {
                    tracing::debug!(%url, "{} is up to date", self.name);
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(error = %err, "trying next server");
                    last_error = err;
                    continue;
                }
            };
            let packages = parse_in_background(self.name.clone(), raw.clone()).await?;
            self.store_cache(&raw, last_modified).await?;
            tracing::debug!(packages = packages.len(), %url, "{} synced", self.name);
            *self.packages.write().await = packages;
            return Ok(());
        }
        Err(last_error)
    }

    async fn current_packages(&self) -> Vec<PackageRecord> {
        self.packages.read().await.clone()
    }
}

async fn load_cache(name: &str, path: &Path) -> Result<Vec<PackageRecord>, SyncError> {
    match tokio::fs::read(path).await {
        Ok(raw) => parse_in_background(name.to_string(), raw).await,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

async fn parse_in_background(name: String, raw: Vec<u8>) -> Result<Vec<PackageRecord>, SyncError> {
    let task_name = name.clone();
    tokio::task::spawn_blocking(move || parse_sync_db(&task_name, &raw))
        .await
        .map_err(|err| SyncError::Parse {
            name,
            reason: format!("task join error: {err}"),
        })?
}

/// Read every `*/desc` entry of a (optionally gzip-compressed) sync database.
pub fn parse_sync_db(repository: &str, raw: &[u8]) -> Result<Vec<PackageRecord>, SyncError> {
    let unreadable = |reason: String| SyncError::Parse {
        name: repository.to_string(),
        reason,
    };
    let reader: Box<dyn Read + '_> = if raw.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(raw))
    } else {
        Box::new(raw)
    };
    let mut archive = tar::Archive::new(reader);
    let mut packages = Vec::new();
    for entry in archive.entries().map_err(|err| unreadable(err.to_string()))? {
        let mut entry = entry.map_err(|err| unreadable(err.to_string()))?;
        let is_desc = entry
            .path()
            .map_err(|err| unreadable(err.to_string()))?
            .file_name()
            .is_some_and(|file| file == "desc");
        if !is_desc {
            continue;
        }
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|err| unreadable(err.to_string()))?;
        match parse_desc(&text, repository) {
            Some(record) => packages.push(record),
            None => tracing::debug!("skipping desc entry without name or version"),
        }
    }
    Ok(packages)
}

/// Parse one `desc` file: `%KEY%` headers followed by value lines, blank-line separated.
pub fn parse_desc(text: &str, repository: &str) -> Option<PackageRecord> {
    let mut name = None;
    let mut version = None;
    let mut pkgbase = None;
    let mut architecture = None;
    let mut build_date = None;
    let mut provides = Vec::new();

    let mut key: Option<&str> = None;
    for line in text.lines() {
        if line.is_empty() {
            key = None;
            continue;
        }
        if line.len() > 2 && line.starts_with('%') && line.ends_with('%') {
            key = Some(&line[1..line.len() - 1]);
            continue;
        }
        match key {
            Some("NAME") => name = Some(line.to_string()),
            Some("VERSION") => version = Some(line.to_string()),
            Some("BASE") => pkgbase = Some(line.to_string()),
            Some("ARCH") => architecture = Some(line.to_string()),
            Some("BUILDDATE") => {
                build_date = line
                    .parse::<i64>()
                    .ok()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
            }
            Some("PROVIDES") => provides.push(line.to_string()),
            _ => {}
        }
    }

    let name = name?;
    Some(PackageRecord {
        pkgbase: pkgbase.unwrap_or_else(|| name.clone()),
        version: version?,
        architecture: architecture.unwrap_or_default(),
        provides,
        build_date,
        repository: repository.to_string(),
        name,
    })
}
