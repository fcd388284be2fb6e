// ArchRV bot handler.
//
// Purpose
// - Tell the ArchRV status bot to clear its stale marks for packages that
//   were updated (`ftbfs`) or newly built (`leaf`).
//
// Responsibilities
// - Map Updated to `ftbfs` and New to `leaf`; ignore Failed events.
// - Issue one request per mapped event, all concurrently.

use super::{HandlerConfigError, HandlerOptions, Outbound};
use crate::modules::package_updates::core::events::{UpdateEvent, UpdateKind};
use crate::modules::package_updates::core::ports::UpdateHandler;
use async_trait::async_trait;
use futures::future::join_all;

pub const HANDLER_NAME: &str = "archrv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchRvConfig {
    pub baseurl: String,
    pub token: String,
}

impl ArchRvConfig {
    pub fn from_options(options: &HandlerOptions) -> Result<Self, HandlerConfigError> {
        Ok(Self {
            baseurl: options
                .require(HANDLER_NAME, "baseurl")?
                .trim_end_matches('/')
                .to_string(),
            token: options.require(HANDLER_NAME, "token")?,
        })
    }
}

/// The bot status cleared for an event kind, if any.
pub fn status_for(kind: UpdateKind) -> Option<&'static str> {
    match kind {
        UpdateKind::Updated => Some("ftbfs"),
        UpdateKind::New => Some("leaf"),
        UpdateKind::Failed => None,
    }
}

pub struct ArchRvHandler {
    config: ArchRvConfig,
    outbound: Outbound,
}

impl ArchRvHandler {
    pub fn new(config: ArchRvConfig, outbound: Outbound) -> Self {
        Self { config, outbound }
    }

    async fn clear(&self, name: &str, status: &str) -> anyhow::Result<()> {
        let url = format!("{}/delete/{name}/{status}", self.config.baseurl);
        match &self.outbound {
            Outbound::DryRun(log) => {
                log.record(url, "").await;
                Ok(())
            }
            Outbound::Http(client) => {
                let response = client
                    .get(&url)
                    .query(&[("token", self.config.token.as_str())])
                    .send()
                    .await?
                    .error_for_status()?;
                let body = response.text().await?;
                tracing::debug!(response = %body, "archrv replied");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl UpdateHandler for ArchRvHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    async fn process(&self, events: &[UpdateEvent]) -> anyhow::Result<()> {
        let requests: Vec<(&str, &str)> = events
            .iter()
            .filter_map(|event| status_for(event.kind).map(|status| (event.subject_name.as_str(), status)))
            .collect();
        if requests.is_empty() {
            return Ok(());
        }
        tracing::info!(requests = requests.len(), "send to archrv");

        let results = join_all(requests.iter().map(|(name, status)| async move {
            (*name, self.clear(name, status).await)
        }))
        .await;

        let mut failed = 0;
        for (name, result) in &results {
            if let Err(err) = result {
                failed += 1;
                tracing::error!(package = %name, error = %err, "archrv request failed");
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} of {} archrv requests failed", results.len());
        }
        Ok(())
    }
}
