// Uptime Kuma push monitor as the health signal.

use super::{HandlerConfigError, HandlerOptions, Outbound};
use crate::modules::package_updates::core::ports::{HealthSignal, HealthStatus};
use async_trait::async_trait;

pub const HANDLER_NAME: &str = "uptimekuma";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UptimeKumaConfig {
    pub baseurl: String,
    pub token: String,
}

impl UptimeKumaConfig {
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

pub struct UptimeKumaPush {
    config: UptimeKumaConfig,
    outbound: Outbound,
}

impl UptimeKumaPush {
    pub fn new(config: UptimeKumaConfig, outbound: Outbound) -> Self {
        Self { config, outbound }
    }

    fn push_url(&self) -> String {
        format!("{}/api/push/{}", self.config.baseurl, self.config.token)
    }
}

#[async_trait]
impl HealthSignal for UptimeKumaPush {
    async fn push(&self, status: HealthStatus, message: &str) -> anyhow::Result<()> {
        match &self.outbound {
            Outbound::DryRun(log) => {
                log.record(format!("push {}", status.as_str()), message).await;
            }
            Outbound::Http(client) => {
                tracing::info!(status = status.as_str(), "{message}");
                client
                    .get(self.push_url())
                    .query(&[("status", status.as_str()), ("msg", message)])
                    .send()
                    .await?
                    .error_for_status()?;
            }
        }
        Ok(())
    }
}
