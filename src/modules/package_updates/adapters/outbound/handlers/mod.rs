// Notification handlers and the health signal.
//
// Purpose
// - Shared plumbing for the concrete handlers: option lookup from the
//   environment and the dry-run delivery recorder.
//
// Responsibilities
// - HandlerOptions: flat `<handler>__<option>` lookup, empty values count as missing.
// - DryRunLog: collect the deliveries a handler would have made.

pub mod archrv;
pub mod telegram;
pub mod uptime_kuma;

use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerConfigError {
    #[error("{handler}: missing option {handler}__{option}")]
    MissingOption { handler: String, option: String },
}

/// Options for every handler, keyed `<handler>__<option>`.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    values: HashMap<String, String>,
}

impl HandlerOptions {
    /// Environment entries that are not valid Unicode are skipped.
    pub fn from_env() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, handler: &str, option: &str) -> Option<&str> {
        self.values
            .get(&format!("{handler}__{option}"))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn require(&self, handler: &str, option: &str) -> Result<String, HandlerConfigError> {
        self.get(handler, option)
            .map(str::to_string)
            .ok_or_else(|| HandlerConfigError::MissingOption {
                handler: handler.to_string(),
                option: option.to_string(),
            })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HandlerOptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Where a handler's requests go: the network, or a dry-run log.
#[derive(Clone)]
pub enum Outbound {
    Http(reqwest::Client),
    DryRun(Arc<DryRunLog>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub target: String,
    pub body: String,
}

/// Deliveries that were logged instead of sent.
#[derive(Debug, Default)]
pub struct DryRunLog {
    deliveries: Mutex<Vec<Delivery>>,
}

impl DryRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, target: impl Into<String>, body: impl Into<String>) {
        let delivery = Delivery {
            target: target.into(),
            body: body.into(),
        };
        tracing::debug!(target = %delivery.target, body = %delivery.body, "dry run delivery");
        self.deliveries.lock().await.push(delivery);
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }
}
