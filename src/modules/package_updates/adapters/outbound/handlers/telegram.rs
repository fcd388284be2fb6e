// Telegram bot handler.
//
// Purpose
// - Post new and updated packages to one or more Telegram chats.
//
// Responsibilities
// - Skip Failed events.
// - Group events ten per message and send every group to every chat.
// - Escape each line for Telegram's HTML parse mode.

use super::{HandlerConfigError, HandlerOptions, Outbound};
use crate::modules::package_updates::core::events::{UpdateEvent, UpdateKind};
use crate::modules::package_updates::core::ports::UpdateHandler;
use async_trait::async_trait;
use futures::future::join_all;

pub const HANDLER_NAME: &str = "telegram";
const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const MESSAGE_HEADER: &str = "<b>Arch Linux RISC-V: Recent package updates</b>";
const EVENTS_PER_MESSAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_ids: Vec<String>,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn from_options(options: &HandlerOptions) -> Result<Self, HandlerConfigError> {
        let bot_token = options.require(HANDLER_NAME, "bot_token")?;
        let chat_ids: Vec<String> = options
            .require(HANDLER_NAME, "chat_id")?
            .split(',')
            .map(str::trim)
            .filter(|chat| !chat.is_empty())
            .map(str::to_string)
            .collect();
        if chat_ids.is_empty() {
            return Err(HandlerConfigError::MissingOption {
                handler: HANDLER_NAME.into(),
                option: "chat_id".into(),
            });
        }
        let api_base = options
            .get(HANDLER_NAME, "api_base")
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            bot_token,
            chat_ids,
            api_base,
        })
    }
}

pub struct TelegramHandler {
    config: TelegramConfig,
    outbound: Outbound,
}

impl TelegramHandler {
    pub fn new(config: TelegramConfig, outbound: Outbound) -> Self {
        Self { config, outbound }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.config.api_base, self.config.bot_token)
    }

    async fn send(&self, chat_id: &str, text: &str) -> anyhow::Result<()> {
        match &self.outbound {
            Outbound::DryRun(log) => {
                log.record(format!("telegram chat {chat_id}"), text).await;
                Ok(())
            }
            Outbound::Http(client) => {
                let response = client
                    .get(self.send_url())
                    .query(&[("chat_id", chat_id), ("text", text), ("parse_mode", "HTML")])
                    .send()
                    .await?
                    .error_for_status()?;
                let body = response.text().await?;
                tracing::debug!(response = %body, "telegram replied");
                Ok(())
            }
        }
    }
}

/// One message: the header followed by one escaped line per event.
pub fn render_message(events: &[&UpdateEvent]) -> String {
    let mut lines = vec![MESSAGE_HEADER.to_string()];
    for event in events {
        let new_version = event.new_version.as_deref().unwrap_or_default();
        let line = match &event.old_version {
            Some(old) => format!("{} {} -> {}", event.subject_name, old, new_version),
            None => format!("{} {}", event.subject_name, new_version),
        };
        lines.push(escape_html(&line));
    }
    lines.join("\n")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
impl UpdateHandler for TelegramHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    async fn process(&self, events: &[UpdateEvent]) -> anyhow::Result<()> {
        let announced: Vec<&UpdateEvent> = events
            .iter()
            .filter(|event| event.kind != UpdateKind::Failed)
            .collect();
        if announced.is_empty() {
            return Ok(());
        }
        tracing::info!(events = announced.len(), "send to telegram");

        let messages: Vec<String> = announced.chunks(EVENTS_PER_MESSAGE).map(render_message).collect();
        let sends = messages.iter().flat_map(move |text| {
            self.config
                .chat_ids
                .iter()
                .map(move |chat_id| async move { (chat_id, self.send(chat_id, text).await) })
        });

        let mut failed = 0;
        let results = join_all(sends).await;
        for (chat_id, result) in &results {
            if let Err(err) = result {
                failed += 1;
                tracing::error!(chat_id = %chat_id, error = %err, "telegram delivery failed");
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} of {} telegram messages failed", results.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod telegram_handler_tests {
    use super::*;
    use crate::modules::package_updates::adapters::outbound::handlers::DryRunLog;
    use httpmock::prelude::*;
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    fn event(name: &str, kind: UpdateKind, old: Option<&str>, new: Option<&str>) -> UpdateEvent {
        UpdateEvent {
            subject_name: name.into(),
            pkgbase: name.into(),
            alias_names: vec![],
            kind,
            old_version: old.map(Into::into),
            new_version: new.map(Into::into),
            architecture: Some("riscv64".into()),
            repository: Some("core".into()),
            log_file: None,
            human_message: String::new(),
        }
    }

    #[fixture]
    fn config() -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:abc".into(),
            chat_ids: vec!["1".into(), "2".into()],
            api_base: DEFAULT_API_BASE.into(),
        }
    }

    #[rstest]
    fn it_should_read_its_options() {
        let options: HandlerOptions = [("telegram__bot_token", "123:abc"), ("telegram__chat_id", "1, 2")]
            .into_iter()
            .collect();
        let parsed = TelegramConfig::from_options(&options).unwrap();
        assert_eq!(parsed.chat_ids, vec!["1", "2"]);
        assert_eq!(parsed.api_base, DEFAULT_API_BASE);
    }

    #[rstest]
    fn it_should_require_a_chat_id() {
        let options: HandlerOptions = [("telegram__bot_token", "123:abc"), ("telegram__chat_id", " , ")]
            .into_iter()
            .collect();
        assert!(TelegramConfig::from_options(&options).is_err());
    }

    #[rstest]
    fn it_should_render_escaped_lines() {
        let updated = event("gcc", UpdateKind::Updated, Some("13.1-1"), Some("13.2-1"));
        let added = event("c++utils<x>", UpdateKind::New, None, Some("1.0-1"));
        assert_eq!(
            render_message(&[&updated, &added]),
            "<b>Arch Linux RISC-V: Recent package updates</b>\ngcc 13.1-1 -&gt; 13.2-1\nc++utils&lt;x&gt; 1.0-1"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_group_ten_events_per_message_per_chat(config: TelegramConfig) {
        let log = Arc::new(DryRunLog::new());
        let handler = TelegramHandler::new(config, Outbound::DryRun(log.clone()));
        let mut events: Vec<UpdateEvent> = (0..11)
            .map(|i| event(&format!("pkg{i}"), UpdateKind::New, None, Some("1.0-1")))
            .collect();
        events.push(event("broken", UpdateKind::Failed, None, None));

        handler.process(&events).await.unwrap();

        let deliveries = log.deliveries().await;
        assert_eq!(deliveries.len(), 4);
        assert!(deliveries.iter().all(|d| !d.body.contains("broken")));
        let first_chat: Vec<_> = deliveries.iter().filter(|d| d.target == "telegram chat 1").collect();
        assert_eq!(first_chat.len(), 2);
        let lines: usize = first_chat.iter().map(|d| d.body.lines().count() - 1).sum();
        assert_eq!(lines, 11);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_stay_quiet_for_failures_only(config: TelegramConfig) {
        let log = Arc::new(DryRunLog::new());
        let handler = TelegramHandler::new(config, Outbound::DryRun(log.clone()));
        handler
            .process(&[event("broken", UpdateKind::Failed, None, None)])
            .await
            .unwrap();
        assert!(log.deliveries().await.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_call_send_message(mut config: TelegramConfig) {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/bot123:abc/sendMessage")
                    .query_param("chat_id", "1")
                    .query_param("parse_mode", "HTML")
                    .query_param(
                        "text",
                        "<b>Arch Linux RISC-V: Recent package updates</b>\nbash 5.2-1",
                    );
                then.status(200).body(r#"{"ok":true}"#);
            })
            .await;
        config.api_base = server.base_url();
        config.chat_ids = vec!["1".into()];
        let handler = TelegramHandler::new(config, Outbound::Http(reqwest::Client::new()));

        handler
            .process(&[event("bash", UpdateKind::New, None, Some("5.2-1"))])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_failed_deliveries(mut config: TelegramConfig) {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/bot123:abc/sendMessage");
                then.status(400).body(r#"{"ok":false}"#);
            })
            .await;
        config.api_base = server.base_url();
        let handler = TelegramHandler::new(config, Outbound::Http(reqwest::Client::new()));

        let result = handler
            .process(&[event("bash", UpdateKind::New, None, Some("5.2-1"))])
            .await;
        assert_eq!(result.unwrap_err().to_string(), "2 of 2 telegram messages failed");
    }
}
