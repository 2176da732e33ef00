//! Notification sinks
//!
//! Delivery is fire-and-forget: the pipeline never observes a sink's
//! outcome. Sink errors are logged and swallowed. Channel enablement comes
//! from explicit configuration booleans, never from ambient process state.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::NotificationConfig;

/// Event types consumed by notification sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    Success,
    Failure,
    ManualReview,
    Summary,
}

impl NotifyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyEvent::Success => "success",
            NotifyEvent::Failure => "failure",
            NotifyEvent::ManualReview => "manual-review",
            NotifyEvent::Summary => "summary",
        }
    }
}

/// A notification sink: consumes an `(event, payload)` pair, returns nothing.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotifyEvent, payload: &Value);
}

/// Emits one structured log line per notification.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: NotifyEvent, payload: &Value) {
        info!(event = event.as_str(), %payload, "notification");
    }
}

/// POSTs Slack-style attachment payloads to a configured webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("depsync")
                .build()
                .expect("Failed to create HTTP client"),
            url: url.to_string(),
        }
    }

    fn message(event: NotifyEvent, payload: &Value) -> (&'static str, &'static str, String) {
        let field = |key: &str| payload[key].as_str().unwrap_or("?").to_string();
        match event {
            NotifyEvent::Success => (
                "#36a64f",
                "Dependency updated",
                format!(
                    "{}@{} auto-applied to {}",
                    field("package"),
                    field("version"),
                    field("project")
                ),
            ),
            NotifyEvent::Failure => (
                "#ff0000",
                "Update failed",
                format!(
                    "Failed to update {} in {}: {}",
                    field("package"),
                    field("project"),
                    field("reason")
                ),
            ),
            NotifyEvent::ManualReview => (
                "#ffa500",
                "Manual review needed",
                format!(
                    "{}@{} ({}) in {}",
                    field("package"),
                    field("version"),
                    field("changeType"),
                    field("project")
                ),
            ),
            NotifyEvent::Summary => (
                "#0099ff",
                "Sync complete",
                format!(
                    "Applied: {}/{} | Pending: {}",
                    payload["applied"].as_u64().unwrap_or(0),
                    payload["total"].as_u64().unwrap_or(0),
                    payload["pendingReview"].as_u64().unwrap_or(0)
                ),
            ),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: NotifyEvent, payload: &Value) {
        let (color, title, text) = Self::message(event, payload);

        let body = json!({
            "attachments": [{
                "fallback": title,
                "color": color,
                "title": title,
                "text": text,
                "ts": chrono::Utc::now().timestamp(),
            }]
        });

        match self.client.post(&self.url).json(&body).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(
                    "Webhook returned status {} for {} notification",
                    response.status(),
                    event.as_str()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Webhook delivery failed: {}", e),
        }
    }
}

/// Fans one notification out to every enabled sink.
pub struct NotifierSet {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl NotifierSet {
    pub fn from_config(config: &NotificationConfig) -> Self {
        let mut sinks: Vec<Arc<dyn Notifier>> = Vec::new();

        if config.log.enabled {
            sinks.push(Arc::new(LogNotifier));
        }

        if config.webhook.enabled {
            match &config.webhook.url {
                Some(url) => sinks.push(Arc::new(WebhookNotifier::new(url))),
                None => warn!("Webhook notifications enabled but no URL configured"),
            }
        }

        Self { sinks }
    }

    #[cfg(test)]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

#[async_trait::async_trait]
impl Notifier for NotifierSet {
    async fn notify(&self, event: NotifyEvent, payload: &Value) {
        for sink in &self.sinks {
            sink.notify(event, payload).await;
        }
    }
}
