//! Report delivery: mail through `mime-construct` and an optional JSON webhook

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::backends::commands::execute_command;
use crate::backends::Notifier;
use crate::config::NotifyConfig;
use crate::constants::{commands, APP_NAME};
use crate::errors::NotifyError;

pub struct MailNotifier {
    recipient: String,
}

impl MailNotifier {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        execute_command(
            "mime-construct",
            [
                "--header",
                commands::MAIL_AUTO_SUBMITTED,
                "--to",
                self.recipient.as_str(),
                "--subject",
                subject,
                "--body",
                body,
            ],
        )
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub subject: String,
    pub body: String,
}

pub struct WebhookNotifier {
    webhook_url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(commands::WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client for webhook: {}", e))?;

        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let payload = ReportPayload {
            timestamp: Utc::now(),
            source: APP_NAME.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!("HTTP {}", response.status()))
        }
    }
}

/// Fans a report out to every configured channel
pub struct NotificationService {
    channels: Vec<(String, Box<dyn Notifier>)>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        let mut service = Self::new().with_channel("mail", MailNotifier::new(&config.mail_to));

        if let Some(url) = config.webhook_url.as_deref().filter(|url| !url.is_empty()) {
            match WebhookNotifier::new(url) {
                Ok(webhook) => service = service.with_channel("webhook", webhook),
                Err(e) => warn!("Webhook notifier disabled: {}", e),
            }
        }

        service
    }

    pub fn with_channel(mut self, name: &str, notifier: impl Notifier + 'static) -> Self {
        self.channels.push((name.to_string(), Box::new(notifier)));
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver on every channel. Failures are logged and returned, never raised.
    pub async fn notify(&self, subject: &str, body: &str) -> Vec<NotifyError> {
        let mut failures = Vec::new();

        for (name, notifier) in &self.channels {
            match notifier.send(subject, body).await {
                Ok(()) => info!("Report sent via {}: {}", name, subject),
                Err(e) => {
                    let failure = NotifyError {
                        channel: name.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        failures
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}
