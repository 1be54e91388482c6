use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::plugins::traits::{NotificationEvent, Notifier, NotifierError};

/// IFTTT Maker webhook: the headline goes in `value1`, the detail in `value2`.
pub struct IftttNotifier {
    client: Client,
    webhook_url: String,
}

impl IftttNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    fn create_payload(&self, event: &NotificationEvent) -> serde_json::Value {
        json!({
            "value1": event.headline(),
            "value2": event.detail(),
        })
    }
}

#[async_trait]
impl Notifier for IftttNotifier {
    fn name(&self) -> &str {
        "ifttt"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.create_payload(event))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("IFTTT accepted '{}'", event.headline());
        Ok(())
    }
}
