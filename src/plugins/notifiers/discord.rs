use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::plugins::traits::{NotificationEvent, Notifier, NotifierError};

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: Option<String>,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>, username: Option<String>) -> Self {
        DiscordNotifier {
            client: Client::new(),
            webhook_url: webhook_url.into(),
            username,
        }
    }

    fn get_emoji(&self, event: &NotificationEvent) -> &str {
        match event {
            NotificationEvent::StockAvailable { .. } => "🛒",
            NotificationEvent::StructureChanged { .. } => "🔍",
            NotificationEvent::ErrorSummary { .. } => "⚠️",
        }
    }

    fn create_webhook_payload(&self, event: &NotificationEvent) -> serde_json::Value {
        let mut payload = json!({
            "content": format!("{} **{}**\n{}", self.get_emoji(event), event.headline(), event.detail()),
        });

        if let Some(username) = &self.username {
            payload["username"] = json!(username);
        }

        payload
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.create_webhook_payload(event))
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

        Ok(())
    }
}
