use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    StockAvailable {
        vendor: String,
        product: String,
        url: String,
    },
    /// Neither locator matched; the page may have been redesigned.
    StructureChanged {
        vendor: String,
        product: String,
        url: String,
    },
    ErrorSummary {
        count: usize,
        detail: String,
    },
}

impl NotificationEvent {
    pub fn headline(&self) -> String {
        match self {
            NotificationEvent::StockAvailable { vendor, product, .. } => {
                format!("! Stock change for {} - {} !", vendor, product)
            }
            NotificationEvent::StructureChanged { vendor, product, .. } => {
                format!("? Page layout changed for {} - {} ?", vendor, product)
            }
            NotificationEvent::ErrorSummary { count, .. } => format!("{} ERRORS!", count),
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            NotificationEvent::StockAvailable { url, .. } | NotificationEvent::StructureChanged { url, .. } => url,
            NotificationEvent::ErrorSummary { detail, .. } => detail,
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Error POST-ing to webhook: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected notification with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A delivery channel for alerts (IFTTT, Discord, ...).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifierError>;
}
