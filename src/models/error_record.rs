use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PageTarget;

/// A target that failed its most recent check, as stored in the ledger file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(alias = "config")]
    pub target: PageTarget,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl ErrorRecord {
    pub fn new(target: PageTarget, error: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            target,
            error: error.into(),
            observed_at: Some(observed_at),
        }
    }

    pub fn identity(&self) -> &str {
        self.target.identity()
    }
}
