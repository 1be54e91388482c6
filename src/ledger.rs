use chrono::{DateTime, Timelike, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::{CheckOutcome, ErrorRecord, PageTarget};
use crate::utils::error::{AppError, Result};

/// JSON file holding the targets whose latest check failed.
#[derive(Debug, Clone)]
pub struct ErrorLedger {
    path: PathBuf,
}

impl ErrorLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the previous run's records. A missing or unreadable ledger is
    /// treated as empty so that one bad file never blocks a run.
    pub async fn load(&self) -> Vec<ErrorRecord> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No error ledger at {}, starting empty", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Failed to read error ledger {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Ignoring corrupt error ledger {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Replaces the ledger with `records`, even when there are none.
    pub async fn save(&self, records: &[ErrorRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.error(format!("Failed to create directory: {}", e)))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.error(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.error(format!("Failed to replace ledger: {}", e)))?;

        tracing::debug!("Wrote {} record(s) to {}", records.len(), self.path.display());
        Ok(())
    }

    fn error(&self, message: String) -> AppError {
        AppError::Ledger {
            path: self.path.display().to_string(),
            message,
        }
    }
}

/// Merges this run's failures into the previous ledger.
///
/// Failures from this run come first, in target order, one per URL. Previous
/// records survive only for URLs that were not checked at all this run, so a
/// target that recovered drops out and a target that failed again keeps only
/// its newest reason.
pub fn reconcile(
    previous: Vec<ErrorRecord>,
    targets: &[PageTarget],
    outcomes: &[CheckOutcome],
    observed_at: DateTime<Utc>,
) -> Vec<ErrorRecord> {
    let checked: HashSet<&str> = targets.iter().map(PageTarget::identity).collect();
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for (target, outcome) in targets.iter().zip(outcomes) {
        if let Some(reason) = outcome.failure_reason() {
            if seen.insert(target.identity().to_string()) {
                merged.push(ErrorRecord::new(target.clone(), reason, observed_at));
            }
        }
    }

    for record in previous {
        if checked.contains(record.identity()) {
            continue;
        }
        if seen.insert(record.identity().to_string()) {
            merged.push(record);
        }
    }

    merged
}

/// Coarse stateless throttle for the aggregate error alert: it fires only on
/// runs that start on a minute divisible by the modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationGate {
    minute_modulus: u32,
}

impl Default for NotificationGate {
    fn default() -> Self {
        Self { minute_modulus: 20 }
    }
}

impl NotificationGate {
    pub fn new(minute_modulus: u32) -> Self {
        Self {
            minute_modulus: minute_modulus.max(1),
        }
    }

    pub fn should_notify(&self, merged: &[ErrorRecord], run_started: DateTime<Utc>) -> bool {
        !merged.is_empty() && run_started.minute() % self.minute_modulus == 0
    }
}
