use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::element_finder::{ElementFinder, ResolverPolicy};
use crate::ledger::{reconcile, ErrorLedger, NotificationGate};
use crate::models::{CheckOutcome, NotifyReason};
use crate::page_checker::PageChecker;
use crate::plugins::traits::{NotificationEvent, Notifier};
use crate::scheduler::RunContext;
use crate::scraper::BrowserSession;

/// Summary of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub checked: usize,
    pub in_stock: usize,
    pub structure_changed: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Size of the ledger written at the end of the run.
    pub ledger_size: usize,
    pub error_alert_sent: bool,
}

impl RunReport {
    fn new(run_id: Uuid, started_at: DateTime<Utc>, outcomes: &[CheckOutcome], ledger_size: usize) -> Self {
        let mut report = Self {
            run_id,
            started_at,
            checked: outcomes.len(),
            in_stock: 0,
            structure_changed: 0,
            unchanged: 0,
            failed: 0,
            ledger_size,
            error_alert_sent: false,
        };

        for outcome in outcomes {
            match outcome {
                CheckOutcome::Notified {
                    reason: NotifyReason::InStock,
                } => report.in_stock += 1,
                CheckOutcome::Notified {
                    reason: NotifyReason::StructureChanged,
                } => report.structure_changed += 1,
                CheckOutcome::NoChange => report.unchanged += 1,
                CheckOutcome::Failed { .. } => report.failed += 1,
            }
        }

        report
    }
}

/// Drives one run: check every page, fold failures into the ledger and
/// decide on the aggregate error alert.
pub struct StockWatcher {
    config: AppConfig,
    notifier: Arc<dyn Notifier>,
    ledger: ErrorLedger,
    gate: NotificationGate,
    checker: PageChecker,
}

impl StockWatcher {
    pub fn new(config: AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        let finder = ElementFinder::new(ResolverPolicy::from(&config.checker));
        let checker = PageChecker::new(finder, Arc::clone(&notifier));
        let ledger = ErrorLedger::new(config.paths.errors_file.clone());
        let gate = NotificationGate::new(config.checker.error_alert_minute_modulus);

        Self {
            config,
            notifier,
            ledger,
            gate,
            checker,
        }
    }

    pub async fn run(&self, session: Box<dyn BrowserSession>) -> Result<RunReport> {
        self.run_at(session, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit start time, which is what
    /// the alert gate looks at.
    pub async fn run_at(&self, session: Box<dyn BrowserSession>, started_at: DateTime<Utc>) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, "Run started");

        let previous = self.ledger.load().await;
        tracing::info!("Loaded {} previous error record(s)", previous.len());

        let targets = &self.config.pages;
        let context = RunContext::new(started_at, self.config.checker.parallelism, session);
        let outcomes = context.execute(targets, &self.checker).await;

        let merged = reconcile(previous, targets, &outcomes, started_at);
        let saved = self.ledger.save(&merged).await;
        if let Err(e) = &saved {
            tracing::error!("Failed to write error ledger: {}", e);
        }

        let mut report = RunReport::new(run_id, started_at, &outcomes, merged.len());

        if self.gate.should_notify(&merged, started_at) {
            report.error_alert_sent = self.send_error_alert(merged.len()).await;
        } else if !merged.is_empty() {
            tracing::info!("{} error(s) outstanding, alert suppressed this run", merged.len());
        }

        saved.with_context(|| format!("Error ledger {} was not updated", self.ledger.path().display()))?;
        Ok(report)
    }

    async fn send_error_alert(&self, count: usize) -> bool {
        let event = NotificationEvent::ErrorSummary {
            count,
            detail: self.config.notifications.error_detail.clone(),
        };

        match self.notifier.notify(&event).await {
            Ok(()) => {
                tracing::info!("Sent error alert: {}", event.headline());
                true
            }
            Err(e) => {
                tracing::error!("Failed to send error alert via {}: {}", self.notifier.name(), e);
                false
            }
        }
    }
}
