use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::logging::TaskLogger;
use crate::models::{CheckOutcome, FailureKind, PageTarget};
use crate::page_checker::PageChecker;
use crate::scraper::BrowserSession;

/// Runs `task` over `items` with at most `parallelism` futures in flight.
///
/// This is a sliding window: as soon as one task finishes the next item
/// starts. Each task receives the index of its item, and the returned vector
/// is in input order regardless of completion order.
pub async fn run_bounded<T, O, F, Fut>(items: Vec<T>, parallelism: usize, task: F) -> Vec<O>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = O>,
{
    let mut slots: Vec<Option<O>> = std::iter::repeat_with(|| None).take(items.len()).collect();

    let mut completed = stream::iter(items.into_iter().enumerate())
        .map(|(idx, item)| {
            let fut = task(idx, item);
            async move { (idx, fut.await) }
        })
        .buffer_unordered(parallelism.max(1));

    while let Some((idx, output)) = completed.next().await {
        slots[idx] = Some(output);
    }

    slots.into_iter().flatten().collect()
}

/// Everything one run owns: when it started, how wide it fans out and the
/// browser session its pages come from.
pub struct RunContext {
    pub started_at: DateTime<Utc>,
    pub parallelism: usize,
    session: Box<dyn BrowserSession>,
}

impl RunContext {
    pub fn new(started_at: DateTime<Utc>, parallelism: usize, session: Box<dyn BrowserSession>) -> Self {
        Self {
            started_at,
            parallelism,
            session,
        }
    }

    /// Checks every target and closes the session once all checks settled.
    pub async fn execute(self, targets: &[PageTarget], checker: &PageChecker) -> Vec<CheckOutcome> {
        tracing::info!(
            "Checking {} page(s) with parallelism {} for the run started at {}",
            targets.len(),
            self.parallelism,
            self.started_at.to_rfc3339()
        );

        let session = self.session.as_ref();
        let outcomes = run_bounded(targets.iter().collect(), self.parallelism, |idx, target| async move {
            let log = TaskLogger::new(idx);
            check_in_new_page(session, checker, target, &log).await
        })
        .await;

        if let Err(e) = self.session.close().await {
            tracing::error!("Failed to close browser session: {}", e);
        }

        outcomes
    }
}

async fn check_in_new_page(
    session: &dyn BrowserSession,
    checker: &PageChecker,
    target: &PageTarget,
    log: &TaskLogger,
) -> CheckOutcome {
    let page = match session.new_page().await {
        Ok(page) => page,
        Err(e) => {
            log.error(format!("Could not open a page for {}: {}", target.url, e));
            return CheckOutcome::failed(FailureKind::Page, log.line(format!("Error opening page: {}", e)));
        }
    };

    let result = AssertUnwindSafe(checker.check(target, page.as_ref(), log))
        .catch_unwind()
        .await;

    if let Err(e) = page.close().await {
        log.warn(format!("Failed to close page: {}", e));
    }

    match result {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            log.error(format!("Check panicked: {}", message));
            CheckOutcome::failed(FailureKind::Panicked, log.line(format!("Check panicked: {}", message)))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
