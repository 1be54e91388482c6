use std::sync::Arc;
use thiserror::Error;

use crate::element_finder::{ElementFinder, Resolution, ResolveError};
use crate::logging::TaskLogger;
use crate::models::{CheckOutcome, FailureKind, NotifyReason, PageTarget};
use crate::plugins::traits::{NotificationEvent, Notifier};
use crate::scraper::{DriverError, PageHandle};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("[{task}] Error navigating to {url}: {source}")]
    Navigation {
        task: usize,
        url: String,
        source: DriverError,
    },

    #[error("[{task}] Error resolving xpath '{xpath}' / selector '{selector}': {source}")]
    Selector {
        task: usize,
        xpath: String,
        selector: String,
        source: ResolveError,
    },

    #[error("[{task}] Error reading text of {locator}: {source}")]
    Extraction {
        task: usize,
        locator: String,
        source: DriverError,
    },
}

impl CheckError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CheckError::Navigation { .. } => FailureKind::Navigation,
            CheckError::Selector { .. } => FailureKind::Selector,
            CheckError::Extraction { .. } => FailureKind::Extraction,
        }
    }
}

/// Checks one product page and turns whatever happens into a [`CheckOutcome`].
pub struct PageChecker {
    finder: ElementFinder,
    notifier: Arc<dyn Notifier>,
}

impl PageChecker {
    pub fn new(finder: ElementFinder, notifier: Arc<dyn Notifier>) -> Self {
        Self { finder, notifier }
    }

    pub async fn check(&self, target: &PageTarget, page: &dyn PageHandle, log: &TaskLogger) -> CheckOutcome {
        match self.try_check(target, page, log).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log.error(format!("Error encountered for {} ({}).", target.product, target.vendor));
                tracing::error!("{}", e);
                CheckOutcome::failed(e.kind(), e.to_string())
            }
        }
    }

    async fn try_check(
        &self,
        target: &PageTarget,
        page: &dyn PageHandle,
        log: &TaskLogger,
    ) -> Result<CheckOutcome, CheckError> {
        page.navigate(&target.url)
            .await
            .map_err(|source| CheckError::Navigation {
                task: log.id(),
                url: target.url.clone(),
                source,
            })?;
        log.info("Loaded website.");

        let resolution = self
            .finder
            .resolve(page, target, log)
            .await
            .map_err(|source| CheckError::Selector {
                task: log.id(),
                xpath: target.primary_locator.clone(),
                selector: target.secondary_locator.clone(),
                source,
            })?;

        let element = match resolution {
            Resolution::StructureChanged => {
                log.warn("DOM Changed.");
                self.send(NotificationEvent::StructureChanged {
                    vendor: target.vendor.clone(),
                    product: target.product.clone(),
                    url: target.url.clone(),
                }, log)
                .await;
                return Ok(CheckOutcome::Notified {
                    reason: NotifyReason::StructureChanged,
                });
            }
            Resolution::Found(element) => element,
        };

        let text = page
            .element_text(&element)
            .await
            .map_err(|source| CheckError::Extraction {
                task: log.id(),
                locator: element.locator.clone(),
                source,
            })?;
        log.info(format!("Inner text : {}", text.as_deref().unwrap_or("<none>")));

        if target.reads_unavailable(text.as_deref()) {
            return Ok(CheckOutcome::NoChange);
        }

        self.send(NotificationEvent::StockAvailable {
            vendor: target.vendor.clone(),
            product: target.product.clone(),
            url: target.url.clone(),
        }, log)
        .await;

        Ok(CheckOutcome::Notified {
            reason: NotifyReason::InStock,
        })
    }

    // A failed alert never fails the check it reports on.
    async fn send(&self, event: NotificationEvent, log: &TaskLogger) {
        match self.notifier.notify(&event).await {
            Ok(()) => log.info(format!("Notification sent: {}", event.headline())),
            Err(e) => log.error(format!("Failed to send notification via {}: {}", self.notifier.name(), e)),
        }
    }
}
