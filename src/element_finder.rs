use futures::future::{self, Either};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

use crate::config::CheckerConfig;
use crate::logging::TaskLogger;
use crate::models::PageTarget;
use crate::scraper::{DriverError, ElementHandle, LocatorKind, PageHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ElementHandle),
    /// Both locators missed on a settled page.
    StructureChanged,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Page never settled after {attempts} attempt(s): {source}")]
    Unsettled { attempts: usize, source: DriverError },

    #[error("Reload before attempt {attempt} failed: {source}")]
    Reload { attempt: usize, source: DriverError },

    #[error("Element lookup failed: {0}")]
    Lookup(DriverError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverPolicy {
    pub wait_timeout: Duration,
    pub max_retries: usize,
    pub retry_delay: Duration,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self::from(&CheckerConfig::default())
    }
}

impl From<&CheckerConfig> for ResolverPolicy {
    fn from(config: &CheckerConfig) -> Self {
        Self {
            wait_timeout: config.selector_timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

// Outcome of one race between the two locators.
enum Race {
    Found(ElementHandle),
    Missing,
    Unsettled(DriverError),
}

/// Finds the stock element on a page by racing the XPath and CSS locators.
#[derive(Debug, Clone)]
pub struct ElementFinder {
    policy: ResolverPolicy,
}

impl ElementFinder {
    pub fn new(policy: ResolverPolicy) -> Self {
        Self { policy }
    }

    /// Resolves the target's element on an already navigated page.
    ///
    /// A page that never settles is re-navigated up to `max_retries` times.
    /// A settled page where neither locator matches yields
    /// [`Resolution::StructureChanged`]. Any other driver error is returned
    /// straight away.
    pub async fn resolve(
        &self,
        page: &dyn PageHandle,
        target: &PageTarget,
        log: &TaskLogger,
    ) -> Result<Resolution, ResolveError> {
        let max_retries = self.policy.max_retries;
        let strategy = FixedInterval::new(self.policy.retry_delay).take(max_retries);
        let mut attempt = 0usize;

        let action = || {
            attempt += 1;
            let attempt = attempt;
            async move {
                if attempt > 1 {
                    log.warn(format!(
                        "Page did not settle, reloading {} (retry {}/{})",
                        target.url,
                        attempt - 1,
                        max_retries
                    ));
                    page.navigate(&target.url)
                        .await
                        .map_err(|source| ResolveError::Reload { attempt, source })?;
                }

                match self.race(page, target).await? {
                    Race::Found(element) => {
                        log.debug(format!("Matched {} '{}'", element.kind, element.locator));
                        Ok(Resolution::Found(element))
                    }
                    Race::Missing => Ok(Resolution::StructureChanged),
                    Race::Unsettled(source) => Err(ResolveError::Unsettled { attempts: attempt, source }),
                }
            }
        };

        RetryIf::start(strategy, action, |e: &ResolveError| {
            matches!(e, ResolveError::Unsettled { .. })
        })
        .await
    }

    async fn race(&self, page: &dyn PageHandle, target: &PageTarget) -> Result<Race, ResolveError> {
        let timeout = self.policy.wait_timeout;
        let primary = page.wait_for_element(&target.primary_locator, LocatorKind::XPath, timeout);
        let secondary = page.wait_for_element(&target.secondary_locator, LocatorKind::Css, timeout);

        // First match wins; a miss waits for its sibling before concluding.
        let (first, rest) = match future::select(primary, secondary).await {
            Either::Left((Ok(element), _)) | Either::Right((Ok(element), _)) => {
                return Ok(Race::Found(element));
            }
            Either::Left((Err(e), rest)) | Either::Right((Err(e), rest)) => (e, rest),
        };

        if !Self::is_wait_miss(&first) {
            return Err(ResolveError::Lookup(first));
        }

        match rest.await {
            Ok(element) => Ok(Race::Found(element)),
            Err(second) if !Self::is_wait_miss(&second) => Err(ResolveError::Lookup(second)),
            Err(second) => Ok(Self::classify_misses(first, second)),
        }
    }

    fn is_wait_miss(err: &DriverError) -> bool {
        matches!(err, DriverError::NotFound { .. } | DriverError::Timeout(_))
    }

    fn classify_misses(first: DriverError, second: DriverError) -> Race {
        match (first, second) {
            (DriverError::NotFound { .. }, DriverError::NotFound { .. }) => Race::Missing,
            (timeout @ DriverError::Timeout(_), _) | (_, timeout) => Race::Unsettled(timeout),
        }
    }
}
