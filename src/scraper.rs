use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::ScraperConfig;

const LOOKUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    XPath,
    Css,
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorKind::XPath => f.write_str("xpath"),
            LocatorKind::Css => f.write_str("css"),
        }
    }
}

/// An element that matched a locator on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub locator: String,
    pub kind: LocatorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The page settled but nothing matched the locator within the wait.
    #[error("No element matches {kind} '{locator}'")]
    NotFound { locator: String, kind: LocatorKind },

    /// The page itself never finished loading within the wait.
    #[error("Timed out after {0:?} waiting for the page to settle")]
    Timeout(Duration),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser session is already closed")]
    SessionClosed,

    #[error("Lookup abandoned before it finished")]
    Cancelled,

    #[error("{0}")]
    Browser(String),
}

/// One tab in the shared browser session.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Loads `url` and waits until the navigation settles.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn wait_for_element(
        &self,
        locator: &str,
        kind: LocatorKind,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError>;

    /// Text content of a previously matched element, `None` if it has none.
    async fn element_text(&self, element: &ElementHandle) -> Result<Option<String>, DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}

/// A browser that hands out pages and is closed once per run.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}

// headless_chrome is synchronous; every call goes through the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, DriverError>
where
    F: FnOnce() -> Result<T, DriverError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DriverError::Browser(format!("Browser task failed: {}", e)))?
}

#[derive(Debug, PartialEq, Eq)]
enum PollOutcome<T> {
    Ready(T),
    Expired,
    Cancelled,
}

/// Calls `check` until it yields a value, `timeout` passes or `cancelled` is set.
fn poll_until<T>(timeout: Duration, cancelled: &AtomicBool, mut check: impl FnMut() -> Option<T>) -> PollOutcome<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if cancelled.load(Ordering::Relaxed) {
            return PollOutcome::Cancelled;
        }
        if let Some(value) = check() {
            return PollOutcome::Ready(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return PollOutcome::Expired;
        }
        std::thread::sleep(LOOKUP_POLL_INTERVAL.min(deadline - now));
    }
}

// Raises the flag when the owning future is dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// [`poll_until`] on the blocking pool. Dropping the returned future stops
/// the loop at its next tick, so a lookup that lost a race does not keep
/// querying the tab.
async fn poll_blocking<T, F>(timeout: Duration, check: F) -> Result<PollOutcome<T>, DriverError>
where
    F: FnMut() -> Option<T> + Send + 'static,
    T: Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let _guard = CancelOnDrop(Arc::clone(&cancelled));
    blocking(move || Ok(poll_until(timeout, &cancelled, check))).await
}

pub struct ChromeSession {
    browser: RwLock<Option<Browser>>,
    config: ScraperConfig,
}

impl ChromeSession {
    pub async fn launch(config: ScraperConfig) -> Result<Self, DriverError> {
        let launch_config = config.clone();
        let browser = blocking(move || {
            let mut launch_options = LaunchOptions::default_builder()
                .headless(launch_config.headless)
                .sandbox(launch_config.sandbox)
                .idle_browser_timeout(Duration::from_millis(launch_config.idle_browser_timeout_ms))
                .args(vec![
                    OsStr::new("--disable-dev-shm-usage"),
                    OsStr::new("--disable-gpu"),
                    OsStr::new("--disable-extensions"),
                    OsStr::new("--disable-background-timer-throttling"),
                    OsStr::new("--disable-backgrounding-occluded-windows"),
                    OsStr::new("--disable-renderer-backgrounding"),
                ])
                .build()
                .map_err(|e| DriverError::Browser(format!("Failed to create launch options: {}", e)))?;

            // Set Chrome path if provided
            if let Some(chrome_path) = &launch_config.chrome_path {
                launch_options.path = Some(PathBuf::from(chrome_path));
            }

            Browser::new(launch_options)
                .map_err(|e| DriverError::Browser(format!("Failed to launch browser: {}", e)))
        })
        .await?;

        tracing::info!("Browser opened");
        Ok(Self {
            browser: RwLock::new(Some(browser)),
            config,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, DriverError> {
        let browser = self
            .browser
            .read()
            .await
            .clone()
            .ok_or(DriverError::SessionClosed)?;
        let user_agent = self.config.user_agent.clone();
        let navigation_timeout = Duration::from_millis(self.config.navigation_timeout_ms);

        let tab = blocking(move || {
            let tab = browser
                .new_tab()
                .map_err(|e| DriverError::Browser(format!("Failed to create tab: {}", e)))?;
            tab.set_default_timeout(navigation_timeout);

            // Tabs share the browser's cookie jar; every check starts without one.
            tab.call_method(Network::ClearBrowserCookies(None))
                .map_err(|e| DriverError::Browser(format!("Failed to clear cookies: {}", e)))?;

            if let Some(user_agent) = &user_agent {
                tab.set_user_agent(user_agent, None, None)
                    .map_err(|e| DriverError::Browser(format!("Failed to set user agent: {}", e)))?;
            }

            Ok(tab)
        })
        .await?;

        Ok(Box::new(ChromePage { tab }))
    }

    async fn close(&self) -> Result<(), DriverError> {
        let browser = self.browser.write().await.take().ok_or(DriverError::SessionClosed)?;
        // Dropping the last handle terminates the Chrome process.
        blocking(move || {
            drop(browser);
            Ok(())
        })
        .await?;
        tracing::info!("Browser closed");
        Ok(())
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    fn page_is_settled(tab: &Tab) -> bool {
        tab.evaluate("document.readyState", false)
            .ok()
            .and_then(|result| result.value)
            .and_then(|value| value.as_str().map(|state| state == "complete"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();
        blocking(move || {
            tab.navigate_to(&url)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| DriverError::Navigation {
                    url: url.clone(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn wait_for_element(
        &self,
        locator: &str,
        kind: LocatorKind,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError> {
        let tab = Arc::clone(&self.tab);
        let query = locator.to_string();
        let outcome = poll_blocking(timeout, move || {
            let found = match kind {
                LocatorKind::XPath => tab.find_element_by_xpath(&query).is_ok(),
                LocatorKind::Css => tab.find_element(&query).is_ok(),
            };
            found.then_some(())
        })
        .await?;

        let locator = locator.to_string();
        match outcome {
            PollOutcome::Ready(()) => Ok(ElementHandle { locator, kind }),
            PollOutcome::Cancelled => Err(DriverError::Cancelled),
            PollOutcome::Expired => {
                let tab = Arc::clone(&self.tab);
                if blocking(move || Ok(Self::page_is_settled(&tab))).await? {
                    Err(DriverError::NotFound { locator, kind })
                } else {
                    Err(DriverError::Timeout(timeout))
                }
            }
        }
    }

    async fn element_text(&self, element: &ElementHandle) -> Result<Option<String>, DriverError> {
        let tab = Arc::clone(&self.tab);
        let element = element.clone();
        blocking(move || {
            let found = match element.kind {
                LocatorKind::XPath => tab.find_element_by_xpath(&element.locator),
                LocatorKind::Css => tab.find_element(&element.locator),
            }
            .map_err(|e| DriverError::Browser(format!("Element '{}' disappeared: {}", element.locator, e)))?;

            let result = found
                .call_js_fn("function() { return this.textContent; }", vec![], false)
                .map_err(|e| DriverError::Browser(format!("Failed to read text content: {}", e)))?;

            Ok(result.value.and_then(|value| value.as_str().map(str::to_string)))
        })
        .await
    }

    async fn close(&self) -> Result<(), DriverError> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.close(true)
                .map(|_| ())
                .map_err(|e| DriverError::Browser(format!("Failed to close tab: {}", e)))
        })
        .await
    }
}
