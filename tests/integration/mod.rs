// Shared fixtures for the end-to-end run tests: an in-memory browser whose
// pages behave per URL, and a notifier that records what it was asked to send.

pub mod ledger_tests;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uatu_stockwatch::config::{CheckerConfig, NotificationsConfig, PathsConfig, ScraperConfig};
use uatu_stockwatch::plugins::{NotificationEvent, Notifier, NotifierError};
use uatu_stockwatch::scraper::{BrowserSession, DriverError, ElementHandle, LocatorKind, PageHandle};
use uatu_stockwatch::{AppConfig, ErrorRecord, PageTarget};

/// How a stub page answers once loaded.
#[derive(Debug, Clone)]
pub enum PageBehaviour {
    /// The primary locator matches an element with this text.
    Text(String),
    /// Neither locator matches on a settled page.
    LayoutChanged,
    NavigationFails,
    /// The page never settles.
    Hangs,
}

pub struct StubBrowser {
    pages: Arc<HashMap<String, PageBehaviour>>,
    pub closes: Arc<AtomicUsize>,
    pub pages_opened: Arc<AtomicUsize>,
    pub pages_closed: Arc<AtomicUsize>,
}

impl StubBrowser {
    pub fn new(pages: Vec<(&PageTarget, PageBehaviour)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().map(|(t, b)| (t.url.clone(), b)).collect()),
            closes: Arc::new(AtomicUsize::new(0)),
            pages_opened: Arc::new(AtomicUsize::new(0)),
            pages_closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl BrowserSession for StubBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, DriverError> {
        self.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubPage {
            pages: Arc::clone(&self.pages),
            loaded: Mutex::new(None),
            closed: Arc::clone(&self.pages_closed),
        }))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StubPage {
    pages: Arc<HashMap<String, PageBehaviour>>,
    loaded: Mutex<Option<PageBehaviour>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl PageHandle for StubPage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let behaviour = self.pages.get(url).cloned().unwrap_or(PageBehaviour::LayoutChanged);
        if let PageBehaviour::NavigationFails = behaviour {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        *self.loaded.lock().unwrap() = Some(behaviour);
        Ok(())
    }

    async fn wait_for_element(
        &self,
        locator: &str,
        kind: LocatorKind,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError> {
        let behaviour = self.loaded.lock().unwrap().clone();
        match (behaviour, kind) {
            (Some(PageBehaviour::Text(_)), LocatorKind::XPath) => Ok(ElementHandle {
                locator: locator.to_string(),
                kind,
            }),
            (Some(PageBehaviour::Hangs), _) => Err(DriverError::Timeout(timeout)),
            _ => Err(DriverError::NotFound {
                locator: locator.to_string(),
                kind,
            }),
        }
    }

    async fn element_text(&self, _element: &ElementHandle) -> Result<Option<String>, DriverError> {
        match self.loaded.lock().unwrap().clone() {
            Some(PageBehaviour::Text(text)) => Ok(Some(text)),
            _ => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<NotificationEvent>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn headlines(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(NotificationEvent::headline).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(NotifierError::Rejected {
                status: 500,
                body: "transport down".to_string(),
            });
        }
        Ok(())
    }
}

pub fn target(vendor: &str, product: &str, idx: usize) -> PageTarget {
    PageTarget {
        vendor: vendor.to_string(),
        product: product.to_string(),
        url: format!("https://store.example.org/{}/{}", vendor.to_lowercase(), idx),
        primary_locator: "//*[@id='add-to-cart']".to_string(),
        secondary_locator: "#add-to-cart".to_string(),
        unavailable_indicator: "Sold Out".to_string(),
    }
}

pub fn test_config(errors_file: &Path, pages: Vec<PageTarget>) -> AppConfig {
    AppConfig {
        checker: CheckerConfig {
            parallelism: 2,
            max_retries: 2,
            retry_delay_ms: 1,
            selector_timeout_ms: 20,
            ..CheckerConfig::default()
        },
        scraper: ScraperConfig::default(),
        paths: PathsConfig {
            errors_file: errors_file.to_path_buf(),
            ..PathsConfig::default()
        },
        notifications: NotificationsConfig::default(),
        pages,
    }
}

pub fn at_minute(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 11, 26, 6, minute, 0).unwrap()
}

pub fn read_ledger(path: &Path) -> Vec<ErrorRecord> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn write_ledger(path: &Path, records: &[ErrorRecord]) {
    std::fs::write(path, serde_json::to_string(records).unwrap()).unwrap();
}
