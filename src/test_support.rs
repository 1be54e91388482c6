//! Scriptable in-memory browser for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::PageTarget;
use crate::scraper::{BrowserSession, DriverError, ElementHandle, LocatorKind, PageHandle};

pub fn sample_target(idx: usize) -> PageTarget {
    PageTarget {
        vendor: "BestBuy".to_string(),
        product: format!("Console {}", idx),
        url: format!("https://shop.example.com/item/{}", idx),
        primary_locator: "//div[@class='fulfillment']/button".to_string(),
        secondary_locator: "div.fulfillment button".to_string(),
        unavailable_indicator: "Sold Out".to_string(),
    }
}

#[derive(Debug, Clone)]
pub enum Lookup {
    Found,
    FoundAfter(Duration),
    NotFound,
    Timeout,
    Fail(String),
}

/// Behaviour of a page. Lookup lists are indexed by how many times the page
/// was loaded; the last entry repeats and an empty list means "not found".
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    pub primary: Vec<Lookup>,
    pub secondary: Vec<Lookup>,
    pub text: Option<String>,
    pub text_error: Option<String>,
    pub navigation_error: Option<String>,
    /// Navigation index from which `navigation_error` applies.
    pub navigation_error_from: usize,
    pub navigation_delay: Duration,
    pub panic_on_navigate: bool,
}

impl PageScript {
    pub fn in_stock_text(text: &str) -> Self {
        Self {
            primary: vec![Lookup::Found],
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeStats {
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub session_closes: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl FakeStats {
    fn page_opened(&self) {
        self.pages_opened.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn page_closed(&self) {
        self.pages_closed.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

type ScriptLookup = Arc<dyn Fn(&str) -> PageScript + Send + Sync>;

pub struct FakePage {
    script_for: ScriptLookup,
    current: Mutex<PageScript>,
    navigations: AtomicUsize,
    stats: Arc<FakeStats>,
}

impl FakePage {
    pub fn new(script: PageScript) -> Self {
        let template = script.clone();
        Self {
            script_for: Arc::new(move |_| template.clone()),
            current: Mutex::new(script),
            navigations: AtomicUsize::new(0),
            stats: Arc::new(FakeStats::default()),
        }
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    fn script(&self) -> PageScript {
        self.current.lock().unwrap().clone()
    }

    fn pick(&self, kind: LocatorKind) -> Lookup {
        let script = self.script();
        let list = match kind {
            LocatorKind::XPath => script.primary,
            LocatorKind::Css => script.secondary,
        };
        let load = self.navigations().saturating_sub(1);
        list.get(load).or(list.last()).cloned().unwrap_or(Lookup::NotFound)
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let load = self.navigations.fetch_add(1, Ordering::SeqCst);
        let script = (self.script_for)(url);
        *self.current.lock().unwrap() = script.clone();

        if !script.navigation_delay.is_zero() {
            tokio::time::sleep(script.navigation_delay).await;
        }
        if script.panic_on_navigate {
            panic!("renderer crashed on {}", url);
        }
        match script.navigation_error {
            Some(message) if load >= script.navigation_error_from => Err(DriverError::Navigation {
                url: url.to_string(),
                message,
            }),
            _ => Ok(()),
        }
    }

    async fn wait_for_element(
        &self,
        locator: &str,
        kind: LocatorKind,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError> {
        let handle = ElementHandle {
            locator: locator.to_string(),
            kind,
        };
        match self.pick(kind) {
            Lookup::Found => Ok(handle),
            Lookup::FoundAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(handle)
            }
            Lookup::NotFound => Err(DriverError::NotFound {
                locator: locator.to_string(),
                kind,
            }),
            Lookup::Timeout => Err(DriverError::Timeout(timeout)),
            Lookup::Fail(message) => Err(DriverError::Browser(message)),
        }
    }

    async fn element_text(&self, _element: &ElementHandle) -> Result<Option<String>, DriverError> {
        let script = self.script();
        match script.text_error {
            Some(message) => Err(DriverError::Browser(message)),
            None => Ok(script.text),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.stats.page_closed();
        Ok(())
    }
}

/// Session whose pages behave according to the script registered for the URL
/// they navigate to.
pub struct FakeSession {
    scripts: Arc<HashMap<String, PageScript>>,
    pub stats: Arc<FakeStats>,
    pub fail_new_page: bool,
}

impl FakeSession {
    pub fn new(scripts: HashMap<String, PageScript>) -> Self {
        Self {
            scripts: Arc::new(scripts),
            stats: Arc::new(FakeStats::default()),
            fail_new_page: false,
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, DriverError> {
        if self.fail_new_page {
            return Err(DriverError::Browser("Failed to create tab".to_string()));
        }
        self.stats.page_opened();

        let scripts = Arc::clone(&self.scripts);
        Ok(Box::new(FakePage {
            script_for: Arc::new(move |url| scripts.get(url).cloned().unwrap_or_default()),
            current: Mutex::new(PageScript::default()),
            navigations: AtomicUsize::new(0),
            stats: Arc::clone(&self.stats),
        }))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.stats.session_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
