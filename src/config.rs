use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::PageTarget;

pub const ENV_PREFIX: &str = "STOCKWATCH";
pub const WEBHOOK_ENV: &str = "STOCKWATCH_WEBHOOK";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    pub pages: Vec<PageTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Maximum number of page checks in flight at once.
    pub parallelism: usize,
    /// Re-navigations allowed when a page never settles.
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    /// Bounded wait for each locator lookup.
    pub selector_timeout_ms: u64,
    pub error_alert_minute_modulus: u32,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            parallelism: 3,
            max_retries: 3,
            retry_delay_ms: 1000,
            selector_timeout_ms: 30_000,
            error_alert_minute_modulus: 20,
        }
    }
}

impl CheckerConfig {
    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub headless: bool,
    pub sandbox: bool,
    pub navigation_timeout_ms: u64,
    pub idle_browser_timeout_ms: u64,
    pub user_agent: Option<String>,
    pub chrome_path: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: false,
            navigation_timeout_ms: 30_000,
            idle_browser_timeout_ms: 300_000,
            user_agent: None,
            chrome_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub webhook_file: PathBuf,
    pub log_dir: PathBuf,
    pub errors_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            webhook_file: PathBuf::from("config/webhook.txt"),
            log_dir: PathBuf::from("out/logs"),
            errors_file: PathBuf::from("out/logs/errors.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Ifttt,
    Discord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub transport: Transport,
    pub discord_username: String,
    /// Second field of the aggregate "N ERRORS!" alert.
    pub error_detail: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Ifttt,
            discord_username: "Uatu Stockwatch".to_string(),
            error_detail: "See out/logs/errors.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the page list and settings from `path`, then applies
    /// `STOCKWATCH_*` environment overrides (`__` separates sections, as in
    /// `STOCKWATCH_CHECKER__PARALLELISM`).
    ///
    /// Nothing is validated here; call [`validate`](Self::validate) once the
    /// final overrides are applied and logging is up.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checker.parallelism == 0 {
            return Err(ConfigError::Message("Checker parallelism must be greater than 0".into()));
        }

        let modulus = self.checker.error_alert_minute_modulus;
        if modulus == 0 || modulus > 60 {
            return Err(ConfigError::Message(
                "Checker error_alert_minute_modulus must be between 1 and 60".into(),
            ));
        }

        if self.checker.selector_timeout_ms == 0 {
            return Err(ConfigError::Message("Checker selector_timeout_ms must be greater than 0".into()));
        }

        if self.scraper.navigation_timeout_ms == 0 {
            return Err(ConfigError::Message("Scraper navigation_timeout_ms must be greater than 0".into()));
        }

        for page in &self.pages {
            page.validate().map_err(ConfigError::Message)?;
        }

        let mut seen = HashSet::new();
        for page in &self.pages {
            if !seen.insert(page.identity()) {
                tracing::warn!("Page {} is configured more than once", page.identity());
            }
        }

        Ok(())
    }

    /// Resolves the webhook secret: `STOCKWATCH_WEBHOOK` wins over the file.
    pub fn load_webhook(&self) -> Result<String, ConfigError> {
        let raw = match env::var(WEBHOOK_ENV) {
            Ok(value) => value,
            Err(_) => std::fs::read_to_string(&self.paths.webhook_file).map_err(|e| {
                ConfigError::Message(format!(
                    "Failed to read webhook file {}: {}",
                    self.paths.webhook_file.display(),
                    e
                ))
            })?,
        };

        let webhook = raw.trim().to_string();
        if webhook.is_empty() {
            return Err(ConfigError::Message("Webhook secret is empty".into()));
        }

        if self.notifications.transport == Transport::Discord
            && !webhook.starts_with("https://discord.com/api/webhooks/")
        {
            return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
        }

        Ok(webhook)
    }
}
