use serde::{Deserialize, Serialize};
use url::Url;

/// One monitored product page and the rules for reading its stock state.
///
/// Accepts both the legacy camelCase keys (`xpath`, `selector`,
/// `unavailableIndicator`) and snake_case field names when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTarget {
    pub vendor: String,
    pub product: String,
    pub url: String,
    /// XPath expression for the stock element.
    #[serde(alias = "xpath")]
    pub primary_locator: String,
    /// CSS selector raced against the XPath lookup.
    #[serde(alias = "selector")]
    pub secondary_locator: String,
    #[serde(alias = "unavailableIndicator", alias = "unavailableindicator")]
    pub unavailable_indicator: String,
}

impl PageTarget {
    /// Targets are deduplicated by URL across runs.
    pub fn identity(&self) -> &str {
        &self.url
    }

    /// True when `text` still reads as the configured "unavailable" marker.
    /// Missing or blank text never counts as unavailable.
    pub fn reads_unavailable(&self, text: Option<&str>) -> bool {
        match text.map(str::trim) {
            Some(text) if !text.is_empty() => {
                text.to_lowercase() == self.unavailable_indicator.trim().to_lowercase()
            }
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.vendor.trim().is_empty() {
            return Err(format!("Page {} has an empty vendor", self.url));
        }

        match Url::parse(&self.url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(format!("Page URL {} has unsupported scheme '{}'", self.url, url.scheme()));
            }
            Err(e) => return Err(format!("Invalid page URL '{}': {}", self.url, e)),
        }

        if self.primary_locator.trim().is_empty() || self.secondary_locator.trim().is_empty() {
            return Err(format!("Page {} needs both an xpath and a selector", self.url));
        }

        Ok(())
    }
}
