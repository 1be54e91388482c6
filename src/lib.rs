pub mod app;
pub mod config;
pub mod element_finder;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod page_checker;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use app::{RunReport, StockWatcher};
pub use config::AppConfig;
pub use models::{CheckOutcome, ErrorRecord, FailureKind, NotifyReason, PageTarget};
pub use utils::error::AppError;
