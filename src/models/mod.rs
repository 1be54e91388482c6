pub mod error_record;
pub mod outcome;
pub mod page_target;

// Re-exports for convenience
pub use error_record::ErrorRecord;
pub use outcome::{CheckOutcome, FailureKind, NotifyReason};
pub use page_target::PageTarget;
