use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyReason {
    InStock,
    StructureChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No page could be opened in the shared session.
    Page,
    Navigation,
    Selector,
    Extraction,
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Page => "page",
            FailureKind::Navigation => "navigation",
            FailureKind::Selector => "selector",
            FailureKind::Extraction => "extraction",
            FailureKind::Panicked => "panicked",
        };
        f.write_str(name)
    }
}

/// Result of checking one page target in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Notified { reason: NotifyReason },
    NoChange,
    Failed { kind: FailureKind, reason: String },
}

impl CheckOutcome {
    pub fn failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        CheckOutcome::Failed {
            kind,
            reason: reason.into(),
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            CheckOutcome::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
