use anyhow::{Context, Result};
use std::fmt::Display;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "uatu_stockwatch=info";
const MAX_LOG_FILES: usize = 10;

/// Installs the process-wide subscriber: stdout plus a daily-rotated file in
/// `log_dir`. Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix("stockwatch")
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .context("Failed to create rolling log file")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Logger handed to one check task. Every line is prefixed with the task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLogger {
    id: usize,
}

impl TaskLogger {
    pub fn new(id: usize) -> Self {
        Self { id }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn line(&self, message: impl Display) -> String {
        format!("[{}] {}", self.id, message)
    }

    pub fn debug(&self, message: impl Display) {
        tracing::debug!(task = self.id, "{}", self.line(message));
    }

    pub fn info(&self, message: impl Display) {
        tracing::info!(task = self.id, "{}", self.line(message));
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!(task = self.id, "{}", self.line(message));
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!(task = self.id, "{}", self.line(message));
    }
}
