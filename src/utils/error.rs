use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger error: {path}: {message}")]
    Ledger { path: String, message: String },
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
