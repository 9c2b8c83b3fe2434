use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("invalid artifact reference '{0}'")]
    InvalidReference(String),

    #[error("artifact store error: {0}")]
    Store(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("column '{column}' row {row}: cannot parse '{value}' as a number")]
    BadNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error("malformed table: {0}")]
    Table(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CleanerError>;
