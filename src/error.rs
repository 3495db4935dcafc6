use thiserror::Error;

#[derive(Error, Debug)]
pub enum DsmError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed CSV input. Carries the first parser error message.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown dealer: {0}")]
    UnknownDealer(String),

    #[error("Dealer name is required")]
    InvalidDealerName,

    #[error("Unknown field '{field}' for {kind} mapping")]
    UnknownField { kind: String, field: String },

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("Mapping is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DsmError>;
