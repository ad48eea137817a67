use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Driver runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversion { expected: &'static str, actual: String },

    #[error("Unexpected null value for non-nullable field")]
    UnexpectedNull,

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Record is not attached to a data context")]
    Detached,

    #[error("Statement did not return rows: {0}")]
    NotARead(String),

    #[error("Query error: {0}")]
    Query(String),
}
