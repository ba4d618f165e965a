use thiserror::Error;

/// Row-count violations for queries that expect exactly one row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardinalityError {
    #[error("No result for {0}")]
    NoResult(String),

    #[error("Multiple results for {0}")]
    MultipleResults(String),
}

#[derive(Debug, Error)]
pub enum SqlMapperError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Cardinality(#[from] CardinalityError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Column [{0}] not present in the result set")]
    ColumnNotFound(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SqlMapperError {
    /// True for the compile-time structural failures (`ConfigError`).
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}

#[cfg(feature = "sqlite")]
impl From<bb8::RunError<rusqlite::Error>> for SqlMapperError {
    fn from(err: bb8::RunError<rusqlite::Error>) -> Self {
        SqlMapperError::ConnectionError(format!("SQLite pool error: {err}"))
    }
}
