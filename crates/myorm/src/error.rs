//! Error types for myorm

use thiserror::Error;

/// Result type alias for myorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed driver error, carried through unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Invalid or incomplete configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Database connection error (connect failed or the link broke)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction state error (commit/rollback outside a transaction, nested begin)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The connection has been freed and can no longer be used
    #[error("Connection is closed")]
    Closed,

    /// Statement execution error reported by the engine
    #[error("Query error: {0}")]
    Query(String),

    /// Error raised by the underlying driver
    #[error("Driver error: {0}")]
    Driver(#[source] BoxError),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap an arbitrary driver error
    pub fn driver(err: impl Into<BoxError>) -> Self {
        Self::Driver(err.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the error means the physical link is no longer usable.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Closed)
    }
}

impl From<deadpool::managed::PoolError<OrmError>> for OrmError {
    fn from(err: deadpool::managed::PoolError<OrmError>) -> Self {
        match err {
            deadpool::managed::PoolError::Backend(err) => err,
            other => Self::Pool(other.to_string()),
        }
    }
}

impl From<deadpool::managed::BuildError> for OrmError {
    fn from(err: deadpool::managed::BuildError) -> Self {
        Self::Pool(err.to_string())
    }
}
