//! Error types for pgrecord

use crate::shape::ShapeErrors;
use thiserror::Error;

/// Result type alias for pgrecord operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for schema, payload and persistence operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Payload is not a valid single-row or multi-row mapping.
    #[error("Invalid payload shape: {0}")]
    Shape(ShapeErrors),

    /// Value kind disagrees with the column's declared data type.
    #[error("Type mismatch on field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// Access to an entry that is not declared on the record.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// An operation was called in a state where it is not legal.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Failure surfaced by the statement executor.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn is_shape(&self) -> bool {
        matches!(self, Self::Shape(_))
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    pub fn is_unknown_field(&self) -> bool {
        matches!(self, Self::UnknownField(_))
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Check if this error came from the storage side (executor, connection or pool).
    pub fn is_storage(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Query(_) | Self::Connection(_) => true,
            #[cfg(feature = "pool")]
            Self::Pool(_) => true,
            _ => false,
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Parse a tokio_postgres error into an OrmError.
    ///
    /// Errors carrying a server-side message are flattened into [`OrmError::Storage`] so the
    /// caller sees a single storage kind; transport errors keep their source.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let message = match db_err.constraint() {
                Some(constraint) => format!("{constraint}: {}", db_err.message()),
                None => db_err.message().to_string(),
            };
            return Self::Storage(format!("[{}] {message}", db_err.code().code()));
        }
        Self::Query(err)
    }

    /// Re-wrap any storage-side failure as [`OrmError::Storage`], keeping its message.
    ///
    /// Non-storage errors pass through untouched.
    pub fn into_storage(self) -> Self {
        match self {
            Self::Storage(_) => self,
            other if other.is_storage() => Self::Storage(other.to_string()),
            other => other,
        }
    }
}

impl From<ShapeErrors> for OrmError {
    fn from(errors: ShapeErrors) -> Self {
        Self::Shape(errors)
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_predicate_covers_connection_failures() {
        assert!(OrmError::storage("boom").is_storage());
        assert!(OrmError::Connection("refused".into()).is_storage());
        assert!(!OrmError::precondition("nope").is_storage());
    }

    #[test]
    fn into_storage_rewraps_connection_errors() {
        let err = OrmError::Connection("refused".into()).into_storage();
        match err {
            OrmError::Storage(msg) => assert_eq!(msg, "Connection error: refused"),
            other => panic!("unexpected: {other:?}"),
        }

        let err = OrmError::UnknownField("x".into()).into_storage();
        assert!(err.is_unknown_field());
    }

    #[test]
    fn type_mismatch_message_names_both_kinds() {
        let err = OrmError::type_mismatch("age", "integer", "string");
        assert_eq!(
            err.to_string(),
            "Type mismatch on field 'age': expected integer, found string"
        );
    }
}
