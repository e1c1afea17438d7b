//! Result type aliases

use crate::error::QsError;

/// Standard Result type for crudkit operations
pub type QsResult<T> = Result<T, QsError>;
