//! Core error types for crudkit
//!
//! Every failure the query engine can report is one of these variants. They are
//! raised at the point of misuse and surfaced to the immediate caller; nothing
//! here is retried.

use thiserror::Error;

use crate::config::ConfigError;

/// Core error type for all query and repository operations
#[derive(Error, Debug)]
pub enum QsError {
    #[error("{parameter} is out of range ({value}): {message}")]
    OutOfRange {
        parameter: &'static str,
        value: i64,
        message: String,
    },

    #[error(
        "Validation failed: found {count} primary order terms, only one is allowed; \
         use then_by/then_by_descending for additional sort keys"
    )]
    DuplicatePrimaryOrder { count: usize },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown property {property} on {entity}")]
    UnknownProperty { entity: String, property: String },

    #[error("Property {property} on {entity} is not a navigation property")]
    NotNavigable { entity: String, property: String },

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Invalid operation: more than one {entity} matched a single-result lookup")]
    MultipleMatches { entity: &'static str },

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Filter codec error
///
/// Produced when a filter payload cannot be turned back into a predicate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing required key '{key}'")]
    MissingKey { key: String },

    #[error("predicate text cannot be null")]
    NullText,

    #[error("predicate text must be a string, found {found}")]
    NotAString { found: String },

    #[error("predicate text cannot be empty")]
    EmptyText,

    #[error("unable to parse filter expression '{text}': {reason}")]
    Unparsable { text: String, reason: String },

    #[error("invalid filter payload: {0}")]
    InvalidPayload(String),
}

impl QsError {
    /// Shorthand for an out-of-range error
    pub fn out_of_range(parameter: &'static str, value: i64, message: impl Into<String>) -> Self {
        QsError::OutOfRange {
            parameter,
            value,
            message: message.into(),
        }
    }

    pub fn unknown_property(entity: impl Into<String>, property: impl Into<String>) -> Self {
        QsError::UnknownProperty {
            entity: entity.into(),
            property: property.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QsError::Cancelled)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            QsError::OutOfRange { .. }
            | QsError::DuplicatePrimaryOrder { .. }
            | QsError::Validation(_)
            | QsError::UnknownProperty { .. }
            | QsError::NotNavigable { .. } => 422,
            QsError::Format(_) => 400,
            QsError::MultipleMatches { .. } => 409,
            QsError::NotFound { .. } => 404,
            QsError::Cancelled => 499,
            QsError::Provider(_) => 502,
            QsError::Internal(_) | QsError::Config(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            QsError::OutOfRange { .. } => "out_of_range",
            QsError::DuplicatePrimaryOrder { .. } | QsError::Validation(_) => "validation_failed",
            QsError::UnknownProperty { .. } => "unknown_property",
            QsError::NotNavigable { .. } => "not_navigable",
            QsError::Format(_) => "format_error",
            QsError::MultipleMatches { .. } => "multiple_matches",
            QsError::NotFound { .. } => "not_found",
            QsError::Cancelled => "cancelled",
            QsError::Provider(_) => "provider_error",
            QsError::Internal(_) => "internal_error",
            QsError::Config(_) => "configuration_error",
        }
    }

    /// Message suitable for showing to an end user.
    ///
    /// Engine diagnostics stay out of it, except for filter parse errors where
    /// the offending text helps the user fix the input.
    pub fn user_message(&self) -> String {
        match self {
            QsError::Format(err) => err.to_string(),
            QsError::OutOfRange { parameter, .. } => format!("Invalid value for {}", parameter),
            QsError::DuplicatePrimaryOrder { .. } | QsError::Validation(_) => {
                "The query is not valid".to_string()
            }
            QsError::UnknownProperty { property, .. } | QsError::NotNavigable { property, .. } => {
                format!("Unknown field: {}", property)
            }
            QsError::MultipleMatches { .. } => "More than one record matched".to_string(),
            QsError::NotFound { .. } => "The requested record was not found".to_string(),
            QsError::Cancelled => "The request was cancelled".to_string(),
            QsError::Provider(_) | QsError::Internal(_) | QsError::Config(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }
}
