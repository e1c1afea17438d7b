//! # ck-core
//!
//! Core types, traits, and utilities for crudkit.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types
//! - Result type aliases
//! - Core traits (Entity, Identifiable, SoftDeletable)
//! - Dynamic values and declarative entity schemas
//! - Pagination types
//! - Configuration types

pub mod error;
pub mod result;
pub mod traits;
pub mod value;
pub mod schema;
pub mod pagination;
pub mod config;

pub use error::*;
pub use result::*;
pub use traits::*;
pub use value::*;
pub use schema::*;
pub use pagination::*;
pub use config::{ConfigError, QueryConfig};
