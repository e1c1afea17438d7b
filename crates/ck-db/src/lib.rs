//! # ck-db
//!
//! Repository layer for crudkit.
//!
//! This crate executes query descriptions against entity stores, including:
//!
//! - The `EntityStore` provider trait
//! - Repository orchestration for lists, single lookups, counts and pages
//! - Batch deletes that respect soft-delete capability
//! - An in-memory store
//! - SQL rendering of plans for PostgreSQL providers
//!
//! ## Example
//!
//! ```ignore
//! use ck_db::{InMemoryStore, Repository};
//! use tokio_util::sync::CancellationToken;
//!
//! let repo = Repository::new(InMemoryStore::with_rows(customers));
//! let query = repo.query().filter_text("Age >= 18")?.page(1, 20)?.build();
//!
//! let page = repo.page(&query, &CancellationToken::new()).await?;
//! ```

pub mod store;
pub mod repository;
pub mod memory;
pub mod sql;

#[cfg(test)]
mod fixtures;

// Re-exports
pub use store::EntityStore;
pub use repository::{DeleteSummary, Repository};
pub use memory::{InMemoryStore, StoreCalls};
pub use sql::{column_name, SqlRenderer, SqlStatement};
