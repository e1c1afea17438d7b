//! Entity store trait
//!
//! A store is the provider a repository executes plans against. Every call
//! takes a cancellation token; a cancelled call fails with
//! [`QsError::Cancelled`](ck_core::QsError::Cancelled).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ck_core::{Entity, QsResult};
use ck_queries::Queryable;

/// Provider that executes plans and persists entities
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Execute a plan and return the matching rows
    async fn fetch(&self, plan: &Queryable<T>, cancel: &CancellationToken) -> QsResult<Vec<T>>;

    /// Count rows matching a plan's predicates; ordering and paging are ignored
    async fn count(&self, plan: &Queryable<T>, cancel: &CancellationToken) -> QsResult<u64>;

    /// Insert an entity and return the stored form
    async fn insert(&self, entity: T, cancel: &CancellationToken) -> QsResult<T>;

    /// Replace stored entities with the given ones, matched by id
    async fn update_range(&self, entities: Vec<T>, cancel: &CancellationToken) -> QsResult<()>;

    /// Physically remove entities, matched by id
    async fn remove_range(&self, entities: Vec<T>, cancel: &CancellationToken) -> QsResult<()>;
}
