//! In-memory entity store
//!
//! Rows live in a `Vec` behind a read-write lock and plans are materialized
//! with [`Queryable::apply`]. Call counters let tests assert how many provider
//! executions an operation performed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use ck_core::{Entity, QsError, QsResult};
use ck_queries::Queryable;

use crate::store::EntityStore;

/// Number of calls made to each store operation
#[derive(Debug, Default)]
pub struct StoreCalls {
    fetches: AtomicUsize,
    counts: AtomicUsize,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    removes: AtomicUsize,
}

impl StoreCalls {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn counts(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    /// Calls of any kind
    pub fn total(&self) -> usize {
        self.fetches() + self.counts() + self.inserts() + self.updates() + self.removes()
    }
}

/// Entity store over an in-memory vector
#[derive(Clone)]
pub struct InMemoryStore<T> {
    rows: Arc<RwLock<Vec<T>>>,
    calls: Arc<StoreCalls>,
}

impl<T: Entity> InMemoryStore<T> {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<T>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
            calls: Arc::new(StoreCalls::default()),
        }
    }

    /// Snapshot of the stored rows
    pub fn rows(&self) -> Vec<T> {
        self.rows.read().clone()
    }

    pub fn calls(&self) -> &StoreCalls {
        &self.calls
    }

    fn check(cancel: &CancellationToken) -> QsResult<()> {
        if cancel.is_cancelled() {
            return Err(QsError::Cancelled);
        }
        Ok(())
    }

    fn position(rows: &[T], entity: &T) -> QsResult<usize> {
        let id = entity.id().ok_or_else(|| {
            QsError::Validation(format!("{} has no id", T::TYPE_NAME))
        })?;
        rows.iter()
            .position(|row| row.id() == Some(id))
            .ok_or_else(|| QsError::NotFound {
                entity: T::TYPE_NAME,
                field: T::KEY,
                value: id.to_string(),
            })
    }
}

impl<T: Entity> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for InMemoryStore<T> {
    async fn fetch(&self, plan: &Queryable<T>, cancel: &CancellationToken) -> QsResult<Vec<T>> {
        self.calls.fetches.fetch_add(1, Ordering::SeqCst);
        Self::check(cancel)?;
        let rows = self.rows.read().clone();
        Ok(plan.apply(rows))
    }

    async fn count(&self, plan: &Queryable<T>, cancel: &CancellationToken) -> QsResult<u64> {
        self.calls.counts.fetch_add(1, Ordering::SeqCst);
        Self::check(cancel)?;
        let rows = self.rows.read();
        Ok(rows.iter().filter(|row| plan.matches(row)).count() as u64)
    }

    async fn insert(&self, entity: T, cancel: &CancellationToken) -> QsResult<T> {
        self.calls.inserts.fetch_add(1, Ordering::SeqCst);
        Self::check(cancel)?;
        let id = entity.id().ok_or_else(|| {
            QsError::Validation(format!("{} must have an id before it is stored", T::TYPE_NAME))
        })?;

        let mut rows = self.rows.write();
        if rows.iter().any(|row| row.id() == Some(id)) {
            return Err(QsError::Validation(format!(
                "{} with {}={} already exists",
                T::TYPE_NAME,
                T::KEY,
                id
            )));
        }
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn update_range(&self, entities: Vec<T>, cancel: &CancellationToken) -> QsResult<()> {
        self.calls.updates.fetch_add(1, Ordering::SeqCst);
        Self::check(cancel)?;
        let mut rows = self.rows.write();
        let positions = entities
            .iter()
            .map(|entity| Self::position(&rows, entity))
            .collect::<QsResult<Vec<_>>>()?;
        for (position, entity) in positions.into_iter().zip(entities) {
            rows[position] = entity;
        }
        Ok(())
    }

    async fn remove_range(&self, entities: Vec<T>, cancel: &CancellationToken) -> QsResult<()> {
        self.calls.removes.fetch_add(1, Ordering::SeqCst);
        Self::check(cancel)?;
        let mut rows = self.rows.write();
        for entity in &entities {
            Self::position(&rows, entity)?;
        }
        let ids: Vec<_> = entities.iter().filter_map(|e| e.id()).collect();
        rows.retain(|row| !row.id().is_some_and(|id| ids.contains(&id)));
        Ok(())
    }
}
