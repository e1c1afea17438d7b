//! Repository orchestration
//!
//! A [`Repository`] turns query descriptions into plans with the
//! [`QueryPipeline`] and executes them against an [`EntityStore`]. Each
//! logical operation makes a fixed number of store calls: one fetch for a
//! list or a single lookup, one count, and a fetch plus a count for a page.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use ck_core::{Entity, Id, PagedResult, QsError, QsResult, QueryConfig};
use ck_queries::{field, Query, QueryBuilder, QueryPipeline, Queryable};

use crate::store::EntityStore;

/// Outcome of a delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Entities marked deleted and written back
    pub soft_deleted: usize,
    /// Entities physically removed
    pub removed: usize,
}

/// Query and persistence operations for one entity type
pub struct Repository<T, S> {
    store: Arc<S>,
    pipeline: QueryPipeline,
    config: QueryConfig,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> Repository<T, S>
where
    T: Entity,
    S: EntityStore<T>,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, QueryConfig::default())
    }

    pub fn with_config(store: S, config: QueryConfig) -> Self {
        Self {
            store: Arc::new(store),
            pipeline: QueryPipeline::global(),
            config,
            _entity: PhantomData,
        }
    }

    /// Use a pipeline other than the process-wide one
    pub fn with_pipeline(mut self, pipeline: QueryPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// A builder seeded with the configured defaults
    pub fn query(&self) -> QueryBuilder<T> {
        QueryBuilder::new().auto_include(self.config.auto_include)
    }

    // Reads

    /// All rows matching the query, projected
    pub async fn list<R: 'static>(
        &self,
        query: &Query<T, R>,
        cancel: &CancellationToken,
    ) -> QsResult<Vec<R>> {
        let projected = self.pipeline.evaluate(Queryable::new(), query)?;
        let rows = self.store.fetch(projected.source(), cancel).await?;
        tracing::debug!(entity = T::TYPE_NAME, rows = rows.len(), "Listed entities");
        Ok(projected.project(&rows))
    }

    /// The single row matching the query, if any
    ///
    /// At most two rows are fetched; a second row means the lookup was
    /// ambiguous and fails with [`QsError::MultipleMatches`].
    pub async fn find_one<R: 'static>(
        &self,
        query: &Query<T, R>,
        cancel: &CancellationToken,
    ) -> QsResult<Option<R>> {
        let plan = self.pipeline.evaluate_unpaged(Queryable::new(), query)?;
        let projected = self.pipeline.project(plan, query)?.map_source(|plan| plan.take(2));
        let rows = self.store.fetch(projected.source(), cancel).await?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(Some(projected.project_one(row))),
            _ => {
                tracing::debug!(entity = T::TYPE_NAME, "Single-result lookup matched several rows");
                Err(QsError::MultipleMatches {
                    entity: T::TYPE_NAME,
                })
            }
        }
    }

    pub async fn find_by_id(&self, id: Id, cancel: &CancellationToken) -> QsResult<Option<T>> {
        let query = QueryBuilder::<T>::new()
            .filter_expr(field(T::KEY).equals(id))?
            .build();
        self.find_one(&query, cancel).await
    }

    /// Like [`find_by_id`](Self::find_by_id), with a missing row as an error
    pub async fn get_by_id(&self, id: Id, cancel: &CancellationToken) -> QsResult<T> {
        self.find_by_id(id, cancel)
            .await?
            .ok_or_else(|| QsError::NotFound {
                entity: T::TYPE_NAME,
                field: T::KEY,
                value: id.to_string(),
            })
    }

    /// Number of rows matching the query's filters and search
    pub async fn count<R>(&self, query: &Query<T, R>, cancel: &CancellationToken) -> QsResult<u64> {
        let plan = self.pipeline.evaluate_unpaged(Queryable::new(), query)?;
        let total = self.store.count(&plan, cancel).await?;
        tracing::debug!(entity = T::TYPE_NAME, total, "Counted entities");
        Ok(total)
    }

    /// One page of rows plus the total across all pages
    ///
    /// The query must carry both skip and take, and take may not exceed the
    /// configured maximum page size.
    pub async fn page<R: 'static>(
        &self,
        query: &Query<T, R>,
        cancel: &CancellationToken,
    ) -> QsResult<PagedResult<R>> {
        let (skip, take) = self.page_bounds(query)?;

        let projected = self.pipeline.evaluate(Queryable::new(), query)?;
        let rows = self.store.fetch(projected.source(), cancel).await?;
        let total = self.store.count(&projected.source().unpaged(), cancel).await?;

        tracing::debug!(
            entity = T::TYPE_NAME,
            skip,
            take,
            rows = rows.len(),
            total,
            "Fetched page"
        );
        Ok(PagedResult::new(rows, total, skip, take).map(|row| projected.project_one(&row)))
    }

    fn page_bounds<R>(&self, query: &Query<T, R>) -> QsResult<(u64, u64)> {
        let skip = query
            .skip()
            .ok_or_else(|| QsError::out_of_range("skip", 0, "skip is required for a paged lookup"))?;
        let take = query
            .take()
            .ok_or_else(|| QsError::out_of_range("take", 0, "take is required for a paged lookup"))?;
        if take > self.config.max_page_size {
            return Err(QsError::out_of_range(
                "take",
                take as i64,
                format!("take cannot exceed {}", self.config.max_page_size),
            ));
        }
        Ok((skip, take))
    }

    // Writes

    pub async fn add(&self, entity: T, cancel: &CancellationToken) -> QsResult<T> {
        let stored = self.store.insert(entity, cancel).await?;
        tracing::debug!(entity = T::TYPE_NAME, id = ?stored.id(), "Added entity");
        Ok(stored)
    }

    pub async fn update(&self, entity: T, cancel: &CancellationToken) -> QsResult<()> {
        if entity.is_new_record() {
            return Err(QsError::Validation(format!(
                "{} has not been stored yet",
                T::TYPE_NAME
            )));
        }
        let id = entity.id();
        self.store.update_range(vec![entity], cancel).await?;
        tracing::debug!(entity = T::TYPE_NAME, id = ?id, "Updated entity");
        Ok(())
    }

    pub async fn delete(&self, entity: T, cancel: &CancellationToken) -> QsResult<DeleteSummary> {
        self.delete_range(vec![entity], cancel).await
    }

    /// Delete a batch
    ///
    /// Entities that support soft deletion are marked deleted and written
    /// back; the rest are removed. The store is only called for a non-empty
    /// subset.
    pub async fn delete_range(
        &self,
        entities: Vec<T>,
        cancel: &CancellationToken,
    ) -> QsResult<DeleteSummary> {
        let now = Utc::now();
        let (mut soft, hard): (Vec<T>, Vec<T>) = entities
            .into_iter()
            .partition(|entity| entity.supports_soft_delete());

        for entity in &mut soft {
            if let Some(deletable) = entity.as_soft_deletable_mut() {
                deletable.mark_deleted(now);
            }
        }

        let summary = DeleteSummary {
            soft_deleted: soft.len(),
            removed: hard.len(),
        };
        if !soft.is_empty() {
            self.store.update_range(soft, cancel).await?;
        }
        if !hard.is_empty() {
            self.store.remove_range(hard, cancel).await?;
        }

        tracing::debug!(
            entity = T::TYPE_NAME,
            soft_deleted = summary.soft_deleted,
            removed = summary.removed,
            "Deleted entities"
        );
        Ok(summary)
    }
}

impl<T, S> Clone for Repository<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pipeline: self.pipeline.clone(),
            config: self.config.clone(),
            _entity: PhantomData,
        }
    }
}
