//! Evaluator pipeline
//!
//! Stage order is fixed: where, search, order, include, paging, select.

use std::sync::Arc;

use ck_core::{Entity, QsResult};

use crate::evaluators::{
    Evaluator, IncludeEvaluator, OrderEvaluator, PagingEvaluator, SearchEvaluator,
    SelectEvaluator, WhereEvaluator,
};
use crate::navigation::NavigationRegistry;
use crate::query::Query;
use crate::queryable::{Projected, Queryable};

/// Turns query descriptions into plans
#[derive(Clone)]
pub struct QueryPipeline {
    registry: Arc<NavigationRegistry>,
}

impl QueryPipeline {
    pub fn new(registry: Arc<NavigationRegistry>) -> Self {
        Self { registry }
    }

    /// Pipeline over the process-wide navigation registry
    pub fn global() -> Self {
        Self::new(NavigationRegistry::global())
    }

    pub fn registry(&self) -> &Arc<NavigationRegistry> {
        &self.registry
    }

    /// Run every stage
    pub fn evaluate<T: Entity, R: 'static>(
        &self,
        base: Queryable<T>,
        query: &Query<T, R>,
    ) -> QsResult<Projected<T, R>> {
        let plan = self.evaluate_unpaged(base, query)?;
        let plan = run_stage(&PagingEvaluator, plan, query)?;
        self.project(plan, query)
    }

    /// Run where, search, order and include; used for counts and single lookups
    pub fn evaluate_unpaged<T: Entity, R>(
        &self,
        base: Queryable<T>,
        query: &Query<T, R>,
    ) -> QsResult<Queryable<T>> {
        let plan = run_stage(&WhereEvaluator, base, query)?;
        let plan = run_stage(&SearchEvaluator, plan, query)?;
        let plan = run_stage(&OrderEvaluator, plan, query)?;
        run_stage(&IncludeEvaluator::new(&self.registry), plan, query)
    }

    /// Attach the query's projection to a plan
    pub fn project<T: Entity, R: 'static>(
        &self,
        plan: Queryable<T>,
        query: &Query<T, R>,
    ) -> QsResult<Projected<T, R>> {
        let stage = SelectEvaluator;
        let projected = stage.evaluate(plan, query)?;
        tracing::trace!(stage = stage.name(), entity = T::TYPE_NAME, "Applied query stage");
        Ok(projected)
    }
}

impl Default for QueryPipeline {
    fn default() -> Self {
        Self::global()
    }
}

fn run_stage<T, R, E>(stage: &E, plan: Queryable<T>, query: &Query<T, R>) -> QsResult<Queryable<T>>
where
    T: Entity,
    E: Evaluator<T>,
{
    let plan = stage.evaluate(plan, query).map_err(|e| {
        tracing::debug!(stage = stage.name(), entity = T::TYPE_NAME, error = %e, "Query stage failed");
        e
    })?;
    tracing::trace!(
        stage = stage.name(),
        entity = T::TYPE_NAME,
        predicates = plan.predicates().len(),
        sort_keys = plan.ordering().len(),
        "Applied query stage"
    );
    Ok(plan)
}
