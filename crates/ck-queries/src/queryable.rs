//! Query plans
//!
//! A [`Queryable`] is what the evaluator stages compose: predicates, sort
//! keys, include paths and paging bounds. Composing a plan never touches a
//! provider. In-memory providers materialize it with [`Queryable::apply`];
//! SQL providers render it.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ck_core::{Entity, QsError, QsResult, Value};

use crate::compile::{bind, compile_predicate, read_path, Compiled};
use crate::expr::Expr;
use crate::filters::EntityFilterCriteria;
use crate::query::Projection;
use crate::sorts::SortDirection;

/// A bound predicate and its compiled form
pub struct PlanPredicate<T> {
    expr: Expr,
    compiled: Compiled<T>,
}

impl<T> PlanPredicate<T> {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn matches(&self, entity: &T) -> bool {
        (self.compiled)(entity)
    }
}

impl<T> Clone for PlanPredicate<T> {
    fn clone(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            compiled: Arc::clone(&self.compiled),
        }
    }
}

/// A sort key of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Canonical property path
    pub path: Vec<String>,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(path: &str, direction: SortDirection) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
            direction,
        }
    }
}

/// Provider-native plan over `T`
pub struct Queryable<T> {
    predicates: Vec<PlanPredicate<T>>,
    ordering: Vec<SortKey>,
    includes: Vec<String>,
    skip: Option<u64>,
    take: Option<u64>,
}

impl<T> Queryable<T> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
            ordering: Vec::new(),
            includes: Vec::new(),
            skip: None,
            take: None,
        }
    }

    pub fn filter_criteria(mut self, criteria: &EntityFilterCriteria<T>) -> Self {
        self.predicates.push(PlanPredicate {
            expr: criteria.expr().clone(),
            compiled: Arc::clone(criteria.predicate()),
        });
        self
    }

    /// Replace the ordering with a single key
    pub fn order_by(mut self, key: SortKey) -> Self {
        self.ordering = vec![key];
        self
    }

    /// Append a tie-breaker key
    pub fn then_by(mut self, key: SortKey) -> Self {
        self.ordering.push(key);
        self
    }

    pub fn include(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.includes.contains(&path) {
            self.includes.push(path);
        }
        self
    }

    pub fn skip(mut self, count: u64) -> Self {
        self.skip = Some(count);
        self
    }

    /// Bound the number of rows; a later, larger bound does not widen an
    /// earlier one
    pub fn take(mut self, count: u64) -> Self {
        self.take = Some(self.take.map_or(count, |existing| existing.min(count)));
        self
    }

    /// The same plan without paging
    pub fn unpaged(&self) -> Self {
        let mut plan = self.clone();
        plan.skip = None;
        plan.take = None;
        plan
    }

    pub fn predicates(&self) -> &[PlanPredicate<T>] {
        &self.predicates
    }

    pub fn ordering(&self) -> &[SortKey] {
        &self.ordering
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn offset(&self) -> Option<u64> {
        self.skip
    }

    pub fn limit(&self) -> Option<u64> {
        self.take
    }

    /// All predicates as one AND tree
    pub fn combined_predicate(&self) -> Option<Expr> {
        Expr::all(self.predicates.iter().map(|p| p.expr.clone()))
    }

    pub fn matches(&self, entity: &T) -> bool {
        self.predicates.iter().all(|p| p.matches(entity))
    }
}

impl<T: Entity> Queryable<T> {
    /// Bind and compile an expression, then add it as a predicate
    pub fn filter_expr(mut self, expr: Expr) -> QsResult<Self> {
        let expr = bind::<T>(&expr)?;
        let compiled = compile_predicate::<T>(&expr);
        self.predicates.push(PlanPredicate { expr, compiled });
        Ok(self)
    }

    /// Run the plan over rows in memory: filter, stable sort, skip, take
    pub fn apply(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut keyed: Vec<(Vec<Value>, T)> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .map(|row| {
                let keys = self
                    .ordering
                    .iter()
                    .map(|key| read_path(&row, &key.path))
                    .collect();
                (keys, row)
            })
            .collect();

        if !self.ordering.is_empty() {
            keyed.sort_by(|(a, _), (b, _)| self.compare_keys(a, b));
        }

        let skip = self.skip.unwrap_or(0) as usize;
        let take = self.take.map_or(usize::MAX, |n| n as usize);
        keyed
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(_, row)| row)
            .collect()
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for ((key, x), y) in self.ordering.iter().zip(a).zip(b) {
            let ordering = match key.direction {
                SortDirection::Asc => x.total_cmp(y),
                SortDirection::Desc => y.total_cmp(x),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl<T> Default for Queryable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Queryable<T> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            ordering: self.ordering.clone(),
            includes: self.includes.clone(),
            skip: self.skip,
            take: self.take,
        }
    }
}

impl<T> fmt::Debug for Queryable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let predicates: Vec<String> = self.predicates.iter().map(|p| p.expr.to_string()).collect();
        f.debug_struct("Queryable")
            .field("predicates", &predicates)
            .field("ordering", &self.ordering)
            .field("includes", &self.includes)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .finish()
    }
}

/// A plan together with the projection applied to its rows
pub struct Projected<T, R> {
    source: Queryable<T>,
    selector: Projection<T, R>,
}

impl<T: Entity, R: 'static> Projected<T, R> {
    /// Attach a projection. Without one, rows pass through unchanged, which is
    /// only possible when `R` is `T`.
    pub fn new(source: Queryable<T>, projection: Option<Projection<T, R>>) -> QsResult<Self> {
        let selector = match projection {
            Some(projection) => projection,
            None => identity::<T, R>()?,
        };
        Ok(Self { source, selector })
    }

    pub fn source(&self) -> &Queryable<T> {
        &self.source
    }

    pub fn into_source(self) -> Queryable<T> {
        self.source
    }

    /// Replace the underlying plan, keeping the projection
    pub fn map_source(self, f: impl FnOnce(Queryable<T>) -> Queryable<T>) -> Self {
        Self {
            source: f(self.source),
            selector: self.selector,
        }
    }

    pub fn project(&self, rows: &[T]) -> Vec<R> {
        rows.iter().map(|row| (self.selector)(row)).collect()
    }

    pub fn project_one(&self, row: &T) -> R {
        (self.selector)(row)
    }
}

fn identity<T: Entity, R: 'static>() -> QsResult<Projection<T, R>> {
    let identity: Projection<T, T> = Arc::new(|row: &T| row.clone());
    let boxed: Box<dyn Any> = Box::new(identity);
    boxed.downcast::<Projection<T, R>>().map(|p| *p).map_err(|_| {
        QsError::Internal(format!(
            "query over {} has no projection to {}",
            T::TYPE_NAME,
            std::any::type_name::<R>()
        ))
    })
}
