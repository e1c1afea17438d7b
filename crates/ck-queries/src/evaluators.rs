//! Evaluator stages
//!
//! Each stage reads one aspect of a [`Query`] and folds it into a
//! [`Queryable`] plan. Stages are pure; the pipeline runs them in a fixed
//! order.

use ck_core::{Entity, PropertyType, QsError, QsResult, ScalarType};

use crate::compile::resolve_dotted;
use crate::expr::{lit, Expr};
use crate::navigation::NavigationRegistry;
use crate::query::Query;
use crate::queryable::{Projected, Queryable, SortKey};

/// A pipeline stage
pub trait Evaluator<T: Entity> {
    /// Stage name used in logs
    fn name(&self) -> &'static str;

    fn evaluate<R>(&self, source: Queryable<T>, query: &Query<T, R>) -> QsResult<Queryable<T>>;
}

/// Applies every filter criterion
#[derive(Debug, Default, Clone, Copy)]
pub struct WhereEvaluator;

impl<T: Entity> Evaluator<T> for WhereEvaluator {
    fn name(&self) -> &'static str {
        "where"
    }

    fn evaluate<R>(&self, source: Queryable<T>, query: &Query<T, R>) -> QsResult<Queryable<T>> {
        Ok(query
            .filters()
            .iter()
            .fold(source, |plan, criteria| plan.filter_criteria(criteria)))
    }
}

/// Free-text search: an OR over the searchable properties
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchEvaluator;

impl SearchEvaluator {
    /// The condition a single property contributes, if the term applies to it
    fn condition<T: Entity>(property: &str, term: &str) -> QsResult<Option<Expr>> {
        let (path, ty) = resolve_dotted::<T>(property)?;
        let member = Expr::Member(path);
        let term = term.trim();

        Ok(match ty {
            PropertyType::Text => Some(member.to_lower().contains(term.to_lowercase())),
            PropertyType::Scalar(ScalarType::Int) => term.parse::<i64>().ok().map(|n| member.equals(n)),
            PropertyType::Scalar(ScalarType::Float) => {
                term.parse::<f64>().ok().map(|x| member.equals(x))
            }
            PropertyType::Scalar(ScalarType::Bool) => match term.to_ascii_lowercase().as_str() {
                "true" => Some(member.equals(true)),
                "false" => Some(member.equals(false)),
                _ => None,
            },
            PropertyType::Scalar(ScalarType::DateTime | ScalarType::Uuid) => Some(member.equals(term)),
            PropertyType::Collection(_) | PropertyType::Object(_) => {
                return Err(QsError::Validation(format!(
                    "{} on {} is not searchable",
                    property,
                    T::TYPE_NAME
                )))
            }
        })
    }
}

impl<T: Entity> Evaluator<T> for SearchEvaluator {
    fn name(&self) -> &'static str {
        "search"
    }

    fn evaluate<R>(&self, source: Queryable<T>, query: &Query<T, R>) -> QsResult<Queryable<T>> {
        let Some(search) = query.search() else {
            return Ok(source);
        };
        if search.term.trim().is_empty() || search.properties.is_empty() {
            return Ok(source);
        }

        let mut conditions = Vec::new();
        for property in &search.properties {
            if let Some(condition) = Self::condition::<T>(property, &search.term)? {
                conditions.push(condition);
            }
        }

        // A term no property can match filters everything out
        let predicate = Expr::any(conditions).unwrap_or_else(|| lit(false));
        source.filter_expr(predicate)
    }
}

/// Applies the primary order term, then tie-breakers by sequence
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderEvaluator;

impl<T: Entity> Evaluator<T> for OrderEvaluator {
    fn name(&self) -> &'static str {
        "order"
    }

    fn evaluate<R>(&self, source: Queryable<T>, query: &Query<T, R>) -> QsResult<Queryable<T>> {
        let order = query.order();
        order.validate()?;

        let Some(primary) = order.primary() else {
            return Ok(source);
        };

        let plan = source.order_by(SortKey::new(&primary.property, primary.direction));
        Ok(order.secondaries().into_iter().fold(plan, |plan, term| {
            plan.then_by(SortKey::new(&term.property, term.direction))
        }))
    }
}

/// Adds explicit includes and, with auto-include, every first-level navigation
pub struct IncludeEvaluator<'a> {
    registry: &'a NavigationRegistry,
}

impl<'a> IncludeEvaluator<'a> {
    pub fn new(registry: &'a NavigationRegistry) -> Self {
        Self { registry }
    }
}

impl<T: Entity> Evaluator<T> for IncludeEvaluator<'_> {
    fn name(&self) -> &'static str {
        "include"
    }

    fn evaluate<R>(&self, source: Queryable<T>, query: &Query<T, R>) -> QsResult<Queryable<T>> {
        let mut plan = query
            .includes()
            .paths()
            .into_iter()
            .fold(source, |plan, path| plan.include(path));

        if query.auto_include() {
            for navigation in self.registry.discover::<T>().iter() {
                plan = plan.include(navigation.name);
            }
        }
        Ok(plan)
    }
}

/// Applies skip, then take
#[derive(Debug, Default, Clone, Copy)]
pub struct PagingEvaluator;

impl<T: Entity> Evaluator<T> for PagingEvaluator {
    fn name(&self) -> &'static str {
        "paging"
    }

    fn evaluate<R>(&self, source: Queryable<T>, query: &Query<T, R>) -> QsResult<Queryable<T>> {
        let mut plan = source;
        if let Some(skip) = query.skip() {
            plan = plan.skip(skip);
        }
        if let Some(take) = query.take() {
            plan = plan.take(take);
        }
        Ok(plan)
    }
}

/// Attaches the projection. Not an [`Evaluator`]: it changes the result type.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectEvaluator;

impl SelectEvaluator {
    pub fn name(&self) -> &'static str {
        "select"
    }

    pub fn evaluate<T: Entity, R: 'static>(
        &self,
        source: Queryable<T>,
        query: &Query<T, R>,
    ) -> QsResult<Projected<T, R>> {
        Projected::new(source, query.projection().cloned())
    }
}
