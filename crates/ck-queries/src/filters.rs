//! Filter criteria
//!
//! An [`EntityFilterCriteria`] is a single predicate over an entity, held as
//! its expression tree, its canonical text and its compiled closure. An
//! [`EntityFilterBuilder`] collects criteria that are AND-combined.

use std::fmt;

use ck_core::{Entity, FormatError, QsResult};

use crate::codec::FilterCodec;
use crate::compile::{bind, compile_predicate, Compiled};
use crate::expr::Expr;
use crate::printer;

/// A bound, compiled filter predicate
pub struct EntityFilterCriteria<T> {
    expr: Expr,
    text: String,
    predicate: Compiled<T>,
}

impl<T: Entity> EntityFilterCriteria<T> {
    /// Bind an expression against `T` and compile it
    pub fn new(expr: Expr) -> QsResult<Self> {
        let expr = bind::<T>(&expr)?;
        let predicate = compile_predicate::<T>(&expr);
        let text = printer::print(&expr);
        Ok(Self {
            expr,
            text,
            predicate,
        })
    }

    /// Parse predicate text, e.g. `Age > 18 && Name == "John"`
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        FilterCodec::parse_text(text)
    }
}

impl<T> EntityFilterCriteria<T> {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Canonical predicate text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, entity: &T) -> bool {
        (self.predicate)(entity)
    }

    pub(crate) fn predicate(&self) -> &Compiled<T> {
        &self.predicate
    }
}

impl<T> Clone for EntityFilterCriteria<T> {
    fn clone(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            text: self.text.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

impl<T> PartialEq for EntityFilterCriteria<T> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl<T> fmt::Debug for EntityFilterCriteria<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityFilterCriteria").field(&self.text).finish()
    }
}

impl<T> fmt::Display for EntityFilterCriteria<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Ordered collection of filter criteria, combined with AND
pub struct EntityFilterBuilder<T> {
    criteria: Vec<EntityFilterCriteria<T>>,
}

impl<T> EntityFilterBuilder<T> {
    pub fn new() -> Self {
        Self {
            criteria: Vec::new(),
        }
    }

    /// Add a criterion (builder pattern)
    pub fn and(mut self, criteria: EntityFilterCriteria<T>) -> Self {
        self.criteria.push(criteria);
        self
    }

    /// Add a criterion
    pub fn push(&mut self, criteria: EntityFilterCriteria<T>) -> &mut Self {
        self.criteria.push(criteria);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityFilterCriteria<T>> {
        self.criteria.iter()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// All criteria as a single AND tree; `None` when empty
    pub fn combined_expr(&self) -> Option<Expr> {
        Expr::all(self.criteria.iter().map(|c| c.expr.clone()))
    }

    /// True when every criterion matches; an empty builder matches everything
    pub fn matches(&self, entity: &T) -> bool {
        self.criteria.iter().all(|c| c.matches(entity))
    }

    pub fn clear(&mut self) {
        self.criteria.clear();
    }
}

impl<T> Default for EntityFilterBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EntityFilterBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
        }
    }
}

impl<T> fmt::Debug for EntityFilterBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.criteria.iter()).finish()
    }
}
