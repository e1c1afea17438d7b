//! Query Builder
//!
//! Provides a fluent API for constructing query descriptions. Steps that can
//! be misused fail immediately with a [`QsError`] instead of producing a
//! description that would fail later during evaluation.

use std::fmt;
use std::sync::Arc;

use ck_core::{Entity, PageRequest, QsError, QsResult};

use crate::compile::resolve_dotted;
use crate::expr::Expr;
use crate::filters::{EntityFilterBuilder, EntityFilterCriteria};
use crate::includes::IncludeChain;
use crate::navigation::NavigationRegistry;
use crate::query::{Projection, Query, SearchSpec};
use crate::sorts::{OrderChain, SortDirection};

/// Builder for constructing queries fluently
pub struct QueryBuilder<T, R = T> {
    filters: EntityFilterBuilder<T>,
    search: Option<SearchSpec>,
    order: OrderChain,
    includes: IncludeChain,
    skip: Option<u64>,
    take: Option<u64>,
    auto_include: bool,
    projection: Option<Projection<T, R>>,
}

impl<T, R> Default for QueryBuilder<T, R> {
    fn default() -> Self {
        Self {
            filters: EntityFilterBuilder::new(),
            search: None,
            order: OrderChain::new(),
            includes: IncludeChain::new(),
            skip: None,
            take: None,
            auto_include: false,
            projection: None,
        }
    }
}

impl<T, R> fmt::Debug for QueryBuilder<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("filters", &self.filters)
            .field("search", &self.search)
            .field("order", &self.order)
            .field("includes", &self.includes.paths())
            .field("skip", &self.skip)
            .field("take", &self.take)
            .field("auto_include", &self.auto_include)
            .field("projection", &self.projection.is_some())
            .finish()
    }
}

impl<T: Entity> QueryBuilder<T, T> {
    /// Create a new query builder returning entities
    pub fn new() -> Self {
        Self::default()
    }

    /// Project each entity to `R`
    pub fn select<R, F>(self, projection: F) -> QueryBuilder<T, R>
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        QueryBuilder {
            filters: self.filters,
            search: self.search,
            order: self.order,
            includes: self.includes,
            skip: self.skip,
            take: self.take,
            auto_include: self.auto_include,
            projection: Some(Arc::new(projection)),
        }
    }
}

impl<T: Entity, R> QueryBuilder<T, R> {
    // Filter methods

    /// Add filter criteria; all criteria are AND-combined
    pub fn filter(mut self, criteria: EntityFilterCriteria<T>) -> Self {
        self.filters.push(criteria);
        self
    }

    /// Parse predicate text and add it as a filter
    pub fn filter_text(self, text: &str) -> QsResult<Self> {
        let criteria = EntityFilterCriteria::parse(text)?;
        Ok(self.filter(criteria))
    }

    /// Bind an expression tree and add it as a filter
    pub fn filter_expr(self, expr: Expr) -> QsResult<Self> {
        let criteria = EntityFilterCriteria::new(expr)?;
        Ok(self.filter(criteria))
    }

    /// Free-text search over primitive properties
    pub fn search<I>(mut self, term: impl Into<String>, properties: I) -> QsResult<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut canonical = Vec::new();
        for property in properties {
            let property = property.as_ref();
            let (path, ty) = resolve_dotted::<T>(property)?;
            if !ty.is_primitive() {
                return Err(QsError::Validation(format!(
                    "{} on {} is not searchable",
                    property,
                    T::TYPE_NAME
                )));
            }
            canonical.push(path.join("."));
        }
        self.search = Some(SearchSpec {
            term: term.into(),
            properties: canonical,
        });
        Ok(self)
    }

    // Order methods

    /// Primary ascending order
    pub fn order_by(self, property: &str) -> QsResult<Self> {
        self.primary_order(property, SortDirection::Asc)
    }

    /// Primary descending order
    pub fn order_by_descending(self, property: &str) -> QsResult<Self> {
        self.primary_order(property, SortDirection::Desc)
    }

    /// Ascending tie-breaker
    pub fn then_by(self, property: &str) -> QsResult<Self> {
        self.then_order(property, SortDirection::Asc)
    }

    /// Descending tie-breaker
    pub fn then_by_descending(self, property: &str) -> QsResult<Self> {
        self.then_order(property, SortDirection::Desc)
    }

    /// Replace the order chain with one received from elsewhere
    pub fn with_order_chain(mut self, chain: OrderChain) -> QsResult<Self> {
        chain.validate()?;
        let mut terms = chain.terms().to_vec();
        for term in &mut terms {
            term.property = sortable_path::<T>(&term.property)?;
        }
        self.order = OrderChain::from_terms(terms);
        Ok(self)
    }

    fn primary_order(mut self, property: &str, direction: SortDirection) -> QsResult<Self> {
        let path = sortable_path::<T>(property)?;
        self.order.push_primary(path, direction)?;
        Ok(self)
    }

    fn then_order(mut self, property: &str, direction: SortDirection) -> QsResult<Self> {
        let path = sortable_path::<T>(property)?;
        self.order.push_then(path, direction)?;
        Ok(self)
    }

    // Paging methods

    /// Request a 1-indexed page
    pub fn page(mut self, page: i64, page_size: i64) -> QsResult<Self> {
        let request = PageRequest::new(page, page_size)?;
        self.skip = Some(request.offset());
        self.take = Some(request.limit());
        Ok(self)
    }

    /// Rows to skip; `None` removes the offset
    pub fn skip(mut self, skip: Option<i64>) -> QsResult<Self> {
        self.skip = match skip {
            Some(n) if n < 0 => {
                return Err(QsError::out_of_range("skip", n, "skip cannot be negative"))
            }
            other => other.map(|n| n as u64),
        };
        Ok(self)
    }

    /// Rows to take; `None` means unbounded
    pub fn take(mut self, take: Option<i64>) -> QsResult<Self> {
        self.take = match take {
            Some(n) if n < 1 => {
                return Err(QsError::out_of_range("take", n, "take must be at least 1"))
            }
            other => other.map(|n| n as u64),
        };
        Ok(self)
    }

    /// Remove paging entirely
    pub fn clear_paging(mut self) -> Self {
        self.skip = None;
        self.take = None;
        self
    }

    /// Load every first-level navigation
    pub fn auto_include(mut self, enabled: bool) -> Self {
        self.auto_include = enabled;
        self
    }

    /// Reset filters, search, order, includes and paging. The projection is kept.
    pub fn clear(mut self) -> Self {
        self.filters.clear();
        self.search = None;
        self.order.clear();
        self.includes.clear();
        self.skip = None;
        self.take = None;
        self.auto_include = false;
        self
    }

    /// Build the query
    pub fn build(self) -> Query<T, R> {
        Query {
            filters: self.filters,
            search: self.search,
            order: self.order,
            includes: self.includes,
            skip: self.skip,
            take: self.take,
            auto_include: self.auto_include,
            projection: self.projection,
        }
    }
}

impl<T: Entity + Default, R> QueryBuilder<T, R> {
    // Include methods

    /// Load a navigation with the root entity
    pub fn include(mut self, navigation: &str) -> QsResult<Self> {
        self.includes
            .include::<T>(&NavigationRegistry::global(), navigation)?;
        Ok(self)
    }

    /// Load a navigation and one navigation of its target
    pub fn include_then(mut self, navigation: &str, then: &str) -> QsResult<Self> {
        self.includes
            .include_then::<T>(&NavigationRegistry::global(), navigation, then)?;
        Ok(self)
    }

    /// Load a dotted path such as `Orders.Lines`
    pub fn include_path(mut self, path: &str) -> QsResult<Self> {
        self.includes
            .include_path::<T>(&NavigationRegistry::global(), path)?;
        Ok(self)
    }
}

fn sortable_path<T: Entity>(property: &str) -> QsResult<String> {
    let (path, ty) = resolve_dotted::<T>(property)?;
    if !ty.is_primitive() {
        return Err(QsError::Validation(format!(
            "cannot order {} by {}; only scalar and text properties are sortable",
            T::TYPE_NAME,
            property
        )));
    }
    Ok(path.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field;
    use crate::fixtures::{customer, Customer};

    #[test]
    fn test_page_sets_skip_and_take() {
        for (page, size) in [(1, 10), (3, 25), (10, 1)] {
            let query = QueryBuilder::<Customer>::new().page(page, size).unwrap().build();
            assert_eq!(query.skip(), Some(((page - 1) * size) as u64));
            assert_eq!(query.take(), Some(size as u64));
        }
    }

    #[test]
    fn test_page_rejects_invalid_bounds() {
        for (page, size, parameter) in [(0, 10, "page"), (1, 0, "page_size"), (-3, 5, "page")] {
            let err = QueryBuilder::<Customer>::new().page(page, size).unwrap_err();
            assert!(
                matches!(err, QsError::OutOfRange { parameter: p, .. } if p == parameter),
                "({page}, {size})"
            );
        }
    }

    #[test]
    fn test_skip_and_take_validation() {
        assert!(QueryBuilder::<Customer>::new().skip(Some(-1)).is_err());
        assert!(QueryBuilder::<Customer>::new().take(Some(0)).is_err());

        let query = QueryBuilder::<Customer>::new()
            .skip(Some(0))
            .unwrap()
            .take(None)
            .unwrap()
            .build();
        assert_eq!(query.skip(), Some(0));
        assert_eq!(query.take(), None);
    }

    #[test]
    fn test_debug_output() {
        let builder = QueryBuilder::<Customer>::new()
            .filter_text("Age > 18")
            .unwrap()
            .page(2, 10)
            .unwrap();
        let debug = format!("{:?}", builder);
        assert!(debug.starts_with("QueryBuilder"), "{debug}");
        assert!(debug.contains("skip: Some(10)"), "{debug}");
        assert!(debug.contains("projection: false"), "{debug}");

        let err = QueryBuilder::<Customer>::new().page(0, 10).unwrap_err();
        assert!(matches!(err, QsError::OutOfRange { .. }));
    }

    #[test]
    fn test_clear_paging_means_unbounded() {
        let query = QueryBuilder::<Customer>::new()
            .page(2, 50)
            .unwrap()
            .clear_paging()
            .build();
        assert_eq!(query.skip(), None);
        assert_eq!(query.take(), None);
    }

    #[test]
    fn test_duplicate_primary_order_fails_fast() {
        let err = QueryBuilder::<Customer>::new()
            .order_by("Name")
            .unwrap()
            .order_by_descending("Age")
            .unwrap_err();
        assert!(matches!(err, QsError::DuplicatePrimaryOrder { count: 2 }));
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_one_primary_and_secondaries() {
        let query = QueryBuilder::<Customer>::new()
            .order_by_descending("age")
            .unwrap()
            .then_by("Name")
            .unwrap()
            .then_by("Address.City")
            .unwrap()
            .build();

        let primary = query.order().primary().unwrap();
        assert_eq!(primary.property, "Age");
        assert_eq!(primary.direction, SortDirection::Desc);
        let secondaries: Vec<&str> = query
            .order()
            .secondaries()
            .iter()
            .map(|t| t.property.as_str())
            .collect();
        assert_eq!(secondaries, vec!["Name", "Address.City"]);
    }

    #[test]
    fn test_order_validation() {
        assert!(matches!(
            QueryBuilder::<Customer>::new().then_by("Name"),
            Err(QsError::Validation(_))
        ));
        assert!(matches!(
            QueryBuilder::<Customer>::new().order_by("Height"),
            Err(QsError::UnknownProperty { .. })
        ));
        assert!(matches!(
            QueryBuilder::<Customer>::new().order_by("Orders"),
            Err(QsError::Validation(_))
        ));
    }

    #[test]
    fn test_search_validation() {
        let query = QueryBuilder::<Customer>::new()
            .search("oslo", ["address.city", "name"])
            .unwrap()
            .build();
        assert_eq!(query.search().unwrap().properties, vec!["Address.City", "Name"]);

        assert!(QueryBuilder::<Customer>::new().search("x", ["Tags"]).is_err());
        assert!(QueryBuilder::<Customer>::new().search("x", ["Nope"]).is_err());
    }

    #[test]
    fn test_filters_accumulate() {
        let query = QueryBuilder::<Customer>::new()
            .filter_text("Age > 18")
            .unwrap()
            .filter_expr(field("Active").equals(true))
            .unwrap()
            .build();
        assert_eq!(query.filters().len(), 2);
        assert!(query.filters().matches(&customer(1, "John", 30)));

        assert!(matches!(
            QueryBuilder::<Customer>::new().filter_text("Age >"),
            Err(QsError::Format(_))
        ));
    }

    #[test]
    fn test_includes() {
        let query = QueryBuilder::<Customer>::new()
            .include("Manager")
            .unwrap()
            .include_then("Orders", "Lines")
            .unwrap()
            .build();
        assert_eq!(query.includes().paths(), vec!["Manager", "Orders.Lines"]);

        assert!(matches!(
            QueryBuilder::<Customer>::new().include("Name"),
            Err(QsError::NotNavigable { .. })
        ));
    }

    #[test]
    fn test_select_and_clear() {
        let query = QueryBuilder::<Customer>::new()
            .order_by("Name")
            .unwrap()
            .page(1, 10)
            .unwrap()
            .select(|c: &Customer| c.name.clone())
            .clear()
            .build();

        assert!(query.order().is_empty());
        assert_eq!(query.take(), None);
        let project = query.projection().unwrap();
        assert_eq!(project(&customer(1, "John", 30)), "John");
    }
}
