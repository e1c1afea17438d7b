//! Query descriptions
//!
//! A [`Query`] is an immutable description of a read: filters, free-text
//! search, ordering, includes, paging and an optional projection. It is built
//! with [`QueryBuilder`](crate::builder::QueryBuilder) and evaluated by the
//! [`QueryPipeline`](crate::pipeline::QueryPipeline).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ck_core::{Entity, QsResult};

use crate::builder::QueryBuilder;
use crate::codec::FilterCodec;
use crate::filters::EntityFilterBuilder;
use crate::includes::IncludeChain;
use crate::sorts::{OrderChain, OrderTerm};

/// Projection from an entity to a result shape
pub type Projection<T, R> = Arc<dyn Fn(&T) -> R + Send + Sync>;

/// Free-text search over a set of properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    pub term: String,
    /// Canonical property paths
    pub properties: Vec<String>,
}

/// Description of a read operation over `T`, producing `R`
pub struct Query<T, R = T> {
    pub(crate) filters: EntityFilterBuilder<T>,
    pub(crate) search: Option<SearchSpec>,
    pub(crate) order: OrderChain,
    pub(crate) includes: IncludeChain,
    pub(crate) skip: Option<u64>,
    pub(crate) take: Option<u64>,
    pub(crate) auto_include: bool,
    pub(crate) projection: Option<Projection<T, R>>,
}

impl<T, R> Query<T, R> {
    pub fn filters(&self) -> &EntityFilterBuilder<T> {
        &self.filters
    }

    pub fn search(&self) -> Option<&SearchSpec> {
        self.search.as_ref()
    }

    pub fn order(&self) -> &OrderChain {
        &self.order
    }

    pub fn includes(&self) -> &IncludeChain {
        &self.includes
    }

    /// Rows to skip; `None` means no offset
    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    /// Rows to take; `None` means unbounded
    pub fn take(&self) -> Option<u64> {
        self.take
    }

    pub fn auto_include(&self) -> bool {
        self.auto_include
    }

    pub fn projection(&self) -> Option<&Projection<T, R>> {
        self.projection.as_ref()
    }

    pub fn is_paged(&self) -> bool {
        self.take.is_some()
    }

    /// 1-indexed page number derived from skip and take
    pub fn page_number(&self) -> Option<u64> {
        self.take
            .filter(|take| *take > 0)
            .map(|take| self.skip.unwrap_or(0) / take + 1)
    }

    pub fn page_size(&self) -> Option<u64> {
        self.take
    }

    /// Serializable form of this description. The projection is not part of
    /// the wire form.
    pub fn to_wire(&self) -> QueryWire {
        QueryWire {
            filters: self
                .filters
                .iter()
                .map(|criteria| FilterCodec::encode(Some(criteria)))
                .collect(),
            search_term: self.search.as_ref().map(|s| s.term.clone()),
            search_properties: self
                .search
                .as_ref()
                .map(|s| s.properties.clone())
                .unwrap_or_default(),
            order_by: self.order.terms().to_vec(),
            includes: self.includes.paths(),
            skip: self.skip.map(|n| n as i64),
            take: self.take.map(|n| n as i64),
            auto_include: self.auto_include,
        }
    }
}

impl<T, R> Clone for Query<T, R> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            search: self.search.clone(),
            order: self.order.clone(),
            includes: self.includes.clone(),
            skip: self.skip,
            take: self.take,
            auto_include: self.auto_include,
            projection: self.projection.clone(),
        }
    }
}

impl<T, R> fmt::Debug for Query<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
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

/// Wire form of a query description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QueryWire {
    /// Filter objects, each `{"Filter": "<text>"}`
    pub filters: Vec<serde_json::Value>,
    pub search_term: Option<String>,
    pub search_properties: Vec<String>,
    pub order_by: Vec<OrderTerm>,
    /// Dotted include paths
    pub includes: Vec<String>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub auto_include: bool,
}

impl QueryWire {
    /// Rebuild a query, applying the same checks as the fluent builder
    pub fn into_query<T: Entity + Default>(self) -> QsResult<Query<T>> {
        let mut builder = QueryBuilder::<T>::new();

        for filter in &self.filters {
            if let Some(criteria) = FilterCodec::decode_value::<T>(filter)? {
                builder = builder.filter(criteria);
            }
        }
        if let Some(term) = self.search_term {
            builder = builder.search(term, &self.search_properties)?;
        }
        builder = builder.with_order_chain(OrderChain::from_terms(self.order_by))?;
        for path in &self.includes {
            builder = builder.include_path(path)?;
        }

        Ok(builder
            .skip(self.skip)?
            .take(self.take)?
            .auto_include(self.auto_include)
            .build())
    }
}
