//! # ck-queries
//!
//! Query descriptions and their evaluation for crudkit.
//!
//! A caller describes a read with [`QueryBuilder`]: filter predicates,
//! free-text search, ordering, includes, paging and an optional projection.
//! The [`QueryPipeline`] folds that description into a [`Queryable`] plan that
//! a provider can execute.
//!
//! ## Structure
//!
//! - `expr`, `lexer`, `parser`, `printer` - Predicate trees and their text form
//! - `compile` - Binding predicates to an entity schema and compiling them
//! - `filters` - Filter criteria and AND-combined filter sets
//! - `codec` - `{"Filter": "..."}` wire format
//! - `sorts` - Order terms
//! - `navigation`, `includes` - Navigation discovery and include directives
//! - `query`, `builder` - The query description and its fluent builder
//! - `queryable`, `evaluators`, `pipeline` - Plans and the stages producing them
//!
//! ## Example
//!
//! ```ignore
//! use ck_queries::{QueryBuilder, QueryPipeline, Queryable};
//!
//! let query = QueryBuilder::<Customer>::new()
//!     .filter_text("Age > 18 && Name.StartsWith('Jo')")?
//!     .order_by("Name")?
//!     .then_by_descending("Age")?
//!     .page(1, 20)?
//!     .build();
//!
//! let plan = QueryPipeline::global().evaluate(Queryable::new(), &query)?;
//! ```

pub mod expr;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod compile;
pub mod filters;
pub mod codec;
pub mod sorts;
pub mod navigation;
pub mod includes;
pub mod query;
pub mod builder;
pub mod queryable;
pub mod evaluators;
pub mod pipeline;

#[cfg(test)]
mod fixtures;

// Re-exports for convenience
pub use expr::{field, lit, BinaryOp, Expr, Method, UnaryOp};
pub use filters::{EntityFilterBuilder, EntityFilterCriteria};
pub use codec::{FilterCodec, FILTER_KEY};
pub use sorts::{OrderChain, OrderTerm, SortDirection};
pub use navigation::{NavigationDescriptor, NavigationRegistry};
pub use includes::{IncludeChain, IncludeNode};
pub use query::{Projection, Query, QueryWire, SearchSpec};
pub use builder::QueryBuilder;
pub use queryable::{PlanPredicate, Projected, Queryable, SortKey};
pub use evaluators::{
    Evaluator, IncludeEvaluator, OrderEvaluator, PagingEvaluator, SearchEvaluator,
    SelectEvaluator, WhereEvaluator,
};
pub use pipeline::QueryPipeline;
