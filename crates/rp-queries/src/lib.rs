//! # rp-queries
//!
//! Typed query DSL for reactive repositories.
//!
//! Predicates, orderings and projections are built against a
//! [`RelationDescriptor`] and assembled into a validated [`SqlQuery`] that
//! renders to PostgreSQL.
//!
//! ## Structure
//!
//! - `value` - SQL values and typed extraction
//! - `relation` - Relation descriptors, columns and column types
//! - `record` - Fetched rows
//! - `predicate` - Boolean expression trees with SQL three-valued evaluation
//! - `sorts` - Order specifiers and property sorts
//! - `projection` - Selected columns plus result constructors
//! - `filters` - JSON filter syntax
//! - `builder` - Fluent query assembly and validation
//! - `query` - Built queries and SQL rendering
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rp_queries::{ColumnType, QueryBuilder, RelationDescriptor, Sort};
//!
//! let person = Arc::new(
//!     RelationDescriptor::new("person")
//!         .with_column("id", ColumnType::BigInt)
//!         .with_column("name", ColumnType::Text),
//! );
//! let id = person.column("id").unwrap().clone();
//!
//! let statement = QueryBuilder::from(person)
//!     .filter(id.gt(1_i64))
//!     .sort(&Sort::by_desc("name"))
//!     .build()
//!     .unwrap()
//!     .to_statement();
//!
//! assert_eq!(
//!     statement.sql,
//!     "SELECT \"person\".\"id\", \"person\".\"name\" FROM \"person\" \
//!      WHERE \"person\".\"id\" > $1 ORDER BY \"person\".\"name\" DESC"
//! );
//! ```

pub mod builder;
pub mod error;
pub mod filters;
pub mod predicate;
pub mod projection;
pub mod query;
pub mod record;
pub mod relation;
pub mod sorts;
pub mod value;

// Re-exports for convenience
pub use builder::QueryBuilder;
pub use error::QueryError;
pub use filters::{Filter, FilterOperator, FilterSet};
pub use predicate::{CompareOp, Predicate};
pub use projection::{FromRecord, Projection, ProjectionError};
pub use query::{SqlQuery, SqlStatement};
pub use record::Record;
pub use relation::{Column, ColumnType, RelationDescriptor};
pub use sorts::{NullHandling, OrderSpecifier, Sort, SortCriterion, SortDirection};
pub use value::{FromValue, Value};
