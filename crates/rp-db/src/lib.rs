//! # rp-db
//!
//! Reactive predicate executors.
//!
//! This crate runs queries assembled with `rp-queries`, including:
//!
//! - Connection pool management
//! - The `EntityOperations` seam with PostgreSQL and in-memory implementations
//! - Predicate executors returning futures and lazy streams
//! - A factory wiring executors to their storage
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rp_core::AppConfig;
//! use rp_db::{Database, ReactivePredicateExecutor, RepositoryFactory};
//! use rp_queries::{ColumnType, Projection, RelationDescriptor};
//!
//! let config = AppConfig::load()?;
//! let db = Database::connect(&config.database).await?;
//! let factory = RepositoryFactory::postgres(&db, &config.database);
//!
//! let person = Arc::new(
//!     RelationDescriptor::new("person")
//!         .with_column("id", ColumnType::BigInt)
//!         .with_column("name", ColumnType::Text),
//! );
//! let id = person.column("id").unwrap().clone();
//! let people = factory.executor(person.clone(), Projection::records(person.columns().to_vec()));
//! let first = people.find_one(&id.eq(1_i64)).await?;
//! ```

pub mod factory;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod predicate_executor;
pub mod repository;

// Re-exports
pub use factory::RepositoryFactory;
pub use memory::MemoryOperations;
pub use pool::{Database, PoolStats};
pub use postgres::PgEntityOperations;
pub use predicate_executor::{PredicateExecutor, ReactivePredicateExecutor};
pub use repository::{
    EntityOperations, EntityStream, Pagination, RecordStream, RepositoryError, RepositoryResult,
};
