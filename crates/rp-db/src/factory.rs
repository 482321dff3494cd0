//! Repository factory
//!
//! Composition root for executors: choose the storage once, then hand out a
//! [`PredicateExecutor`] per relation and projection.

use std::sync::Arc;

use rp_core::DatabaseConfig;
use rp_queries::{Projection, RelationDescriptor};

use crate::memory::MemoryOperations;
use crate::pool::Database;
use crate::postgres::PgEntityOperations;
use crate::predicate_executor::PredicateExecutor;
use crate::repository::EntityOperations;

/// Hands out executors sharing one [`EntityOperations`] collaborator
#[derive(Clone)]
pub struct RepositoryFactory {
    operations: Arc<dyn EntityOperations>,
}

impl RepositoryFactory {
    pub fn new(operations: Arc<dyn EntityOperations>) -> Self {
        Self { operations }
    }

    /// Executors reading from PostgreSQL through `database`'s pool
    pub fn postgres(database: &Database, config: &DatabaseConfig) -> Self {
        let operations = PgEntityOperations::new(database.pool().clone(), config.stream_buffer);
        Self::new(Arc::new(operations))
    }

    /// Executors reading from in-memory tables
    pub fn in_memory(memory: Arc<MemoryOperations>) -> Self {
        Self::new(memory)
    }

    pub fn operations(&self) -> &Arc<dyn EntityOperations> {
        &self.operations
    }

    /// Executor for `relation`, mapping rows through `projection`
    pub fn executor<T: Send + 'static>(
        &self,
        relation: Arc<RelationDescriptor>,
        projection: Projection<T>,
    ) -> PredicateExecutor<T> {
        tracing::debug!(
            relation = relation.table(),
            columns = projection.columns().len(),
            "Predicate executor created"
        );
        PredicateExecutor::new(relation, projection, Arc::clone(&self.operations))
    }
}
