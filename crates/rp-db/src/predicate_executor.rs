//! Predicate executors
//!
//! A [`PredicateExecutor`] answers predicate-driven lookups for one relation:
//! it builds a query from the caller's predicate and ordering, hands it to an
//! [`EntityOperations`] collaborator and maps the returned rows through its
//! projection. Queries are validated before anything is sent, so a predicate
//! over a foreign column or a sort on an unknown property fails synchronously.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use rp_queries::{OrderSpecifier, Predicate, Projection, QueryBuilder, RelationDescriptor, Sort};

use crate::repository::{
    EntityOperations, EntityStream, Pagination, RepositoryError, RepositoryResult,
};

/// Predicate-driven reads returning lazily produced results
#[async_trait]
pub trait ReactivePredicateExecutor<T: Send + 'static>: Send + Sync {
    /// The single row matching `predicate`, if any
    async fn find_one(&self, predicate: &Predicate) -> RepositoryResult<Option<T>>;

    /// Every row matching `predicate`, in storage order
    fn find_all(&self, predicate: &Predicate) -> RepositoryResult<EntityStream<T>>;

    /// Every row matching `predicate`, ordered by `orders` (primary key first)
    fn find_all_ordered(
        &self,
        predicate: &Predicate,
        orders: &[OrderSpecifier],
    ) -> RepositoryResult<EntityStream<T>>;

    /// Every row matching `predicate`, ordered by a property sort
    fn find_all_sorted(&self, predicate: &Predicate, sort: &Sort) -> RepositoryResult<EntityStream<T>>;

    /// Every row, ordered by `orders`
    fn find_all_by_order(&self, orders: &[OrderSpecifier]) -> RepositoryResult<EntityStream<T>>;

    /// Number of rows matching `predicate`
    async fn count(&self, predicate: &Predicate) -> RepositoryResult<i64>;

    /// Whether any row matches `predicate`
    async fn exists(&self, predicate: &Predicate) -> RepositoryResult<bool> {
        Ok(self.count(predicate).await? > 0)
    }
}

/// [`ReactivePredicateExecutor`] for one relation and projection
pub struct PredicateExecutor<T> {
    relation: Arc<RelationDescriptor>,
    projection: Projection<T>,
    operations: Arc<dyn EntityOperations>,
}

impl<T: Send + 'static> PredicateExecutor<T> {
    pub fn new(
        relation: Arc<RelationDescriptor>,
        projection: Projection<T>,
        operations: Arc<dyn EntityOperations>,
    ) -> Self {
        Self {
            relation,
            projection,
            operations,
        }
    }

    pub fn relation(&self) -> &RelationDescriptor {
        &self.relation
    }

    pub fn projection(&self) -> &Projection<T> {
        &self.projection
    }

    /// Rows matching `predicate` in `sort` order, restricted to one window
    pub fn find_page(
        &self,
        predicate: &Predicate,
        sort: &Sort,
        pagination: Pagination,
    ) -> RepositoryResult<EntityStream<T>> {
        let mut query = self
            .query()
            .filter(predicate.clone())
            .sort(sort)
            .offset(pagination.offset);
        if let Some(limit) = pagination.limit {
            query = query.limit(limit);
        }
        self.stream(query)
    }

    fn query(&self) -> QueryBuilder {
        QueryBuilder::from(Arc::clone(&self.relation)).select(self.projection.columns())
    }

    fn stream(&self, query: QueryBuilder) -> RepositoryResult<EntityStream<T>> {
        let query = query.build()?;
        let projection = self.projection.clone();
        let rows = self.operations.select_all(query);

        Ok(rows
            .map(move |row| row.and_then(|record| Ok(projection.construct(&record)?)))
            .boxed())
    }
}

#[async_trait]
impl<T: Send + 'static> ReactivePredicateExecutor<T> for PredicateExecutor<T> {
    async fn find_one(&self, predicate: &Predicate) -> RepositoryResult<Option<T>> {
        let query = self.query().filter(predicate.clone()).build()?;
        let record = self.operations.select_one(query).await?;
        Ok(record
            .map(|record| self.projection.construct(&record))
            .transpose()?)
    }

    fn find_all(&self, predicate: &Predicate) -> RepositoryResult<EntityStream<T>> {
        self.stream(self.query().filter(predicate.clone()))
    }

    fn find_all_ordered(
        &self,
        predicate: &Predicate,
        orders: &[OrderSpecifier],
    ) -> RepositoryResult<EntityStream<T>> {
        self.stream(self.query().filter(predicate.clone()).order_by(orders))
    }

    fn find_all_sorted(&self, predicate: &Predicate, sort: &Sort) -> RepositoryResult<EntityStream<T>> {
        self.stream(self.query().filter(predicate.clone()).sort(sort))
    }

    fn find_all_by_order(&self, orders: &[OrderSpecifier]) -> RepositoryResult<EntityStream<T>> {
        self.stream(self.query().order_by(orders))
    }

    async fn count(&self, _predicate: &Predicate) -> RepositoryResult<i64> {
        Err(RepositoryError::Unsupported { operation: "count" })
    }
}
