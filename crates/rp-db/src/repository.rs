//! Repository traits and shared types
//!
//! [`EntityOperations`] is the seam between executors and the storage that
//! actually runs queries.

use async_trait::async_trait;
use futures::stream::BoxStream;
use rp_queries::{ProjectionError, QueryError, Record, SqlQuery};

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Query on {relation} returned more than one row")]
    TooManyRows { relation: String },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    #[error("Unknown relation: {0}")]
    UnknownRelation(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Lazily produced rows
pub type RecordStream = BoxStream<'static, RepositoryResult<Record>>;

/// Lazily produced result values
pub type EntityStream<T> = BoxStream<'static, RepositoryResult<T>>;

/// Executes built queries against some storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityOperations: Send + Sync {
    /// Run `query`, expecting at most one row
    async fn select_one(&self, query: SqlQuery) -> RepositoryResult<Option<Record>>;

    /// Run `query`, streaming every row
    fn select_all(&self, query: SqlQuery) -> RecordStream;
}

/// Pagination parameters for queries
///
/// A `None` limit returns every row after `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Some(20),
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Skip `offset` rows without capping the rest
    pub fn from_offset(offset: i64) -> Self {
        Self {
            limit: None,
            offset,
        }
    }

    /// 1-based page of `per_page` rows; the offset saturates at `i64::MAX`
    pub fn page(page: i64, per_page: i64) -> Self {
        Self {
            limit: Some(per_page),
            offset: (page.max(1) - 1).saturating_mul(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.limit, Some(20));
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_from_offset_has_no_limit() {
        let p = Pagination::from_offset(5);
        assert_eq!(p.limit, None);
        assert_eq!(p.offset, 5);
    }

    #[test]
    fn test_pagination_page_saturates() {
        let p = Pagination::page(i64::MAX, 10);
        assert_eq!(p.limit, Some(10));
        assert_eq!(p.offset, i64::MAX);
    }

    #[test]
    fn test_pagination_page() {
        let p = Pagination::page(3, 10);
        assert_eq!(p.limit, Some(10));
        assert_eq!(p.offset, 20);
        assert_eq!(Pagination::page(0, 10).offset, 0);
    }

    #[test]
    fn test_error_messages() {
        let err = RepositoryError::Unsupported { operation: "count" };
        assert_eq!(err.to_string(), "Operation not supported: count");

        let err = RepositoryError::TooManyRows {
            relation: "person".to_string(),
        };
        assert_eq!(err.to_string(), "Query on person returned more than one row");
    }
}
