//! PostgreSQL entity operations
//!
//! Renders built queries, binds their parameters and decodes each projected
//! column by its declared [`ColumnType`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::{StreamExt, TryStreamExt};
use rp_queries::{Column, ColumnType, Record, SqlQuery, SqlStatement, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::repository::{EntityOperations, RecordStream, RepositoryError, RepositoryResult};

/// [`EntityOperations`] backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgEntityOperations {
    pool: PgPool,
    buffer: usize,
}

impl PgEntityOperations {
    /// `buffer` bounds how many decoded rows wait for a slow consumer
    pub fn new(pool: PgPool, buffer: usize) -> Self {
        Self {
            pool,
            buffer: buffer.max(1),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EntityOperations for PgEntityOperations {
    async fn select_one(&self, query: SqlQuery) -> RepositoryResult<Option<Record>> {
        let statement = query.to_statement();
        tracing::debug!(sql = %statement.sql, params = statement.params.len(), "select_one");

        let mut rows = prepare(&statement).fetch(&self.pool);
        let first = match rows.try_next().await? {
            Some(row) => decode_row(&row, query.columns())?,
            None => return Ok(None),
        };
        if rows.try_next().await?.is_some() {
            return Err(RepositoryError::TooManyRows {
                relation: query.relation().table().to_string(),
            });
        }
        Ok(Some(first))
    }

    fn select_all(&self, query: SqlQuery) -> RecordStream {
        let pool = self.pool.clone();
        let buffer = self.buffer;

        // The query starts when the stream is first polled
        let start = async move {
            let (tx, rx) = mpsc::channel(buffer);
            tokio::spawn(async move {
                let statement = query.to_statement();
                tracing::debug!(sql = %statement.sql, params = statement.params.len(), "select_all");

                let mut rows = prepare(&statement).fetch(&pool);
                while let Some(row) = rows.next().await {
                    let item = row
                        .and_then(|row| decode_row(&row, query.columns()))
                        .map_err(RepositoryError::from);
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() {
                        tracing::debug!("select_all consumer dropped, cancelling");
                        break;
                    }
                    if failed {
                        break;
                    }
                }
            });
            ReceiverStream::new(rx)
        };

        futures::stream::once(start).flatten().boxed()
    }
}

fn prepare(statement: &SqlStatement) -> Query<'_, Postgres, PgArguments> {
    statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), |query, value| bind_value(query, value))
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Uuid(v) => query.bind(*v),
        Value::Date(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
    }
}

/// Decode the projected columns of a row, in select order
fn decode_row(row: &PgRow, columns: &[Column]) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for (index, column) in columns.iter().enumerate() {
        let value = match column.column_type() {
            ColumnType::Bool => Value::from(row.try_get::<Option<bool>, _>(index)?),
            ColumnType::SmallInt => Value::from(row.try_get::<Option<i16>, _>(index)?),
            ColumnType::Integer => Value::from(row.try_get::<Option<i32>, _>(index)?),
            ColumnType::BigInt => Value::from(row.try_get::<Option<i64>, _>(index)?),
            ColumnType::Real => Value::from(row.try_get::<Option<f32>, _>(index)?),
            ColumnType::Double => Value::from(row.try_get::<Option<f64>, _>(index)?),
            ColumnType::Text => Value::from(row.try_get::<Option<String>, _>(index)?),
            ColumnType::Uuid => Value::from(row.try_get::<Option<Uuid>, _>(index)?),
            ColumnType::Date => Value::from(row.try_get::<Option<NaiveDate>, _>(index)?),
            ColumnType::Timestamp => {
                Value::from(row.try_get::<Option<DateTime<Utc>>, _>(index)?)
            }
        };
        record.set(column.name(), value);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rp_core::DatabaseConfig;
    use rp_queries::{QueryBuilder, RelationDescriptor};

    use super::*;
    use crate::pool::Database;

    fn unreachable() -> PgEntityOperations {
        let mut config = DatabaseConfig::with_url("postgres://rp:rp@127.0.0.1:1/rp");
        config.min_connections = 0;
        config.connect_timeout_secs = 1;
        let db = Database::connect_lazy(&config).unwrap();
        PgEntityOperations::new(db.pool().clone(), 0)
    }

    fn query() -> SqlQuery {
        let person = Arc::new(RelationDescriptor::new("person").with_column("id", ColumnType::BigInt));
        QueryBuilder::from(person).build().unwrap()
    }

    #[tokio::test]
    async fn test_buffer_is_at_least_one() {
        assert_eq!(unreachable().buffer, 1);
    }

    #[tokio::test]
    async fn test_connection_failure_reaches_the_stream() {
        let mut rows = unreachable().select_all(query());
        assert!(matches!(rows.next().await, Some(Err(RepositoryError::Database(_)))));
        assert!(rows.next().await.is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_reaches_select_one() {
        let result = unreachable().select_one(query()).await;
        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }
}
