//! In-memory entity operations
//!
//! Tables of [`Record`]s evaluated with the same semantics the rendered SQL
//! has: three-valued filtering, stable multi-key ordering, offset, limit and
//! projection. Used by tests and by callers that want an executor without a
//! database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::RwLock;
use rp_queries::sorts::compare_by;
use rp_queries::{Record, SqlQuery};

use crate::repository::{EntityOperations, RecordStream, RepositoryError, RepositoryResult};

#[derive(Debug, Default)]
struct Tables {
    rows: RwLock<HashMap<String, Vec<Record>>>,
    statements: AtomicUsize,
}

/// [`EntityOperations`] over tables held in memory
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryOperations {
    tables: Arc<Tables>,
}

impl MemoryOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty table, keeping existing rows
    pub fn create_table(&self, table: impl Into<String>) {
        self.tables.rows.write().entry(table.into()).or_default();
    }

    /// Append a row, creating the table when needed
    pub fn insert(&self, table: impl Into<String>, record: Record) {
        self.tables.rows.write().entry(table.into()).or_default().push(record);
    }

    /// Append rows in order
    pub fn insert_all<I>(&self, table: impl Into<String>, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        self.tables
            .rows
            .write()
            .entry(table.into())
            .or_default()
            .extend(records);
    }

    /// Number of rows in `table`
    pub fn len(&self, table: &str) -> Option<usize> {
        self.tables.rows.read().get(table).map(Vec::len)
    }

    /// Drop every row of every table
    pub fn clear(&self) {
        self.tables.rows.write().clear();
    }

    /// Queries evaluated so far
    pub fn statements_executed(&self) -> usize {
        self.tables.statements.load(Ordering::SeqCst)
    }
}

impl Tables {
    fn evaluate(&self, query: &SqlQuery) -> RepositoryResult<Vec<Record>> {
        self.statements.fetch_add(1, Ordering::SeqCst);
        let table = query.relation().table();
        tracing::debug!(table, filtered = query.is_filtered(), ordered = query.is_ordered(), "evaluate");

        let tables = self.rows.read();
        let rows = tables
            .get(table)
            .ok_or_else(|| RepositoryError::UnknownRelation(table.to_string()))?;

        let mut matched: Vec<&Record> = rows
            .iter()
            .filter(|row| query.predicate().matches(row))
            .collect();
        if query.is_ordered() {
            matched.sort_by(|left, right| compare_by(query.orders(), left, right));
        }

        let offset = query.offset().unwrap_or(0).max(0) as usize;
        let limit = query
            .limit()
            .map(|limit| limit.max(0) as usize)
            .unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| row.project(query.columns()))
            .collect())
    }
}

#[async_trait]
impl EntityOperations for MemoryOperations {
    async fn select_one(&self, query: SqlQuery) -> RepositoryResult<Option<Record>> {
        let mut rows = self.tables.evaluate(&query)?;
        if rows.len() > 1 {
            return Err(RepositoryError::TooManyRows {
                relation: query.relation().table().to_string(),
            });
        }
        Ok(rows.pop())
    }

    fn select_all(&self, query: SqlQuery) -> RecordStream {
        let tables = Arc::clone(&self.tables);

        // Evaluated when the stream is first polled
        let start = async move {
            match tables.evaluate(&query) {
                Ok(rows) => futures::stream::iter(rows.into_iter().map(Ok)).boxed(),
                Err(err) => futures::stream::once(async move { Err(err) }).boxed(),
            }
        };

        futures::stream::once(start).flatten().boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::TryStreamExt;
    use rp_queries::{ColumnType, QueryBuilder, RelationDescriptor, Value};

    use super::*;

    fn person() -> Arc<RelationDescriptor> {
        Arc::new(
            RelationDescriptor::new("person")
                .with_column("id", ColumnType::BigInt)
                .with_column("name", ColumnType::Text)
                .with_primary_key(["id"]),
        )
    }

    fn row(id: i64, name: Option<&str>) -> Record {
        Record::new().with("id", id).with("name", name)
    }

    fn seeded() -> MemoryOperations {
        let memory = MemoryOperations::new();
        memory.insert_all(
            "person",
            vec![row(1, Some("b")), row(2, None), row(3, Some("a")), row(4, Some("b"))],
        );
        memory
    }

    async fn ids(memory: &MemoryOperations, query: SqlQuery) -> Vec<i64> {
        memory
            .select_all(query)
            .try_collect::<Vec<_>>()
            .await
            .unwrap()
            .iter()
            .map(|r| r.get::<i64>("id").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_natural_order_and_filter() {
        let memory = seeded();
        let person = person();
        let name = person.column("name").unwrap().clone();

        let all = QueryBuilder::from(person.clone()).build().unwrap();
        assert_eq!(ids(&memory, all).await, vec![1, 2, 3, 4]);

        // the null name is unknown under <>, so row 2 is filtered out
        let not_a = QueryBuilder::from(person).filter(name.ne("a")).build().unwrap();
        assert_eq!(ids(&memory, not_a).await, vec![1, 4]);
        assert_eq!(memory.statements_executed(), 2);
    }

    #[tokio::test]
    async fn test_stable_multi_key_sort() {
        let memory = seeded();
        let person = person();
        let name = person.column("name").unwrap().clone();
        let id = person.column("id").unwrap().clone();

        let by_name = QueryBuilder::from(person.clone())
            .order_by(&[name.asc()])
            .build()
            .unwrap();
        assert_eq!(ids(&memory, by_name).await, vec![3, 1, 4, 2]);

        let by_name_desc_then_id_desc = QueryBuilder::from(person)
            .order_by(&[name.desc().nulls_last(), id.desc()])
            .build()
            .unwrap();
        assert_eq!(ids(&memory, by_name_desc_then_id_desc).await, vec![4, 1, 3, 2]);
    }

    #[tokio::test]
    async fn test_window_and_projection() {
        let memory = seeded();
        let person = person();
        let id = person.column("id").unwrap().clone();

        let query = QueryBuilder::from(person)
            .select(&[id.clone()])
            .order_by(&[id.desc()])
            .limit(2)
            .offset(1)
            .build()
            .unwrap();
        let rows: Vec<Record> = memory.select_all(query).try_collect().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(rows[0].value("id"), Some(&Value::Int(3)));
        assert_eq!(rows[1].value("id"), Some(&Value::Int(2)));
    }

    #[tokio::test]
    async fn test_select_one() {
        let memory = seeded();
        let person = person();
        let id = person.column("id").unwrap().clone();
        let name = person.column("name").unwrap().clone();

        let one = QueryBuilder::from(person.clone()).filter(id.eq(3_i64)).build().unwrap();
        assert_eq!(memory.select_one(one).await.unwrap(), Some(row(3, Some("a"))));

        let none = QueryBuilder::from(person.clone()).filter(id.eq(99_i64)).build().unwrap();
        assert_eq!(memory.select_one(none).await.unwrap(), None);

        let two = QueryBuilder::from(person).filter(name.eq("b")).build().unwrap();
        assert!(matches!(
            memory.select_one(two).await,
            Err(RepositoryError::TooManyRows { relation }) if relation == "person"
        ));
    }

    #[tokio::test]
    async fn test_unknown_relation_on_stream() {
        let memory = MemoryOperations::new();
        let query = QueryBuilder::from(person()).build().unwrap();

        let mut rows = memory.select_all(query);
        assert!(matches!(
            rows.next().await,
            Some(Err(RepositoryError::UnknownRelation(table))) if table == "person"
        ));
        assert!(rows.next().await.is_none());
    }

    #[tokio::test]
    async fn test_select_all_evaluates_on_first_poll() {
        let memory = seeded();
        let query = QueryBuilder::from(person()).build().unwrap();

        let mut rows = memory.select_all(query);
        assert_eq!(memory.statements_executed(), 0);

        memory.insert("person", row(5, Some("c")));
        let first = rows.next().await;
        assert_eq!(memory.statements_executed(), 1);
        assert!(matches!(first, Some(Ok(_))));

        let rest: Vec<Record> = rows.try_collect().await.unwrap();
        assert_eq!(rest.len(), 4);
    }

    #[test]
    fn test_clones_share_tables() {
        let memory = MemoryOperations::new();
        memory.clone().insert("person", row(1, Some("a")));
        assert_eq!(memory.len("person"), Some(1));
    }

    #[test]
    fn test_table_management() {
        let memory = MemoryOperations::new();
        memory.create_table("person");
        assert_eq!(memory.len("person"), Some(0));
        memory.insert("person", row(1, Some("a")));
        memory.create_table("person");
        assert_eq!(memory.len("person"), Some(1));
        memory.clear();
        assert_eq!(memory.len("person"), None);
    }
}
