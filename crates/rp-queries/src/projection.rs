//! Projections
//!
//! A projection names the columns a query selects and how a fetched row is
//! assembled into a result value.

use std::fmt;
use std::sync::Arc;

use crate::record::Record;
use crate::relation::Column;

/// Error raised while assembling a result value from a row
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("Column {column} is missing from the row")]
    MissingColumn { column: String },

    #[error("Column {column} holds a {found} value, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Cannot construct result: {0}")]
    Constructor(String),
}

/// Types that build themselves from a row
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self, ProjectionError>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> Result<Self, ProjectionError> {
        Ok(record.clone())
    }
}

type Constructor<T> = dyn Fn(&Record) -> Result<T, ProjectionError> + Send + Sync;

/// Selected columns plus the constructor that turns a row into `T`
pub struct Projection<T> {
    columns: Vec<Column>,
    constructor: Arc<Constructor<T>>,
}

impl<T> Projection<T> {
    /// Project `columns` through an explicit constructor
    pub fn constructor<I, F>(columns: I, constructor: F) -> Self
    where
        I: IntoIterator<Item = Column>,
        F: Fn(&Record) -> Result<T, ProjectionError> + Send + Sync + 'static,
    {
        Self {
            columns: columns.into_iter().collect(),
            constructor: Arc::new(constructor),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Build a result value from a fetched row
    pub fn construct(&self, record: &Record) -> Result<T, ProjectionError> {
        (self.constructor)(record)
    }
}

impl<T: FromRecord + 'static> Projection<T> {
    /// Project `columns` through `T`'s [`FromRecord`] implementation
    pub fn of<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = Column>,
    {
        Self::constructor(columns, T::from_record)
    }
}

impl Projection<Record> {
    /// Identity projection returning raw rows
    pub fn records<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = Column>,
    {
        Self::of(columns)
    }
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            constructor: Arc::clone(&self.constructor),
        }
    }
}

impl<T> fmt::Debug for Projection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::ColumnType;

    #[derive(Debug, PartialEq)]
    struct Person {
        id: i64,
        name: String,
    }

    impl FromRecord for Person {
        fn from_record(record: &Record) -> Result<Self, ProjectionError> {
            Ok(Self {
                id: record.get("id")?,
                name: record.get("name")?,
            })
        }
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("person", "id", ColumnType::BigInt),
            Column::new("person", "name", ColumnType::Text),
        ]
    }

    #[test]
    fn test_from_record_projection() {
        let projection = Projection::<Person>::of(columns());
        let row = Record::new().with("id", 1_i64).with("name", "a");
        assert_eq!(
            projection.construct(&row).unwrap(),
            Person {
                id: 1,
                name: "a".to_string()
            }
        );
        assert_eq!(projection.columns().len(), 2);
    }

    #[test]
    fn test_constructor_projection() {
        let projection = Projection::constructor(columns(), |r| {
            let name: String = r.get("name")?;
            Ok(name.to_uppercase())
        });
        let row = Record::new().with("id", 1_i64).with("name", "a");
        assert_eq!(projection.construct(&row).unwrap(), "A");
    }

    #[test]
    fn test_projection_error_surfaces() {
        let projection = Projection::<Person>::of(columns());
        let row = Record::new().with("id", "one").with("name", "a");
        assert!(matches!(
            projection.construct(&row),
            Err(ProjectionError::TypeMismatch { .. })
        ));
    }
}
