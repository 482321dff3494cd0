//! Fetched rows

use crate::projection::ProjectionError;
use crate::relation::Column;
use crate::value::{FromValue, Value};

/// One row: ordered (column name, value) pairs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self { values: vec![] }
    }

    /// Set a column (builder pattern)
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing an earlier value for the same name
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    /// Raw value of a column, `None` when the row has no such column
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Typed value of a column
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, ProjectionError> {
        let value = self
            .value(column)
            .ok_or_else(|| ProjectionError::MissingColumn {
                column: column.to_string(),
            })?;
        T::from_value(value).ok_or_else(|| ProjectionError::TypeMismatch {
            column: column.to_string(),
            expected: T::EXPECTED,
            found: value.kind(),
        })
    }

    /// Keep only `columns`, in their order; absent columns become null
    pub fn project(&self, columns: &[Column]) -> Record {
        Record {
            values: columns
                .iter()
                .map(|c| {
                    let value = self.value(c.name()).cloned().unwrap_or(Value::Null);
                    (c.name().to_string(), value)
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}
