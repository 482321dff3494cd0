//! Built queries and SQL rendering
//!
//! A [`SqlQuery`] is the validated output of [`crate::QueryBuilder`]. It renders
//! to PostgreSQL text with `$n` positional parameters.

use std::sync::Arc;

use crate::predicate::Predicate;
use crate::relation::{Column, RelationDescriptor};
use crate::sorts::OrderSpecifier;
use crate::value::Value;

/// A validated select query
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub(crate) relation: Arc<RelationDescriptor>,
    pub(crate) columns: Vec<Column>,
    pub(crate) predicate: Predicate,
    pub(crate) orders: Vec<OrderSpecifier>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl SqlQuery {
    pub fn relation(&self) -> &RelationDescriptor {
        &self.relation
    }

    /// Projected columns, in select order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Filter; [`Predicate::Always`] when unfiltered
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn orders(&self) -> &[OrderSpecifier] {
        &self.orders
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn is_filtered(&self) -> bool {
        self.predicate != Predicate::Always
    }

    pub fn is_ordered(&self) -> bool {
        !self.orders.is_empty()
    }

    /// Render SQL text plus its bound parameters
    pub fn to_statement(&self) -> SqlStatement {
        let mut writer = SqlWriter::default();

        let select = self
            .columns
            .iter()
            .map(Column::qualified_name)
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {} FROM {}", select, self.relation.qualified_name());

        if self.is_filtered() {
            sql.push_str(" WHERE ");
            sql.push_str(&writer.predicate(&self.predicate));
        }

        if self.is_ordered() {
            let order = self
                .orders
                .iter()
                .map(OrderSpecifier::to_sql)
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        SqlStatement {
            sql,
            params: writer.params,
        }
    }
}

/// Rendered SQL and the values bound to its `$n` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct SqlWriter {
    params: Vec<Value>,
}

impl SqlWriter {
    /// Placeholder for a bound value; nulls are written inline
    fn bind(&mut self, value: &Value) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.params.push(value.clone());
        format!("${}", self.params.len())
    }

    fn predicate(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Always => "TRUE".to_string(),
            Predicate::Never => "FALSE".to_string(),
            Predicate::Compare { column, op, value } => {
                format!("{} {} {}", column.qualified_name(), op.as_sql(), self.bind(value))
            }
            Predicate::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "TRUE" } else { "FALSE" }.to_string();
                }
                let placeholders = values
                    .iter()
                    .map(|v| self.bind(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column.qualified_name(), op, placeholders)
            }
            Predicate::Like {
                column,
                pattern,
                case_insensitive,
                negated,
            } => {
                let op = match (*negated, *case_insensitive) {
                    (false, false) => "LIKE",
                    (false, true) => "ILIKE",
                    (true, false) => "NOT LIKE",
                    (true, true) => "NOT ILIKE",
                };
                let pattern = self.bind(&Value::Text(pattern.clone()));
                format!("{} {} {}", column.qualified_name(), op, pattern)
            }
            Predicate::Between { column, low, high } => {
                let low = self.bind(low);
                let high = self.bind(high);
                format!("{} BETWEEN {} AND {}", column.qualified_name(), low, high)
            }
            Predicate::IsNull { column, negated } => {
                let op = if *negated { "IS NOT NULL" } else { "IS NULL" };
                format!("{} {}", column.qualified_name(), op)
            }
            Predicate::And(parts) => self.junction(parts, " AND ", "TRUE"),
            Predicate::Or(parts) => self.junction(parts, " OR ", "FALSE"),
            Predicate::Not(inner) => format!("NOT ({})", self.predicate(inner)),
        }
    }

    fn junction(&mut self, parts: &[Predicate], separator: &str, empty: &str) -> String {
        match parts {
            [] => empty.to_string(),
            [single] => self.predicate(single),
            _ => parts
                .iter()
                .map(|part| match part {
                    Predicate::And(inner) | Predicate::Or(inner) if inner.len() > 1 => {
                        format!("({})", self.predicate(part))
                    }
                    _ => self.predicate(part),
                })
                .collect::<Vec<_>>()
                .join(separator),
        }
    }
}
