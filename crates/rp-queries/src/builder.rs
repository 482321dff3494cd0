//! Query Builder
//!
//! Fluent assembly of a [`SqlQuery`] against one relation. Nothing is checked
//! until [`QueryBuilder::build`], which reports every problem at once.

use std::sync::Arc;

use rp_core::ValidationErrors;

use crate::error::QueryError;
use crate::predicate::Predicate;
use crate::query::SqlQuery;
use crate::relation::{Column, ColumnType, RelationDescriptor};
use crate::sorts::{OrderSpecifier, Sort};

#[derive(Debug, Clone)]
enum Ordering {
    Specifiers(Vec<OrderSpecifier>),
    Sort(Sort),
}

/// Builder for select queries
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    relation: Arc<RelationDescriptor>,
    columns: Option<Vec<Column>>,
    predicate: Predicate,
    orderings: Vec<Ordering>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl QueryBuilder {
    /// Select every column of `relation`, unfiltered and unordered
    pub fn from(relation: Arc<RelationDescriptor>) -> Self {
        Self {
            relation,
            columns: None,
            predicate: Predicate::Always,
            orderings: vec![],
            limit: None,
            offset: None,
        }
    }

    /// Select these columns instead of the whole relation
    pub fn select(mut self, columns: &[Column]) -> Self {
        self.columns = Some(columns.to_vec());
        self
    }

    /// Add a filter; repeated calls are AND-ed
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = std::mem::replace(&mut self.predicate, Predicate::Always).and(predicate);
        self
    }

    /// Append ordering keys
    pub fn order_by(mut self, orders: &[OrderSpecifier]) -> Self {
        if !orders.is_empty() {
            self.orderings.push(Ordering::Specifiers(orders.to_vec()));
        }
        self
    }

    /// Append a property sort, resolved when the query is built
    pub fn sort(mut self, sort: &Sort) -> Self {
        if !sort.is_empty() {
            self.orderings.push(Ordering::Sort(sort.clone()));
        }
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Window by 1-based page number
    pub fn paginate(self, page: i64, per_page: i64) -> Self {
        let offset = (page.max(1) - 1).saturating_mul(per_page);
        self.limit(per_page).offset(offset)
    }

    /// Validate and produce the query
    pub fn build(self) -> Result<SqlQuery, QueryError> {
        let relation = self.relation;
        let mut errors = ValidationErrors::new();

        let columns = self
            .columns
            .unwrap_or_else(|| relation.columns().to_vec());
        if columns.is_empty() {
            errors.add_base("projection selects no columns");
        }
        for column in &columns {
            check_column(&relation, column, &mut errors);
        }

        check_predicate(&relation, &self.predicate, &mut errors);

        let mut orders = vec![];
        for ordering in self.orderings {
            match ordering {
                Ordering::Specifiers(specifiers) => {
                    for order in &specifiers {
                        check_column(&relation, order.column(), &mut errors);
                    }
                    orders.extend(specifiers);
                }
                Ordering::Sort(sort) => match sort.resolve(&relation) {
                    Ok(resolved) => orders.extend(resolved),
                    Err(unresolved) => errors.merge(unresolved),
                },
            }
        }
        check_orders(&orders, &mut errors);

        if matches!(self.limit, Some(n) if n < 0) {
            errors.add("limit", "must not be negative");
        }
        if matches!(self.offset, Some(n) if n < 0) {
            errors.add("offset", "must not be negative");
        }

        if !errors.is_empty() {
            return Err(QueryError::invalid(relation.table(), errors));
        }

        Ok(SqlQuery {
            relation,
            columns,
            predicate: self.predicate,
            orders,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

fn check_column(relation: &RelationDescriptor, column: &Column, errors: &mut ValidationErrors) {
    if !relation.contains(column) {
        errors.add(
            column.name(),
            format!("is not a column of {}", relation.table()),
        );
    }
}

fn check_predicate(relation: &RelationDescriptor, predicate: &Predicate, errors: &mut ValidationErrors) {
    for column in predicate.columns() {
        check_column(relation, column, errors);
    }
    for (column, value) in predicate.bound_values() {
        if !column.column_type().accepts(value) {
            errors.add(
                column.name(),
                format!("expects {}, got {}", column.column_type(), value.kind()),
            );
        }
    }
    check_patterns(predicate, errors);
}

fn check_patterns(predicate: &Predicate, errors: &mut ValidationErrors) {
    match predicate {
        Predicate::Like { column, .. } if column.column_type() != ColumnType::Text => {
            errors.add(column.name(), "pattern matching requires a text column");
        }
        Predicate::And(parts) | Predicate::Or(parts) => {
            for part in parts {
                check_patterns(part, errors);
            }
        }
        Predicate::Not(inner) => check_patterns(inner, errors),
        _ => {}
    }
}

fn check_orders(orders: &[OrderSpecifier], errors: &mut ValidationErrors) {
    for order in orders {
        let column = order.column();
        if order.is_ignore_case() && column.column_type() != ColumnType::Text {
            errors.add(column.name(), "case-insensitive ordering requires a text column");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorts::SortCriterion;

    fn person() -> Arc<RelationDescriptor> {
        Arc::new(
            RelationDescriptor::new("person")
                .with_column("id", ColumnType::BigInt)
                .with_property_column("full_name", "fullName", ColumnType::Text),
        )
    }

    fn invalid(result: Result<SqlQuery, QueryError>) -> ValidationErrors {
        match result {
            Err(QueryError::Invalid { errors, .. }) => errors,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_select_whole_relation() {
        let query = QueryBuilder::from(person()).build().unwrap();
        assert_eq!(query.columns().len(), 2);
        assert_eq!(query.predicate(), &Predicate::Always);
        assert!(!query.is_ordered());
        assert_eq!(query.limit(), None);
    }

    #[test]
    fn test_filters_are_anded() {
        let person = person();
        let id = person.column("id").unwrap().clone();

        let query = QueryBuilder::from(person)
            .filter(id.gt(1_i64))
            .filter(id.lt(5_i64))
            .build()
            .unwrap();
        assert_eq!(query.predicate(), &(id.gt(1_i64) & id.lt(5_i64)));
    }

    #[test]
    fn test_orderings_keep_call_order() {
        let person = person();
        let id = person.column("id").unwrap().clone();

        let query = QueryBuilder::from(person)
            .order_by(&[id.desc()])
            .sort(&Sort::by_asc("fullName"))
            .build()
            .unwrap();
        let names: Vec<&str> = query.orders().iter().map(|o| o.column().name()).collect();
        assert_eq!(names, vec!["id", "full_name"]);
    }

    #[test]
    fn test_paginate() {
        let query = QueryBuilder::from(person()).paginate(3, 10).build().unwrap();
        assert_eq!(query.limit(), Some(10));
        assert_eq!(query.offset(), Some(20));
    }

    #[test]
    fn test_foreign_columns_rejected() {
        let stranger = Column::new("settings", "value", ColumnType::Text);
        let errors = invalid(
            QueryBuilder::from(person())
                .select(&[stranger.clone()])
                .filter(stranger.eq("x"))
                .build(),
        );
        assert_eq!(errors.get("value").map(Vec::len), Some(2));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let person = person();
        let id = person.column("id").unwrap().clone();
        let errors = invalid(QueryBuilder::from(person).filter(id.eq("one")).build());
        assert_eq!(errors.get("id"), Some(&vec!["expects bigint, got text".to_string()]));
    }

    #[test]
    fn test_like_on_non_text_rejected() {
        let person = person();
        let id = person.column("id").unwrap().clone();
        let errors = invalid(QueryBuilder::from(person).filter(!id.like("1%")).build());
        assert!(errors.has_error("id"));
    }

    #[test]
    fn test_ignore_case_on_non_text_rejected() {
        let person = person();
        let id = person.column("id").unwrap().clone();
        let errors = invalid(
            QueryBuilder::from(person.clone())
                .order_by(&[id.asc().ignore_case()])
                .build(),
        );
        assert_eq!(
            errors.get("id"),
            Some(&vec!["case-insensitive ordering requires a text column".to_string()])
        );

        let sort = Sort::unsorted().then(SortCriterion::asc("id").ignoring_case());
        let errors = invalid(QueryBuilder::from(person.clone()).sort(&sort).build());
        assert!(errors.has_error("id"));

        let name = Sort::unsorted().then(SortCriterion::asc("fullName").ignoring_case());
        assert!(QueryBuilder::from(person).sort(&name).build().is_ok());
    }

    #[test]
    fn test_paginate_saturates_offset() {
        let query = QueryBuilder::from(person()).paginate(i64::MAX, 10).build().unwrap();
        assert_eq!(query.limit(), Some(10));
        assert_eq!(query.offset(), Some(i64::MAX));
    }

    #[test]
    fn test_every_problem_reported() {
        let errors = invalid(
            QueryBuilder::from(person())
                .select(&[])
                .sort(&Sort::by_asc("age"))
                .limit(-1)
                .build(),
        );
        assert_eq!(errors.base_errors.len(), 1);
        assert!(errors.has_error("age"));
        assert!(errors.has_error("limit"));
    }

    #[test]
    fn test_error_names_relation() {
        let err = QueryBuilder::from(person()).select(&[]).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid query on person: projection selects no columns"
        );
    }
}
