//! Textual filters
//!
//! Filters in the JSON shape used by the OpenProject API:
//!
//! ```json
//! [{ "name": { "operator": "~", "values": ["ali"] } },
//!  { "id":   { "operator": ">", "values": ["1"] } }]
//! ```
//!
//! Each filter names an attribute (a column or property name), an operator and
//! its values as strings. A [`FilterSet`] is AND-ed into a single
//! [`Predicate`] once it is resolved against a relation.

use std::collections::HashSet;

use rp_core::ValidationErrors;
use serde::Deserialize;

use crate::error::QueryError;
use crate::predicate::{escape_like, Predicate};
use crate::relation::{Column, ColumnType, RelationDescriptor};
use crate::value::Value;

/// Filter operators that can be applied to values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equals (=), IN for several values
    Equals,
    /// Not equals (!)
    NotEquals,
    /// Contains, ignoring case (~)
    Contains,
    /// Does not contain (!~)
    NotContains,
    /// Starts with (**)
    StartsWith,
    /// Ends with (*~)
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    /// Between two values, inclusive (<>d)
    Between,
    /// Is null (*)
    IsNull,
    /// Is not null (!*)
    IsNotNull,
}

impl FilterOperator {
    /// Parse operator from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Equals),
            "!" => Some(Self::NotEquals),
            "~" => Some(Self::Contains),
            "!~" => Some(Self::NotContains),
            "**" => Some(Self::StartsWith),
            "*~" => Some(Self::EndsWith),
            ">" => Some(Self::GreaterThan),
            ">=" => Some(Self::GreaterThanOrEqual),
            "<" => Some(Self::LessThan),
            "<=" => Some(Self::LessThanOrEqual),
            "<>d" => Some(Self::Between),
            "*" => Some(Self::IsNull),
            "!*" => Some(Self::IsNotNull),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!",
            Self::Contains => "~",
            Self::NotContains => "!~",
            Self::StartsWith => "**",
            Self::EndsWith => "*~",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Between => "<>d",
            Self::IsNull => "*",
            Self::IsNotNull => "!*",
        }
    }

    /// Check if this operator requires values
    pub fn requires_values(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Text pattern operators only apply to text columns
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::NotContains | Self::StartsWith | Self::EndsWith
        )
    }

    /// Exact number of values, when fixed
    fn arity(&self) -> Option<usize> {
        match self {
            Self::Equals | Self::NotEquals => None,
            Self::IsNull | Self::IsNotNull => Some(0),
            Self::Between => Some(2),
            _ => Some(1),
        }
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// The attribute being filtered (column or property name)
    pub attribute: String,
    /// The operator to apply
    pub operator: FilterOperator,
    /// The raw values to filter by
    pub values: Vec<String>,
}

impl Filter {
    /// Create a new filter
    pub fn new<I, S>(attribute: impl Into<String>, operator: FilterOperator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute: attribute.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an equals filter
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(attribute, FilterOperator::Equals, [value])
    }

    /// Create a contains filter
    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(attribute, FilterOperator::Contains, [value])
    }

    /// Create an is null filter
    pub fn is_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, FilterOperator::IsNull, Vec::<String>::new())
    }

    /// Create an is not null filter
    pub fn is_not_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, FilterOperator::IsNotNull, Vec::<String>::new())
    }

    /// Resolve against `relation`, recording problems under the attribute name
    fn to_predicate(&self, relation: &RelationDescriptor, errors: &mut ValidationErrors) -> Option<Predicate> {
        let Some(column) = relation.by_property(&self.attribute) else {
            errors.add(
                self.attribute.clone(),
                format!("is not a column of {}", relation.table()),
            );
            return None;
        };

        let count = self.values.len();
        match self.operator.arity() {
            Some(expected) if expected != count => {
                errors.add(
                    self.attribute.clone(),
                    format!(
                        "operator {} takes {} value(s), got {}",
                        self.operator.as_str(),
                        expected,
                        count
                    ),
                );
                return None;
            }
            None if count == 0 => {
                errors.add(
                    self.attribute.clone(),
                    format!("operator {} requires values", self.operator.as_str()),
                );
                return None;
            }
            _ => {}
        }

        if self.operator.is_textual() {
            if column.column_type() != ColumnType::Text {
                errors.add(
                    self.attribute.clone(),
                    format!("operator {} requires a text column", self.operator.as_str()),
                );
                return None;
            }
            return Some(self.pattern_predicate(column, &self.values[0]));
        }

        let mut values = Vec::with_capacity(count);
        for raw in &self.values {
            match column.column_type().parse_value(raw) {
                Ok(value) => values.push(value),
                Err(message) => errors.add(self.attribute.clone(), message),
            }
        }
        if values.len() != count {
            return None;
        }

        Some(self.value_predicate(column, values))
    }

    fn pattern_predicate(&self, column: &Column, text: &str) -> Predicate {
        let text = escape_like(text);
        let (pattern, negated) = match self.operator {
            FilterOperator::StartsWith => (format!("{}%", text), false),
            FilterOperator::EndsWith => (format!("%{}", text), false),
            FilterOperator::NotContains => (format!("%{}%", text), true),
            _ => (format!("%{}%", text), false),
        };
        Predicate::Like {
            column: column.clone(),
            pattern,
            case_insensitive: true,
            negated,
        }
    }

    fn value_predicate(&self, column: &Column, mut values: Vec<Value>) -> Predicate {
        match self.operator {
            FilterOperator::Equals if values.len() == 1 => column.eq(values.remove(0)),
            FilterOperator::Equals => column.is_in(values),
            FilterOperator::NotEquals if values.len() == 1 => column.ne(values.remove(0)),
            FilterOperator::NotEquals => column.not_in(values),
            FilterOperator::GreaterThan => column.gt(values.remove(0)),
            FilterOperator::GreaterThanOrEqual => column.ge(values.remove(0)),
            FilterOperator::LessThan => column.lt(values.remove(0)),
            FilterOperator::LessThanOrEqual => column.le(values.remove(0)),
            FilterOperator::Between => {
                let high = values.remove(1);
                column.between(values.remove(0), high)
            }
            FilterOperator::IsNull => column.is_null(),
            FilterOperator::IsNotNull => column.is_not_null(),
            FilterOperator::Contains
            | FilterOperator::NotContains
            | FilterOperator::StartsWith
            | FilterOperator::EndsWith => Predicate::Never,
        }
    }
}

#[derive(Deserialize)]
struct RawFilter {
    operator: String,
    #[serde(default)]
    values: Vec<serde_json::Value>,
}

/// Filter set - a collection of filters with AND semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    /// Create a new empty filter set
    pub fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Parse the JSON filter syntax
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        let raw: Vec<std::collections::BTreeMap<String, RawFilter>> =
            serde_json::from_str(json).map_err(|e| QueryError::MalformedFilter(e.to_string()))?;

        let mut set = Self::new();
        for entry in raw {
            for (attribute, filter) in entry {
                let operator = FilterOperator::from_str(&filter.operator).ok_or_else(|| {
                    QueryError::MalformedFilter(format!(
                        "unknown operator '{}' for {}",
                        filter.operator, attribute
                    ))
                })?;
                let values = filter
                    .values
                    .into_iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>();
                set.add(Filter::new(attribute, operator, values));
            }
        }
        Ok(set)
    }

    /// Add a filter to the set
    pub fn add(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Add a filter and return self (builder pattern)
    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Get all filters
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Check if any filters are set
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Get number of filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if a specific attribute is being filtered
    pub fn has_filter_for(&self, attribute: &str) -> bool {
        self.filters.iter().any(|f| f.attribute == attribute)
    }

    /// Get all filtered attribute names
    pub fn filtered_attributes(&self) -> HashSet<&str> {
        self.filters.iter().map(|f| f.attribute.as_str()).collect()
    }

    /// AND every filter into one predicate over `relation`
    pub fn to_predicate(&self, relation: &RelationDescriptor) -> Result<Predicate, QueryError> {
        let mut errors = ValidationErrors::new();
        let predicates: Vec<Predicate> = self
            .filters
            .iter()
            .filter_map(|filter| filter.to_predicate(relation, &mut errors))
            .collect();

        if !errors.is_empty() {
            return Err(QueryError::invalid(relation.table(), errors));
        }
        Ok(Predicate::all(predicates))
    }
}
