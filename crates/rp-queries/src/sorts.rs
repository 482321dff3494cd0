//! Sort orders
//!
//! Two ways to order a query: [`OrderSpecifier`]s name columns directly, a
//! [`Sort`] names properties and is resolved against a relation when the query
//! is built.

use std::cmp::Ordering;

use rp_core::ValidationErrors;

use crate::record::Record;
use crate::relation::{Column, RelationDescriptor};
use crate::value::Value;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest first)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest first)
    Desc,
}

impl SortDirection {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Convert to SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Get the opposite direction
    pub fn reverse(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Placement of nulls in an ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullHandling {
    /// Database default: nulls sort above every value
    #[default]
    Native,
    NullsFirst,
    NullsLast,
}

/// A single (column, direction) ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpecifier {
    column: Column,
    direction: SortDirection,
    nulls: NullHandling,
    ignore_case: bool,
}

impl OrderSpecifier {
    pub fn new(column: Column, direction: SortDirection) -> Self {
        Self {
            column,
            direction,
            nulls: NullHandling::Native,
            ignore_case: false,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullHandling::NullsFirst;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullHandling::NullsLast;
        self
    }

    /// Compare text case-insensitively
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn null_handling(&self) -> NullHandling {
        self.nulls
    }

    pub fn is_ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Whether nulls come before values under this ordering
    pub fn nulls_come_first(&self) -> bool {
        match self.nulls {
            NullHandling::NullsFirst => true,
            NullHandling::NullsLast => false,
            NullHandling::Native => self.direction == SortDirection::Desc,
        }
    }

    /// SQL fragment, e.g. `"person"."name" DESC NULLS LAST`
    pub fn to_sql(&self) -> String {
        let column = if self.ignore_case {
            format!("LOWER({})", self.column.qualified_name())
        } else {
            self.column.qualified_name()
        };
        let nulls = match self.nulls {
            NullHandling::Native => "",
            NullHandling::NullsFirst => " NULLS FIRST",
            NullHandling::NullsLast => " NULLS LAST",
        };
        format!("{} {}{}", column, self.direction.as_sql(), nulls)
    }

    /// Order two rows the way the rendered SQL would
    pub fn compare(&self, left: &Record, right: &Record) -> Ordering {
        const NULL: &Value = &Value::Null;
        let l = left.value(self.column.name()).unwrap_or(NULL);
        let r = right.value(self.column.name()).unwrap_or(NULL);

        match (l.is_null(), r.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if self.nulls_come_first() => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if self.nulls_come_first() => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = if self.ignore_case {
                    l.compare_ignore_case(r)
                } else {
                    l.compare(r)
                }
                .unwrap_or(Ordering::Equal);
                match self.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }
        }
    }
}

/// Compare rows by several keys, primary first
pub fn compare_by(orders: &[OrderSpecifier], left: &Record, right: &Record) -> Ordering {
    orders
        .iter()
        .map(|order| order.compare(left, right))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Ordering constructors
impl Column {
    pub fn asc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.clone(), SortDirection::Asc)
    }

    pub fn desc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.clone(), SortDirection::Desc)
    }
}

/// A single sort criterion, by property name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// The property to sort by
    pub property: String,
    /// The sort direction
    pub direction: SortDirection,
    /// Null placement
    pub nulls: NullHandling,
    /// Compare text case-insensitively
    pub ignore_case: bool,
}

impl SortCriterion {
    /// Create a new sort criterion
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
            nulls: NullHandling::Native,
            ignore_case: false,
        }
    }

    /// Create ascending sort
    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Asc)
    }

    /// Create descending sort
    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Desc)
    }

    /// Reverse the sort direction
    pub fn reversed(mut self) -> Self {
        self.direction = self.direction.reverse();
        self
    }

    pub fn with_nulls(mut self, nulls: NullHandling) -> Self {
        self.nulls = nulls;
        self
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    fn resolve(&self, relation: &RelationDescriptor) -> Option<OrderSpecifier> {
        let column = relation.by_property(&self.property)?;
        let mut order = OrderSpecifier::new(column.clone(), self.direction);
        order.nulls = self.nulls;
        order.ignore_case = self.ignore_case;
        Some(order)
    }
}

/// Generic sort descriptor: criteria by property name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    criteria: Vec<SortCriterion>,
}

impl Sort {
    /// No ordering
    pub fn unsorted() -> Self {
        Self { criteria: vec![] }
    }

    /// Create with a single criterion
    pub fn by(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            criteria: vec![SortCriterion::new(property, direction)],
        }
    }

    /// Create with ascending sort on single property
    pub fn by_asc(property: impl Into<String>) -> Self {
        Self::by(property, SortDirection::Asc)
    }

    /// Create with descending sort on single property
    pub fn by_desc(property: impl Into<String>) -> Self {
        Self::by(property, SortDirection::Desc)
    }

    /// Add a sort criterion (builder pattern)
    pub fn then(mut self, criterion: SortCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Add ascending sort
    pub fn then_asc(self, property: impl Into<String>) -> Self {
        self.then(SortCriterion::asc(property))
    }

    /// Add descending sort
    pub fn then_desc(self, property: impl Into<String>) -> Self {
        self.then(SortCriterion::desc(property))
    }

    /// Parse `name:desc,id` (direction defaults to ascending)
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut sort = Self::unsorted();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (property, direction) = match part.split_once(':') {
                Some((property, direction)) => {
                    let direction = SortDirection::from_str(direction.trim())
                        .ok_or_else(|| format!("unknown sort direction '{}'", direction))?;
                    (property.trim(), direction)
                }
                None => (part, SortDirection::Asc),
            };
            sort = sort.then(SortCriterion::new(property, direction));
        }
        Ok(sort)
    }

    /// Get all sort criteria
    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    /// Check if any sort is defined
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Get number of sort criteria
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Check if sorting by a specific property
    pub fn sorts_by(&self, property: &str) -> bool {
        self.criteria.iter().any(|c| c.property == property)
    }

    /// Resolve every criterion to a column of `relation`
    pub fn resolve(&self, relation: &RelationDescriptor) -> Result<Vec<OrderSpecifier>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut orders = Vec::with_capacity(self.criteria.len());
        for criterion in &self.criteria {
            match criterion.resolve(relation) {
                Some(order) => orders.push(order),
                None => errors.add(
                    criterion.property.clone(),
                    format!("is not a property of {}", relation.table()),
                ),
            }
        }
        errors.into_result().map(|_| orders)
    }
}

impl From<&[OrderSpecifier]> for Sort {
    fn from(orders: &[OrderSpecifier]) -> Self {
        Self {
            criteria: orders
                .iter()
                .map(|o| SortCriterion {
                    property: o.column.property().to_string(),
                    direction: o.direction,
                    nulls: o.nulls,
                    ignore_case: o.ignore_case,
                })
                .collect(),
        }
    }
}
