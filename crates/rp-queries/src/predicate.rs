//! Predicates
//!
//! An immutable boolean expression tree over relation columns. Predicates are
//! built from [`Column`] helpers and combined with [`Predicate::and`],
//! [`Predicate::or`] or the `&`, `|` and `!` operators.
//!
//! ```
//! use rp_queries::{ColumnType, RelationDescriptor};
//!
//! let person = RelationDescriptor::new("person")
//!     .with_column("id", ColumnType::BigInt)
//!     .with_column("name", ColumnType::Text);
//! let id = person.column("id").unwrap();
//! let name = person.column("name").unwrap();
//!
//! let predicate = id.gt(1_i64) & (name.starts_with("a") | name.is_null());
//! assert_eq!(predicate.columns().len(), 3);
//! ```

use std::cmp::Ordering;
use std::ops;

use crate::record::Record;
use crate::relation::Column;
use crate::value::Value;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

/// Boolean expression over relation columns
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    Always,
    /// Matches no row
    Never,
    Compare {
        column: Column,
        op: CompareOp,
        value: Value,
    },
    In {
        column: Column,
        values: Vec<Value>,
        negated: bool,
    },
    Like {
        column: Column,
        pattern: String,
        case_insensitive: bool,
        negated: bool,
    },
    Between {
        column: Column,
        low: Value,
        high: Value,
    },
    IsNull {
        column: Column,
        negated: bool,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction of every predicate; `Always` when empty
    pub fn all<I: IntoIterator<Item = Predicate>>(predicates: I) -> Self {
        let mut parts: Vec<Predicate> = predicates.into_iter().collect();
        match parts.len() {
            0 => Self::Always,
            1 => parts.remove(0),
            _ => parts.into_iter().fold(Self::And(vec![]), Self::and),
        }
    }

    /// Disjunction of every predicate; `Never` when empty
    pub fn any<I: IntoIterator<Item = Predicate>>(predicates: I) -> Self {
        let mut parts: Vec<Predicate> = predicates.into_iter().collect();
        match parts.len() {
            0 => Self::Never,
            1 => parts.remove(0),
            _ => parts.into_iter().fold(Self::Or(vec![]), Self::or),
        }
    }

    /// `self AND other`, flattening nested conjunctions
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::Always, p) | (p, Self::Always) => p,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), p) => {
                left.push(p);
                Self::And(left)
            }
            (p, Self::And(mut right)) => {
                right.insert(0, p);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// `self OR other`, flattening nested disjunctions
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::Never, p) | (p, Self::Never) => p,
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), p) => {
                left.push(p);
                Self::Or(left)
            }
            (p, Self::Or(mut right)) => {
                right.insert(0, p);
                Self::Or(right)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }

    /// `NOT self`
    pub fn negate(self) -> Self {
        match self {
            Self::Always => Self::Never,
            Self::Never => Self::Always,
            Self::Not(inner) => *inner,
            p => Self::Not(Box::new(p)),
        }
    }

    /// Every column referenced by the predicate, in visiting order
    pub fn columns(&self) -> Vec<&Column> {
        let mut columns = vec![];
        self.visit_columns(&mut columns);
        columns
    }

    fn visit_columns<'a>(&'a self, out: &mut Vec<&'a Column>) {
        match self {
            Self::Always | Self::Never => {}
            Self::Compare { column, .. }
            | Self::In { column, .. }
            | Self::Like { column, .. }
            | Self::Between { column, .. }
            | Self::IsNull { column, .. } => out.push(column),
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.visit_columns(out);
                }
            }
            Self::Not(inner) => inner.visit_columns(out),
        }
    }

    /// Every (column, value) pair the predicate compares
    pub fn bound_values(&self) -> Vec<(&Column, &Value)> {
        let mut out = vec![];
        self.visit_values(&mut out);
        out
    }

    fn visit_values<'a>(&'a self, out: &mut Vec<(&'a Column, &'a Value)>) {
        match self {
            Self::Compare { column, value, .. } => out.push((column, value)),
            Self::In { column, values, .. } => out.extend(values.iter().map(|v| (column, v))),
            Self::Between { column, low, high } => {
                out.push((column, low));
                out.push((column, high));
            }
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.visit_values(out);
                }
            }
            Self::Not(inner) => inner.visit_values(out),
            Self::Always | Self::Never | Self::Like { .. } | Self::IsNull { .. } => {}
        }
    }

    /// Evaluate against a row with SQL three-valued logic.
    ///
    /// `None` is "unknown"; a row passes a filter only on `Some(true)`.
    /// Columns absent from the row read as null.
    pub fn evaluate(&self, record: &Record) -> Option<bool> {
        match self {
            Self::Always => Some(true),
            Self::Never => Some(false),
            Self::Compare { column, op, value } => {
                read_column(record, column).compare(value).map(|ordering| op.holds(ordering))
            }
            Self::In {
                column,
                values,
                negated,
            } => {
                let actual = read_column(record, column);
                let mut unknown = false;
                for candidate in values {
                    match actual.sql_eq(candidate) {
                        Some(true) => return Some(!negated),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                if unknown {
                    None
                } else {
                    Some(*negated)
                }
            }
            Self::Like {
                column,
                pattern,
                case_insensitive,
                negated,
            } => {
                let actual = read_column(record, column);
                if actual.is_null() {
                    return None;
                }
                let text = actual.as_str()?;
                Some(like_matches(text, pattern, *case_insensitive) != *negated)
            }
            Self::Between { column, low, high } => {
                let actual = read_column(record, column);
                let above = actual.compare(low).map(|o| o != Ordering::Less);
                let below = actual.compare(high).map(|o| o != Ordering::Greater);
                and3(above, below)
            }
            Self::IsNull { column, negated } => Some(read_column(record, column).is_null() != *negated),
            Self::And(parts) => parts
                .iter()
                .fold(Some(true), |acc, part| and3(acc, part.evaluate(record))),
            Self::Or(parts) => parts
                .iter()
                .fold(Some(false), |acc, part| or3(acc, part.evaluate(record))),
            Self::Not(inner) => inner.evaluate(record).map(|b| !b),
        }
    }

    /// Whether a row passes this predicate as a filter
    pub fn matches(&self, record: &Record) -> bool {
        self.evaluate(record) == Some(true)
    }
}

fn read_column<'r>(record: &'r Record, column: &Column) -> &'r Value {
    const NULL: &Value = &Value::Null;
    record.value(column.name()).unwrap_or(NULL)
}

fn and3(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// SQL `LIKE` matching: `%` any run, `_` one character, `\` escapes
pub fn like_matches(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let fold = |s: &str| {
        if case_insensitive {
            s.to_lowercase()
        } else {
            s.to_string()
        }
    };
    let text: Vec<char> = fold(text).chars().collect();
    let tokens = like_tokens(&fold(pattern));

    // reachable[i]: pattern prefix matched so far can end at text position i
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            LikeToken::AnyRun => {
                let mut seen = false;
                for i in 0..=text.len() {
                    seen |= reachable[i];
                    next[i] = seen;
                }
            }
            LikeToken::AnyOne => {
                for i in 0..text.len() {
                    next[i + 1] = reachable[i];
                }
            }
            LikeToken::Literal(c) => {
                for i in 0..text.len() {
                    next[i + 1] = reachable[i] && text[i] == *c;
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

enum LikeToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = vec![];
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

/// Escape `%`, `_` and `\` so text matches literally inside a LIKE pattern
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

impl ops::BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        self.and(rhs)
    }
}

impl ops::BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        self.or(rhs)
    }
}

impl ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        self.negate()
    }
}

/// Predicate constructors
impl Column {
    fn compare(&self, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            column: self.clone(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn is_in<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            column: self.clone(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            column: self.clone(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        Predicate::Between {
            column: self.clone(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            column: self.clone(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull {
            column: self.clone(),
            negated: true,
        }
    }

    /// Raw LIKE pattern, case sensitive
    pub fn like(&self, pattern: impl Into<String>) -> Predicate {
        self.like_with(pattern.into(), false, false)
    }

    /// Raw LIKE pattern, case insensitive
    pub fn ilike(&self, pattern: impl Into<String>) -> Predicate {
        self.like_with(pattern.into(), true, false)
    }

    pub fn not_like(&self, pattern: impl Into<String>) -> Predicate {
        self.like_with(pattern.into(), false, true)
    }

    pub fn starts_with(&self, prefix: &str) -> Predicate {
        self.like(format!("{}%", escape_like(prefix)))
    }

    pub fn ends_with(&self, suffix: &str) -> Predicate {
        self.like(format!("%{}", escape_like(suffix)))
    }

    pub fn contains(&self, text: &str) -> Predicate {
        self.like(format!("%{}%", escape_like(text)))
    }

    pub fn contains_ignore_case(&self, text: &str) -> Predicate {
        self.ilike(format!("%{}%", escape_like(text)))
    }

    fn like_with(&self, pattern: String, case_insensitive: bool, negated: bool) -> Predicate {
        Predicate::Like {
            column: self.clone(),
            pattern,
            case_insensitive,
            negated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{ColumnType, RelationDescriptor};

    fn person() -> RelationDescriptor {
        RelationDescriptor::new("person")
            .with_column("id", ColumnType::BigInt)
            .with_column("name", ColumnType::Text)
    }

    fn row(id: i64, name: Option<&str>) -> Record {
        Record::new().with("id", id).with("name", name)
    }

    #[test]
    fn test_compare_evaluation() {
        let person = person();
        let id = person.column("id").unwrap();

        assert!(id.eq(1_i64).matches(&row(1, Some("a"))));
        assert!(!id.eq(1_i64).matches(&row(2, Some("b"))));
        assert!(id.ge(2_i64).matches(&row(2, Some("b"))));
        assert!(id.lt(2_i64).matches(&row(1, Some("a"))));
        assert!(id.ne(2_i64).matches(&row(1, Some("a"))));
    }

    #[test]
    fn test_null_is_unknown() {
        let person = person();
        let name = person.column("name").unwrap();
        let nameless = row(3, None);

        assert_eq!(name.eq("a").evaluate(&nameless), None);
        assert_eq!(name.ne("a").evaluate(&nameless), None);
        assert_eq!((!name.eq("a")).evaluate(&nameless), None);
        assert!(name.is_null().matches(&nameless));
        assert!(!name.is_not_null().matches(&nameless));
    }

    #[test]
    fn test_three_valued_connectives() {
        let person = person();
        let id = person.column("id").unwrap();
        let name = person.column("name").unwrap();
        let nameless = row(3, None);

        // unknown AND false = false, unknown OR true = true
        assert_eq!((name.eq("a") & id.eq(9_i64)).evaluate(&nameless), Some(false));
        assert_eq!((name.eq("a") | id.eq(3_i64)).evaluate(&nameless), Some(true));
        assert_eq!((name.eq("a") & id.eq(3_i64)).evaluate(&nameless), None);
    }

    #[test]
    fn test_in_evaluation() {
        let person = person();
        let id = person.column("id").unwrap();

        assert!(id.is_in([1_i64, 2]).matches(&row(2, None)));
        assert!(!id.is_in([1_i64, 2]).matches(&row(3, None)));
        assert!(id.not_in([1_i64, 2]).matches(&row(3, None)));
        assert!(!id.is_in(Vec::<i64>::new()).matches(&row(3, None)));
        // NOT IN with a null candidate never passes
        assert_eq!(
            id.not_in([Value::Int(1), Value::Null]).evaluate(&row(3, None)),
            None
        );
    }

    #[test]
    fn test_between_and_like() {
        let person = person();
        let id = person.column("id").unwrap();
        let name = person.column("name").unwrap();

        assert!(id.between(1_i64, 3_i64).matches(&row(3, None)));
        assert!(!id.between(1_i64, 3_i64).matches(&row(4, None)));
        assert!(name.starts_with("al").matches(&row(1, Some("alice"))));
        assert!(name.ends_with("ce").matches(&row(1, Some("alice"))));
        assert!(name.contains_ignore_case("LIC").matches(&row(1, Some("alice"))));
        assert!(!name.contains("LIC").matches(&row(1, Some("alice"))));
        assert!(name.not_like("b%").matches(&row(1, Some("alice"))));
    }

    #[test]
    fn test_like_matching() {
        assert!(like_matches("abc", "a_c", false));
        assert!(like_matches("abc", "%", false));
        assert!(like_matches("", "%", false));
        assert!(!like_matches("abc", "a_", false));
        assert!(like_matches("100%", "100\\%", false));
        assert!(!like_matches("1000", "100\\%", false));
        assert!(like_matches("a_b", &format!("%{}%", escape_like("_")), false));
        assert!(like_matches("ABC", "a%", true));
    }

    #[test]
    fn test_composition_flattens() {
        let person = person();
        let id = person.column("id").unwrap();

        let p = id.eq(1_i64) & id.eq(2_i64) & id.eq(3_i64);
        assert!(matches!(&p, Predicate::And(parts) if parts.len() == 3));

        let p = Predicate::Always & id.eq(1_i64);
        assert_eq!(p, id.eq(1_i64));

        let p = !!id.eq(1_i64);
        assert_eq!(p, id.eq(1_i64));

        assert_eq!(Predicate::all(vec![]), Predicate::Always);
        assert_eq!(Predicate::any(vec![]), Predicate::Never);
    }

    #[test]
    fn test_columns_and_values() {
        let person = person();
        let id = person.column("id").unwrap();
        let name = person.column("name").unwrap();

        let p = id.is_in([1_i64, 2]) | name.is_null();
        let names: Vec<&str> = p.columns().into_iter().map(Column::name).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(p.bound_values().len(), 2);
    }
}
