//! Relation descriptors and columns
//!
//! A [`RelationDescriptor`] is the schema metadata of one table or view: its
//! columns, their SQL types and the primary key. Descriptors are immutable once
//! built and shared by every query issued against them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::value::Value;

/// SQL type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Text,
    Uuid,
    Date,
    Timestamp,
}

impl ColumnType {
    /// Parse from a SQL type name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bool" | "boolean" => Some(Self::Bool),
            "smallint" | "int2" => Some(Self::SmallInt),
            "integer" | "int" | "int4" => Some(Self::Integer),
            "bigint" | "int8" => Some(Self::BigInt),
            "real" | "float4" => Some(Self::Real),
            "double" | "double precision" | "float8" => Some(Self::Double),
            "text" | "varchar" | "string" => Some(Self::Text),
            "uuid" => Some(Self::Uuid),
            "date" => Some(Self::Date),
            // decoded as DateTime<Utc>, which sqlx only reads from timestamptz
            "timestamptz" | "timestamp with time zone" => Some(Self::Timestamp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Real => "real",
            Self::Double => "double precision",
            Self::Text => "text",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::Timestamp => "timestamptz",
        }
    }

    /// Whether a value may be compared against or stored in this column
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::SmallInt | Self::Integer | Self::BigInt, Value::Int(_)) => true,
            (Self::Real | Self::Double, Value::Int(_) | Value::Float(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Uuid, Value::Uuid(_)) => true,
            (Self::Date, Value::Date(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            _ => false,
        }
    }

    /// Parse a textual literal into a value of this type
    pub fn parse_value(&self, raw: &str) -> Result<Value, String> {
        let raw = raw.trim();
        let parsed = match self {
            Self::Bool => match raw.to_lowercase().as_str() {
                "t" | "true" | "1" => Some(Value::Bool(true)),
                "f" | "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Self::SmallInt | Self::Integer | Self::BigInt => raw.parse::<i64>().ok().map(Value::Int),
            Self::Real | Self::Double => raw.parse::<f64>().ok().map(Value::Float),
            Self::Text => Some(Value::Text(raw.to_string())),
            Self::Uuid => Uuid::parse_str(raw).ok().map(Value::Uuid),
            Self::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Value::Date),
            Self::Timestamp => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc))),
        };
        parsed.ok_or_else(|| format!("'{}' is not a valid {}", raw, self.as_str()))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of a relation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    relation: String,
    name: String,
    property: String,
    column_type: ColumnType,
}

impl Column {
    /// Create a column whose property name equals its column name
    pub fn new(relation: impl Into<String>, name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            relation: relation.into(),
            property: name.clone(),
            name,
            column_type,
        }
    }

    /// Override the property name used by [`crate::sorts::Sort`]
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    /// Name of the relation this column belongs to
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// SQL column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property (field) name
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// `"relation"."column"`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", quote_ident(&self.relation), quote_ident(&self.name))
    }
}

/// Schema metadata of a table or view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    schema: Option<String>,
    table: String,
    columns: Vec<Column>,
    primary_key: Vec<String>,
}

impl RelationDescriptor {
    /// Start describing a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns: vec![],
            primary_key: vec![],
        }
    }

    /// Set the schema the table lives in
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a column
    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        let column = Column::new(self.table.clone(), name, column_type);
        self.columns.push(column);
        self
    }

    /// Add a column whose property name differs from its column name
    pub fn with_property_column(
        mut self,
        name: impl Into<String>,
        property: impl Into<String>,
        column_type: ColumnType,
    ) -> Self {
        let column = Column::new(self.table.clone(), name, column_type).with_property(property);
        self.columns.push(column);
        self
    }

    /// Declare the primary key columns
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by SQL name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column by property name, falling back to the SQL name
    pub fn by_property(&self, property: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.property == property)
            .or_else(|| self.column(property))
    }

    /// Primary key columns, in declaration order
    pub fn primary_key(&self) -> Vec<&Column> {
        self.primary_key
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    /// Whether `column` is one of this relation's columns
    pub fn contains(&self, column: &Column) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// `"schema"."table"` or `"table"`
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.table)),
            None => quote_ident(&self.table),
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> RelationDescriptor {
        RelationDescriptor::new("person")
            .with_schema("public")
            .with_column("id", ColumnType::BigInt)
            .with_column("name", ColumnType::Text)
            .with_property_column("person_id", "personId", ColumnType::BigInt)
            .with_primary_key(["id"])
    }

    #[test]
    fn test_column_lookup() {
        let relation = person();
        assert_eq!(relation.columns().len(), 3);
        assert_eq!(relation.column("name").map(Column::name), Some("name"));
        assert!(relation.column("missing").is_none());
        assert_eq!(
            relation.by_property("personId").map(Column::name),
            Some("person_id")
        );
        assert_eq!(relation.by_property("person_id").map(Column::name), Some("person_id"));
    }

    #[test]
    fn test_primary_key() {
        let relation = person();
        let pk: Vec<&str> = relation.primary_key().into_iter().map(Column::name).collect();
        assert_eq!(pk, vec!["id"]);
    }

    #[test]
    fn test_contains_checks_relation_and_type() {
        let relation = person();
        assert!(relation.contains(&Column::new("person", "id", ColumnType::BigInt)));
        assert!(!relation.contains(&Column::new("settings", "id", ColumnType::BigInt)));
        assert!(!relation.contains(&Column::new("person", "id", ColumnType::Text)));
    }

    #[test]
    fn test_qualified_names() {
        let relation = person();
        assert_eq!(relation.qualified_name(), "\"public\".\"person\"");
        assert_eq!(
            relation.column("name").unwrap().qualified_name(),
            "\"person\".\"name\""
        );
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_column_type_accepts() {
        assert!(ColumnType::BigInt.accepts(&Value::Int(1)));
        assert!(ColumnType::Double.accepts(&Value::Int(1)));
        assert!(ColumnType::Text.accepts(&Value::Null));
        assert!(!ColumnType::BigInt.accepts(&Value::Float(1.5)));
        assert!(!ColumnType::Text.accepts(&Value::Int(1)));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(ColumnType::BigInt.parse_value("42"), Ok(Value::Int(42)));
        assert_eq!(ColumnType::Bool.parse_value("t"), Ok(Value::Bool(true)));
        assert_eq!(
            ColumnType::Date.parse_value("2024-02-29"),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert!(ColumnType::Integer.parse_value("abc").is_err());
        assert_eq!(ColumnType::from_str("INT8"), Some(ColumnType::BigInt));
        assert_eq!(ColumnType::from_str("blob"), None);
    }

    #[test]
    fn test_timestamp_aliases() {
        assert_eq!(ColumnType::from_str("timestamptz"), Some(ColumnType::Timestamp));
        assert_eq!(
            ColumnType::from_str("timestamp with time zone"),
            Some(ColumnType::Timestamp)
        );
        assert_eq!(ColumnType::from_str("timestamp"), None);
        assert_eq!(ColumnType::Timestamp.as_str(), "timestamptz");
    }
}
