//! CLI argument definitions using clap

use clap::Parser;
use rp_db::Pagination;
use rp_queries::{ColumnType, RelationDescriptor};

/// Run a predicate query against one table and print the rows as JSON lines
#[derive(Parser, Debug)]
#[command(name = "rp-query")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Table to query
    #[arg(long)]
    pub table: String,

    /// Schema the table lives in
    #[arg(long)]
    pub schema: Option<String>,

    /// Column as name:type, repeatable, in select order
    #[arg(long = "column", short = 'c', required = true, value_parser = parse_column)]
    pub columns: Vec<(String, ColumnType)>,

    /// Primary key columns
    #[arg(long, value_delimiter = ',')]
    pub primary_key: Vec<String>,

    /// Filters in JSON, e.g. [{"name":{"operator":"~","values":["a"]}}]
    #[arg(long)]
    pub filters: Option<String>,

    /// Sort as prop[:asc|desc],...
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long)]
    pub limit: Option<i64>,

    #[arg(long)]
    pub offset: Option<i64>,

    /// Expect at most one row
    #[arg(long, conflicts_with_all = ["sort", "limit", "offset"])]
    pub one: bool,

    /// Print the SQL instead of running it
    #[arg(long)]
    pub explain: bool,
}

impl Cli {
    /// Describe the queried table from the arguments
    pub fn relation(&self) -> RelationDescriptor {
        let mut relation = RelationDescriptor::new(self.table.clone());
        if let Some(schema) = &self.schema {
            relation = relation.with_schema(schema.clone());
        }
        for (name, column_type) in &self.columns {
            relation = relation.with_column(name.clone(), *column_type);
        }
        relation.with_primary_key(self.primary_key.iter().cloned())
    }

    /// Whether rows are windowed
    pub fn is_paged(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// Window from `--limit` and `--offset`; no limit when `--limit` is absent
    pub fn pagination(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset.unwrap_or(0),
        }
    }
}

fn parse_column(s: &str) -> Result<(String, ColumnType), String> {
    let (name, column_type) = s
        .split_once(':')
        .ok_or_else(|| format!("expected name:type, got '{}'", s))?;
    let column_type = ColumnType::from_str(column_type)
        .ok_or_else(|| format!("unknown column type '{}'", column_type))?;
    if name.is_empty() {
        return Err("column name is empty".to_string());
    }
    Ok((name.to_string(), column_type))
}
