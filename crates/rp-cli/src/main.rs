//! rp-query
//!
//! Runs one predicate query against a PostgreSQL table and prints each row as
//! a JSON object line.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures::TryStreamExt;
use tracing::info;

use rp_core::{telemetry::init_tracing, AppConfig};
use rp_db::{Database, ReactivePredicateExecutor, RepositoryFactory};
use rp_queries::{FilterSet, Predicate, Projection, QueryBuilder, Sort};

mod args;
mod output;

use args::Cli;
use output::record_to_json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging).context("Failed to install tracing subscriber")?;

    let relation = Arc::new(cli.relation());
    let predicate = match &cli.filters {
        Some(json) => FilterSet::from_json(json)?.to_predicate(&relation)?,
        None => Predicate::Always,
    };
    let sort = match &cli.sort {
        Some(sort) => Sort::parse(sort).map_err(anyhow::Error::msg)?,
        None => Sort::unsorted(),
    };

    if cli.explain {
        let mut query = QueryBuilder::from(Arc::clone(&relation))
            .filter(predicate)
            .sort(&sort);
        if let Some(limit) = cli.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = cli.offset {
            query = query.offset(offset);
        }
        let statement = query.build()?.to_statement();
        println!("{}", statement.sql);
        for (index, param) in statement.params.iter().enumerate() {
            println!("  ${} = {}", index + 1, param);
        }
        return Ok(());
    }

    let db = Database::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let factory = RepositoryFactory::postgres(&db, &config.database);
    let projection = Projection::records(relation.columns().to_vec());
    let executor = factory.executor(Arc::clone(&relation), projection);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        table = relation.table(),
        filtered = predicate != Predicate::Always,
        "Running query"
    );

    let mut printed = 0usize;
    if cli.one {
        if let Some(record) = executor.find_one(&predicate).await? {
            println!("{}", record_to_json(&record));
            printed = 1;
        }
    } else {
        let mut rows = if cli.is_paged() {
            executor.find_page(&predicate, &sort, cli.pagination())?
        } else {
            executor.find_all_sorted(&predicate, &sort)?
        };
        while let Some(record) = rows.try_next().await? {
            println!("{}", record_to_json(&record));
            printed += 1;
        }
    }

    info!(rows = printed, "Query finished");
    db.close().await;
    Ok(())
}
