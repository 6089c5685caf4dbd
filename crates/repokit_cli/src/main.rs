//! Command-line browser for the demo author catalog.
//!
//! Prints one page of shaped authors, plus paging metadata, as JSON.

mod demo;

use anyhow::Context;
use clap::Parser;
use demo::{Author, AuthorDto, GenreCount};
use log::info;
use repokit_core::{
    default_log_level, init_logging_from, open_db, open_db_in_memory, CoreConfig, DataContext,
    ResourceRequest, ResourceService, SqliteRepository,
};
use std::path::PathBuf;

/// repokit - browse a sorted, paged and shaped author catalog
#[derive(Parser, Debug)]
#[command(name = "repokit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database file; in-memory when omitted
    #[arg(long)]
    db: Option<PathBuf>,

    /// Sort clauses, e.g. "Genre, Age desc"
    #[arg(long, default_value = "")]
    order_by: String,

    /// Fields to keep, e.g. "Name,Genre"
    #[arg(long, default_value = "")]
    fields: String,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = repokit_core::service::DEFAULT_PAGE_SIZE)]
    size: u32,

    /// Include soft-deleted authors
    #[arg(long)]
    show_deleted: bool,

    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for log files; logging stays off when omitted
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> CoreConfig {
        CoreConfig {
            log_level: self
                .log_level
                .clone()
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: self.log_dir.clone(),
            database_path: self.db.clone(),
            default_schema: Some(demo::SCHEMA.to_string()),
        }
    }

    fn request(&self) -> ResourceRequest {
        ResourceRequest {
            page_number: self.page,
            page_size: self.size,
            order_by: self.order_by.clone(),
            fields: self.fields.clone(),
            show_deleted: self.show_deleted,
            ..ResourceRequest::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.config();
    init_logging_from(&config).context("failed to start logging")?;

    let conn = match &config.database_path {
        Some(path) => open_db(path, demo::MIGRATIONS)
            .with_context(|| format!("failed to open `{}`", path.display()))?,
        None => open_db_in_memory(demo::MIGRATIONS).context("failed to open in-memory db")?,
    };
    let ctx = DataContext::new(conn)
        .with_procedures(demo::procedures())
        .with_config(&config);
    let seeded = demo::seed_if_empty(&ctx).context("failed to seed demo authors")?;
    info!("event=cli_seed module=cli status=ok rows={seeded}");

    let mappers = demo::mapper_service()?;
    let repo = SqliteRepository::<Author>::try_new(&ctx)?;
    let service = ResourceService::<Author, AuthorDto, _>::new(repo, &mappers);
    let page = service.list(&cli.request())?;

    let genres: Vec<GenreCount> = ctx
        .stored_procedure("genre_counts", true)?
        .with_parameter("show_deleted", cli.show_deleted)
        .call()?;
    let genres = genres
        .iter()
        .map(|row| serde_json::json!({ "genre": row.genre, "authors": row.authors }))
        .collect::<Vec<_>>();

    let output = serde_json::json!({
        "pagination": page.metadata(),
        "items": page.items(),
        "genres": genres,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
