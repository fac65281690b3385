//! CLI smoke entry point.
//!
//! # Responsibility
//! - Boot a repository bundle from an optional TOML config.
//! - Run one unit of work through the sample note repository.

mod notes;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use notes::{NoteError, NoteRepository, NoteRepositoryFacade};
use repokit_core::{core_version, CoreConfig, LoggingInterceptor, RepositoryBundle};
use std::path::PathBuf;

/// Runs a sample note repository inside a managed unit of work.
#[derive(Parser, Debug)]
#[command(name = "repokit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML file with `[database]` and `[logging]` sections
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Overrides `logging.level`
    #[arg(long)]
    log_level: Option<String>,

    /// Body of the note to insert
    #[arg(long, default_value = "hello from repokit")]
    note: String,
}

fn load_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CoreConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let context = RepositoryBundle::sqlite()
        .with_logging()
        .interceptor(LoggingInterceptor)
        .repository::<NoteRepositoryFacade>()
        .start(&config)
        .context("starting repository bundle")?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );

    if let Some(report) = context.report() {
        println!("{report}");
    }

    let notes = context.repository::<dyn NoteRepository>()?;
    let (note, total) = context
        .units()
        .in_unit(|| -> Result<_, NoteError> {
            notes.create_schema()?;
            let created = notes.insert(&cli.note)?;
            let found = notes.find_by_id(created.id)?;
            Ok((found, notes.count()?))
        })
        .context("running note unit of work")?;

    println!("note id={} body={:?} total={}", note.id, note.body, total);
    Ok(())
}
