mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use harvest::{HttpLauncher, LogFileSink, Pipeline, RunContext, RunOptions};
use schemars::schema_for;
use senate_core::{SqliteStore, VoteStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "senate-votes")]
#[command(about = "U.S. Senate roll-call vote scraper", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(long, global = true, env = "SENATE_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest new vote summaries and every vote's member tallies
    Scrape {
        /// Verbose progress, also written to the log file
        #[arg(long)]
        debug: bool,
        /// Delete all stored summaries and tallies before harvesting
        #[arg(long)]
        clear_db: bool,
    },
    /// Print stored vote summaries as JSON lines
    Summaries {
        /// Only summaries of this session (its dropdown value)
        #[arg(long)]
        url: Option<String>,
    },
    /// Print a member's stored tallies as JSON lines
    Tallies {
        /// Full name, e.g. "Jane Doe"
        #[arg(long)]
        name: String,
    },
    /// Delete all stored summaries and tallies
    Clear,
    /// Export JSON Schemas for the stored record types
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for VoteSummary and Tally
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let debug = matches!(cli.command, Commands::Scrape { debug: true, .. });
    init_tracing(debug);

    let config = AppConfig::load(cli.config.as_deref())?.with_database(cli.db);

    match cli.command {
        Commands::Scrape { debug, clear_db } => scrape(config, debug, clear_db).await,
        Commands::Summaries { url } => summaries(&config, url).await,
        Commands::Tallies { name } => tallies(&config, &name).await,
        Commands::Clear => clear(&config).await,
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(path: &Path) -> Result<SqliteStore> {
    SqliteStore::open(path).with_context(|| format!("opening database {}", path.display()))
}

async fn scrape(config: AppConfig, debug: bool, clear_db: bool) -> Result<()> {
    let store = open_store(&config.database)?;
    let launcher = HttpLauncher::from_config(&config.harvest);

    let mut ctx = RunContext::new(config.harvest);
    if debug {
        let sink = LogFileSink::create(&config.log_file)
            .with_context(|| format!("creating log file {}", config.log_file.display()))?;
        ctx = ctx.with_progress(Arc::new(sink));
    }

    let report = Pipeline::new(&ctx, &store)
        .run(&launcher, RunOptions { clear_db })
        .await?;

    println!("{report}");
    for failed in &report.failed_votes {
        match &failed.screenshot {
            Some(path) => println!("  skipped {}: {} ({})", failed.vote, failed.reason, path.display()),
            None => println!("  skipped {}: {}", failed.vote, failed.reason),
        }
    }
    Ok(())
}

async fn summaries(config: &AppConfig, url: Option<String>) -> Result<()> {
    let store = open_store(&config.database)?;
    let records = match url {
        Some(url) => store.find_summaries_by_url(&url).await?,
        None => store.find_all_summaries().await?,
    };
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

async fn tallies(config: &AppConfig, name: &str) -> Result<()> {
    let store = open_store(&config.database)?;
    for record in store.find_tallies_by_name(name).await? {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

async fn clear(config: &AppConfig) -> Result<()> {
    let store = open_store(&config.database)?;
    store.clear().await?;
    println!("Cleared {}", config.database.display());
    Ok(())
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    let summary_schema = schema_for!(senate_core::VoteSummary);
    let summary_json = serde_json::to_string_pretty(&summary_schema)?;
    fs::write(out_dir.join("VoteSummary.schema.json"), summary_json)?;

    let tally_schema = schema_for!(senate_core::Tally);
    let tally_json = serde_json::to_string_pretty(&tally_schema)?;
    fs::write(out_dir.join("Tally.schema.json"), tally_json)?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
