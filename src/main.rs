//! CLI entry point for payroll_search
//!
//! Provides command-line interface for:
//! - Serving the preview and download HTTP endpoints
//! - Printing the metadata index query a filter would run
//!
//! # Usage
//!
//! Start the server:
//! ```bash
//! payroll_search serve --config config/payroll_search.toml
//! ```
//!
//! Inspect a filter:
//! ```bash
//! payroll_search explain --anos 2020,2021 --orgaos tjal --categorias base
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use payroll_search::blob::{BatchRetriever, ObjectBlobStore};
use payroll_search::config::{SearchConfig, DEFAULT_CONFIG_PATH};
use payroll_search::index::PostgresIndex;
use payroll_search::logging;
use payroll_search::search::{build_query, parse_filter, SearchPipeline};
use payroll_search::server;

#[derive(Parser)]
#[command(name = "payroll_search")]
#[command(about = "Search and bulk download over archived payroll data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Override `server.listen_addr`
        #[arg(long)]
        listen: Option<String>,
    },

    /// Print the SQL and bind arguments for a filter
    Explain {
        /// Comma-separated years
        #[arg(long, default_value = "")]
        anos: String,

        /// Comma-separated months
        #[arg(long, default_value = "")]
        meses: String,

        /// Comma-separated agency identifiers
        #[arg(long, default_value = "")]
        orgaos: String,

        /// Category (base, outras, descontos)
        #[arg(long, default_value = "")]
        categorias: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => serve(config, listen).await,
        Commands::Explain {
            anos,
            meses,
            orgaos,
            categorias,
        } => explain(&anos, &meses, &orgaos, &categorias),
    }
}

async fn serve(path: PathBuf, listen: Option<String>) -> Result<()> {
    let mut config = SearchConfig::load_from(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    if let Some(addr) = listen {
        config.server.listen_addr = addr;
    }
    config.validate().map_err(anyhow::Error::msg)?;
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    if config.database.url.is_empty() {
        bail!("database.url must be set (or PAYROLL_SEARCH_DATABASE__URL)");
    }

    tracing::info!(
        name = %config.application.name,
        search_limit = config.limits.search_limit,
        download_limit = config.limits.download_limit,
        "starting payroll search"
    );

    let index = PostgresIndex::connect(&config.database)
        .await
        .context("failed to connect to the metadata index")?;
    let store = ObjectBlobStore::from_config(&config.storage)
        .context("failed to build the blob store client")?;
    let retriever = BatchRetriever::new(
        Arc::new(store),
        config.storage.bucket.clone(),
        config.retrieval(),
    );
    let pipeline = SearchPipeline::new(Arc::new(index), retriever, config.limits());

    server::serve(&config.server, pipeline, server::shutdown_signal()).await?;
    Ok(())
}

fn explain(anos: &str, meses: &str, orgaos: &str, categorias: &str) -> Result<()> {
    let filter = parse_filter(anos, meses, orgaos, categorias, "")?;
    let query = build_query(filter.as_ref());
    println!("{}", query.sql);
    println!("{}", serde_json::to_string(&query.args)?);
    Ok(())
}
