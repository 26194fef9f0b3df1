//! Binary entrypoint for the swca CLI.
//!
//! Commands:
//! - `start [--bind <addr>] [--port <n>]` - run the HTTP service
//! - `init` - write a starter `config.toml` and create the data directory
//! - `status` - open the account store and print a JSON summary
//! - `odds [--draws <n>] [--seed <s>]` - simulate draws and compare with configured rates
//!
//! See the library crate docs for module-level details: `swca::`.
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use swca::config::Config;
use swca::gacha::{Catalog, DrawEngine, Rarity};
use swca::logutil::init_logging;
use swca::storage::open_backend;

#[derive(Parser)]
#[command(name = "swca")]
#[command(about = "Backend for a gacha collection game")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Start {
        /// Bind address override
        #[arg(short, long)]
        bind: Option<String>,
        /// Port override
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Write a default configuration file
    Init,
    /// Summarize the account store
    Status,
    /// Simulate draws and report observed rarity rates
    Odds {
        #[arg(short, long, default_value_t = 100_000)]
        draws: u64,
        /// RNG seed for a reproducible run
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(None, cli.verbose);
            info!("Initializing new swca configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            let config = Config::default();
            tokio::fs::create_dir_all(&config.storage.data_dir)
                .await
                .with_context(|| format!("failed to create {}", config.storage.data_dir))?;
            info!("Data directory ready at {}", config.storage.data_dir);
        }
        Commands::Start { bind, port } => {
            let mut config = Config::load(&cli.config).await?;
            init_logging(Some(&config.logging), cli.verbose);
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            info!("Starting swca v{}", env!("CARGO_PKG_VERSION"));
            run_server(config).await?;
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            init_logging(Some(&config.logging), cli.verbose);
            print_status(&config)?;
        }
        Commands::Odds { draws, seed } => {
            // Works without a config file; the built-in catalog is used then.
            let config = Config::load(&cli.config).await.ok();
            init_logging(config.as_ref().map(|c| &c.logging), cli.verbose);
            let catalog = match config.as_ref().and_then(|c| c.catalog.path.as_ref()) {
                Some(path) => Catalog::load_from_json(path)?,
                None => Catalog::standard(),
            };
            print_odds(&catalog, draws, seed)?;
        }
    }

    Ok(())
}

#[cfg(feature = "http")]
async fn run_server(config: Config) -> Result<()> {
    use std::sync::Arc;
    use swca::gacha::GachaService;

    let service = tokio::task::spawn_blocking({
        let config = config.clone();
        move || GachaService::from_config(&config)
    })
    .await??;
    info!("Account store: {}", service.backend_description());
    swca::server::serve(Arc::new(service), &config.server).await
}

#[cfg(not(feature = "http"))]
async fn run_server(_config: Config) -> Result<()> {
    anyhow::bail!("the 'start' command requires the 'http' feature")
}

fn print_status(config: &Config) -> Result<()> {
    let backend = open_backend(&config.storage)?;
    let accounts = backend.load_all()?;
    let owned: usize = accounts.values().map(|a| a.backpack.len()).sum();
    let pulls: usize = accounts.values().map(|a| a.history.len()).sum();
    let discovered: usize = accounts.values().map(|a| a.index.len()).sum();
    let payload = serde_json::json!({
        "store": backend.describe(),
        "accounts": accounts.len(),
        "owned_units": owned,
        "pulls_recorded": pulls,
        "discovered_units": discovered,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_odds(catalog: &Catalog, draws: u64, seed: Option<u64>) -> Result<()> {
    let engine = DrawEngine::new(catalog);
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let mut counts: BTreeMap<Rarity, u64> = BTreeMap::new();
    let mut shiny = 0u64;
    for _ in 0..draws {
        let draw = engine.draw(&mut rng);
        *counts.entry(draw.rarity).or_insert(0) += 1;
        if draw.shiny {
            shiny += 1;
        }
    }
    let denom = draws.max(1) as f64;
    let rows: Vec<_> = engine
        .rates()
        .into_iter()
        .map(|(rarity, expected)| {
            let seen = counts.get(&rarity).copied().unwrap_or(0);
            serde_json::json!({
                "rarity": rarity,
                "expected": expected,
                "observed": seen as f64 / denom,
                "count": seen,
            })
        })
        .collect();
    let payload = serde_json::json!({
        "draws": draws,
        "rates": rows,
        "shiny_expected": catalog.shiny_chance,
        "shiny_observed": shiny as f64 / denom,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
