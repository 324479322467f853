//! Sienge supply contracts relay entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contracts_relay::api::{create_router, AppState};
use contracts_relay::config::Config;
use contracts_relay::contracts::valuation::TOTAL_FIELD;
use contracts_relay::contracts::{coerce_amount, ContractAggregator};
use contracts_relay::metrics;
use contracts_relay::sienge::SiengeClient;
use contracts_relay::utils::shutdown_signal;

/// Sienge supply contracts relay.
#[derive(Parser, Debug)]
#[command(name = "contracts-relay")]
#[command(about = "Aggregates paginated Sienge supply contracts into one JSON endpoint")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the contracts API and static files (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Static file directory (overrides STATIC_DIR).
        #[arg(long)]
        static_dir: Option<String>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Aggregate contracts once and print them as JSON.
    Fetch {
        /// Print a one-line summary instead of the full JSON.
        #[arg(long)]
        summary: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("contracts_relay=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match args.command {
        Some(Command::Serve { port, static_dir }) => cmd_serve(port.or(args.port), static_dir).await,
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Fetch { summary }) => cmd_fetch(summary).await,
        None => cmd_serve(args.port, None).await,
    }
}

/// Load and validate configuration, logging failures.
fn load_config() -> anyhow::Result<Config> {
    match Config::from_env() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CONTRACTS RELAY - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    let config = match config.checked() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    };

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  User: {}", config.sienge_user);
    println!("  Contracts URL: {}", config.sienge_api_url);
    println!(
        "  Measurements URL: {}",
        config.sienge_measurements_url.as_deref().unwrap_or("(disabled)")
    );
    println!(
        "  Date Range: {} .. {}",
        config.contract_start_date, config.contract_end_date
    );
    println!("  Page Limit: {}", config.page_limit);
    println!("  Max Pages: {}", config.max_pages);
    println!("  HTTP Timeout: {}ms", config.http_timeout_ms);
    println!("  Port: {}", config.port);
    println!("  Static Dir: {}", config.static_dir);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Serve the contracts API.
async fn cmd_serve(port_override: Option<u16>, static_dir_override: Option<String>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = load_config()?;

    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }
    if let Some(dir) = static_dir_override {
        config.static_dir = dir;
    }

    info!("Configuration loaded successfully");
    info!("Contracts URL: {}", config.sienge_api_url);
    info!(
        "Date range: {} .. {}",
        config.contract_start_date, config.contract_end_date
    );
    info!(
        "Measurements: {}",
        if config.measurements_enabled() { "enabled" } else { "disabled" }
    );

    let client = SiengeClient::new(&config)?;
    let aggregator = ContractAggregator::from_config(client, &config).map_err(|e| anyhow::anyhow!(e))?;
    let mut state = AppState::new(aggregator);

    if config.metrics_enabled {
        match metrics::install_prometheus() {
            Ok(handle) => {
                metrics::init_metrics();
                state = state.with_metrics(handle);
            }
            Err(e) => warn!("Metrics disabled, failed to install recorder: {}", e),
        }
    }

    if !std::path::Path::new(&config.static_dir).is_dir() {
        warn!("Static directory {} does not exist", config.static_dir);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", addr);

    let router = create_router(state, &config.static_dir);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Aggregate contracts once.
async fn cmd_fetch(summary: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = SiengeClient::new(&config)?;
    let aggregator = ContractAggregator::from_config(client, &config).map_err(|e| anyhow::anyhow!(e))?;

    let contracts = aggregator.fetch_configured().await?;

    if summary {
        let total: f64 = contracts
            .iter()
            .filter_map(|c| coerce_amount(c.get(TOTAL_FIELD)))
            .sum();
        println!("Contracts: {}", contracts.len());
        println!("Total value: {:.2}", total);
    } else {
        println!("{}", serde_json::to_string_pretty(&contracts)?);
    }

    Ok(())
}
