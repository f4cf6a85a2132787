//! # ShopDesk: e-commerce assistant backend
//!
//! Usage:
//!   shopdesk serve                         # HTTP gateway (default port 3000)
//!   shopdesk serve --port 8080             # Custom port
//!   shopdesk ingest ./docs/returns.md      # Index a policy document
//!   shopdesk ask "Where is ORD-2024-001?"  # One chat turn
//!   shopdesk check-return ORD-2024-001 "Arrived damaged"
//!   shopdesk init-config                   # Write ~/.shopdesk/config.toml

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shopdesk_agent::ShopAssistant;
use shopdesk_core::ShopDeskConfig;
use shopdesk_core::config::expand_path;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shopdesk", version, about = "🛍️ ShopDesk: retrieval-augmented e-commerce assistant")]
struct Cli {
    /// Config file (default: $SHOPDESK_CONFIG or ~/.shopdesk/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Override gateway.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ingest a document into the policy index
    Ingest { path: PathBuf },
    /// Ask the assistant one question
    Ask { message: String },
    /// Evaluate return eligibility for an order without filing a return
    CheckReturn { order_id: String, reason: String },
    /// Write a default config file
    InitConfig,
}

fn config_path(cli: &Cli) -> PathBuf {
    match &cli.config {
        Some(p) => expand_path(p),
        None => std::env::var("SHOPDESK_CONFIG")
            .map(|p| expand_path(&p))
            .unwrap_or_else(|_| ShopDeskConfig::default_path()),
    }
}

fn load_config(cli: &Cli) -> Result<ShopDeskConfig> {
    let path = config_path(cli);
    let config = if path.exists() {
        ShopDeskConfig::load_from(&path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        ShopDeskConfig::default()
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "shopdesk=debug,shopdesk_core=debug,shopdesk_providers=debug,shopdesk_search=debug,shopdesk_knowledge=debug,shopdesk_db=debug,shopdesk_agent=debug,shopdesk_gateway=debug,tower_http=debug"
    } else {
        "shopdesk=info,shopdesk_core=info,shopdesk_providers=info,shopdesk_search=info,shopdesk_knowledge=info,shopdesk_db=info,shopdesk_agent=info,shopdesk_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match &cli.command {
        Command::InitConfig => {
            let path = config_path(&cli);
            if path.exists() {
                println!("⚠️  Config already exists: {}", path.display());
                return Ok(());
            }
            ShopDeskConfig::default().save_to(&path)?;
            println!("✅ Wrote default config to {}", path.display());
        }
        Command::Serve { port } => {
            let mut config = load_config(&cli)?;
            if let Some(port) = port {
                config.gateway.port = *port;
            }
            shopdesk_gateway::start(&config).await?;
        }
        Command::Ingest { path } => {
            let assistant = ShopAssistant::from_config(&load_config(&cli)?)?;
            let report = assistant.ingest.ingest_path(path).await?;
            println!("{}", report.message());
            if let Some(warning) = &report.warning {
                println!("⚠️  {warning}");
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Ask { message } => {
            let assistant = ShopAssistant::from_config(&load_config(&cli)?)?;
            let reply = assistant.chat.handle(message).await?;
            println!("{}", reply.response);
        }
        Command::CheckReturn { order_id, reason } => {
            let assistant = ShopAssistant::from_config(&load_config(&cli)?)?;
            let order = assistant.orders.get_order(order_id).await?;
            let decision = assistant.returns.evaluator().evaluate(&order, reason).await;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
    }
    Ok(())
}
