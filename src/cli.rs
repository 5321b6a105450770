use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{
    api::router,
    eligibility::can_execute,
    matching::match_orders,
    orders::{Order, Side},
    state::AppState,
    utils::shutdown_token,
};

/// Operations desk for OTC-style order matching and settlement
#[derive(Parser)]
#[command(name = "otc-desk")]
#[command(
    version = "0.1",
    about = "Propose matches, check eligibility, settle orders"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admin HTTP API
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,

        /// Directory for the order/audit store
        #[arg(long, default_value = "desk-data")]
        data_dir: PathBuf,
    },

    /// Run one matching pass over order snapshots read from JSON files
    Match {
        /// JSON file with an array of buy orders
        #[arg(long)]
        buys: PathBuf,

        /// JSON file with an array of sell orders
        #[arg(long)]
        sells: PathBuf,
    },

    /// Check whether a single order may proceed to execution
    Check {
        /// JSON file with one order
        #[arg(long)]
        order: PathBuf,

        /// Available account balance
        #[arg(long)]
        balance: Decimal,
    },
}

fn read_orders(path: &Path) -> anyhow::Result<Vec<Order>> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing orders in {}", path.display()))
}

fn handle_match(buys_path: &Path, sells_path: &Path) -> anyhow::Result<()> {
    let buys = read_orders(buys_path)?;
    let sells = read_orders(sells_path)?;
    if let Some(stray) = buys.iter().find(|o| o.side != Side::Buy) {
        anyhow::bail!("order {} in the buy file is not a buy", stray.id);
    }
    if let Some(stray) = sells.iter().find(|o| o.side != Side::Sell) {
        anyhow::bail!("order {} in the sell file is not a sell", stray.id);
    }

    let candidates = match_orders(&buys, &sells);
    if candidates.is_empty() {
        println!("No candidates proposed.");
    } else {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    }
    Ok(())
}

fn handle_check(order_path: &Path, balance: Decimal) -> anyhow::Result<()> {
    let raw = fs::read(order_path).with_context(|| format!("reading {}", order_path.display()))?;
    let order: Order = serde_json::from_slice(&raw)?;
    let verdict = can_execute(&order, balance);
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

async fn serve(addr: &str, data_dir: &Path) -> anyhow::Result<()> {
    let state = AppState::new(data_dir)?;
    let app = router(state);
    let token = shutdown_token();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, data_dir = %data_dir.display(), "desk API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;
    Ok(())
}

pub async fn run_cli() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { addr, data_dir } => serve(&addr, &data_dir).await,
        Commands::Match { buys, sells } => handle_match(&buys, &sells),
        Commands::Check { order, balance } => handle_check(&order, balance),
    }
}
