//! Run one wallet through the whole pipeline and print what came out.
//!
//! usage: fetch_wallet <address> [start_block]

use std::sync::Arc;

use alpha_tracker::{blocks::utc_midnight, config, explorer::ExplorerClient, tracker::Tracker, validation};
use anyhow::{anyhow, Context};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let address = args
        .next()
        .ok_or_else(|| anyhow!("usage: fetch_wallet <address> [start_block]"))?;
    let address = validation::validate_wallet_address(&address)?;

    let cfg = config::load().map_err(|e| anyhow!("config: {}", e))?;
    let explorer = Arc::new(ExplorerClient::new(&cfg).map_err(|e| anyhow!("explorer: {}", e))?);

    let start_block = match args.next() {
        Some(b) => validation::validate_block_number(&b)?,
        None => {
            let (day, midnight) = utc_midnight(chrono::Utc::now());
            let block = explorer
                .block_by_time(midnight)
                .await
                .context("looking up today's starting block")?;
            println!("Starting block for {}: {}", day, block);
            block.to_string()
        }
    };

    let tracker = Tracker::new(cfg, explorer).map_err(|e| anyhow!("tracker: {}", e))?;
    println!("Fetching {} from block {}...", address, start_block);
    let resp = tracker.calculate(&address, &start_block).await?;

    println!("Records: {}", resp.transactions.len());
    for rec in resp.transactions.iter().take(10) {
        println!(
            "  {} | {} {} {} -> {} {} | gas {:?} | {:?}",
            rec.hash, rec.timestamp, rec.from.value, rec.from.symbol, rec.to.value, rec.to.symbol, rec.gas, rec.status
        );
    }
    if !resp.skipped.is_empty() {
        println!("Skipped {} hashes:", resp.skipped.len());
        for s in &resp.skipped {
            println!("  {}: {}", s.hash, s.reason);
        }
    }

    println!("Volume: ${:.2}", resp.volume);
    println!(
        "Points: {} (next at ${}, {:.1}% of the way)",
        resp.points.points, resp.points.next_threshold, resp.points.progress_percent
    );
    for symbol in &resp.portfolio.ranking {
        if let Some(a) = resp.portfolio.assets.get(symbol) {
            println!("  {:>10} in {:.4} out {:.4} profit ${:.2}", symbol, a.incoming, a.outgoing, a.profit);
        }
    }
    println!("Gas: ${:.4}", resp.gas_fee_usd);
    println!("Net profit: ${:.2}", resp.net_profit_usd);
    if !resp.unresolved_symbols.is_empty() {
        println!("No price for: {:?}", resp.unresolved_symbols);
    }

    Ok(())
}
