//! Top command - rank tickers by 24h USD turnover

use anyhow::{Context, Result};
use delta_ohlc::exchange::{fetch_tickers, DeltaClient};
use delta_ohlc::ranking::{top_by_turnover, TURNOVER_FIELD};
use delta_ohlc::Config;

pub fn run(config: Config, count: Option<usize>) -> Result<()> {
    let count = count.unwrap_or(config.top_n);
    let client = DeltaClient::new(&config).context("Failed to create HTTP client")?;

    let ranking = top_by_turnover(fetch_tickers(&client), count);

    if ranking.is_empty() {
        println!("\nNo tickers could be ranked by {}.", TURNOVER_FIELD);
        return Ok(());
    }

    println!("\n--- Top {} symbols by 24h turnover (USD) ---", ranking.len());
    print!("{}", ranking.render());

    Ok(())
}
