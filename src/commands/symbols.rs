//! Symbols command - list products available on the exchange

use anyhow::{Context, Result};
use delta_ohlc::exchange::{fetch_products, DeltaClient};
use delta_ohlc::Config;

pub fn run(config: Config, filter: Option<String>) -> Result<()> {
    let client = DeltaClient::new(&config).context("Failed to create HTTP client")?;

    let mut products = fetch_products(&client);
    if products.is_empty() {
        anyhow::bail!("Could not retrieve list of available symbols.");
    }

    if let Some(needle) = filter.as_deref().map(str::to_uppercase) {
        products.retain(|p| p.symbol.to_uppercase().contains(&needle));
    }
    products.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    println!("\n{} symbols", products.len());
    for product in &products {
        println!(
            "  {:<24} {:<20} {}",
            product.symbol,
            product.contract_type.as_deref().unwrap_or("-"),
            product.state.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
