//! Fetch command - interactive OHLC download to CSV

use anyhow::{Context, Result};
use chrono::Utc;
use delta_ohlc::data::{
    fetch_history_with, output_filename, parse_resolution, save_and_report, HistoryRequest,
    OhlcTable, PaginationSettings, StopReason,
};
use delta_ohlc::exchange::{available_symbols, DeltaClient};
use delta_ohlc::prompt::{self, DateRange};
use delta_ohlc::types::OhlcBar;
use delta_ohlc::Config;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Rows shown at each end of the table in the summary
const PREVIEW_ROWS: usize = 5;

/// Values supplied on the command line instead of the prompts
#[derive(Debug, Default)]
pub struct FetchArgs {
    pub symbol: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub resolution: Option<String>,
    pub output_dir: Option<PathBuf>,
    /// Debug logs go to the console, so no spinner
    pub verbose: bool,
}

pub fn run(config: Config, args: FetchArgs) -> Result<()> {
    println!("\n--- Delta Exchange OHLC Data Fetcher ---");

    let client = DeltaClient::new(&config).context("Failed to create HTTP client")?;

    let symbols = available_symbols(&client)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let symbol = match args.symbol {
        Some(s) => prompt::validate_symbol(&s, &symbols)?,
        None => prompt::prompt_symbol(&mut input, &mut output, &symbols)?,
    };

    let resolution = parse_resolution(args.resolution.as_deref().unwrap_or(&config.resolution))?;

    let now = Utc::now();
    let range: DateRange = match (args.start_year, args.end_year) {
        (Some(start), Some(end)) => {
            let range = prompt::validate_year_range(start, end, now)?;
            prompt::report_range(&mut output, &range)?;
            range
        }
        _ => prompt::prompt_date_range(&mut input, &mut output, now)?,
    };

    println!(
        "\n--- Preparing to fetch OHLC data for {} ({}) ---",
        symbol, resolution
    );
    println!(
        "  Requested range: {} to {}",
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d")
    );

    let request = HistoryRequest {
        symbol: symbol.clone(),
        resolution: resolution.clone(),
        start: range.start,
        end: range.end,
    };

    let pb = if args.verbose {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message("requesting first page");
        pb
    };

    let run = fetch_history_with(&client, &request, PaginationSettings::from(&config), |p| {
        let from = chrono::DateTime::from_timestamp(p.cursor, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        pb.set_message(format!(
            "page {} from {}: {} candles ({} total)",
            p.page, from, p.page_len, p.total
        ));
    });
    pb.finish_and_clear();

    // Reported once the spinner is gone so the two never share a line
    match &run.stop {
        StopReason::Failed(e) => warn!(
            "Pagination stopped on an error after {} requests, keeping {} candles: {}",
            run.requests,
            run.candles.len(),
            e
        ),
        StopReason::NoProgress => warn!(
            "Pagination stopped after {} requests: the API did not advance past the cursor",
            run.requests
        ),
        _ => {}
    }

    println!("  Requests made: {} ({})", run.requests, run.stop);
    if run.failed() {
        println!("  Note: fetching stopped on an error, the data below may be incomplete.");
    }

    let table = OhlcTable::assemble(run.candles, range.start, range.end);

    if table.is_empty() {
        print_no_data_help(&symbol, &range);
        return Ok(());
    }

    print_summary(&symbol, &resolution, &table);

    let output_dir = args.output_dir.unwrap_or(config.output_dir);
    let path = output_dir.join(output_filename(&symbol, &resolution, range.start, range.end));

    // A failed save is reported but does not fail the run
    save_and_report(&table, &path, &mut output)?;

    Ok(())
}

fn print_summary(symbol: &str, resolution: &str, table: &OhlcTable) {
    println!(
        "\n--- Retrieved OHLC Data for {} ({}) ---",
        symbol, resolution
    );
    println!("Total candles fetched: {}", table.len());

    println!("\nOHLC data (first {} rows):", PREVIEW_ROWS);
    print_bars(table.head(PREVIEW_ROWS));
    println!("\nOHLC data (last {} rows):", PREVIEW_ROWS);
    print_bars(table.tail(PREVIEW_ROWS));

    if let (Some(first), Some(last)) = (table.first(), table.last()) {
        println!("\nActual data starts: {}", first.time);
        println!("Actual data ends:   {}", last.time);
    }
}

fn print_bars(bars: &[OhlcBar]) {
    let mut out = io::stdout().lock();
    let _ = writeln!(
        out,
        "{:<25} {:>14} {:>14} {:>14} {:>14} {:>16}",
        "time", "open", "high", "low", "close", "volume"
    );
    for bar in bars {
        let _ = writeln!(
            out,
            "{:<25} {:>14} {:>14} {:>14} {:>14} {:>16}",
            bar.time.format("%Y-%m-%d %H:%M:%S%:z"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        );
    }
}

fn print_no_data_help(symbol: &str, range: &DateRange) {
    println!(
        "\nFailed to retrieve any OHLC data for {} for the range {}-{}.",
        symbol,
        range.start.format("%Y"),
        range.end.format("%Y")
    );
    println!("Please check:");
    println!("1. API availability and your internet connection.");
    println!("2. That the symbol was actively traded during the requested period.");
    println!("3. That Delta Exchange holds history for this symbol and range (data generally starts March 30, 2020).");
    println!("   If you selected a very old year, try a more recent range (e.g., 2023-2024).");
}
