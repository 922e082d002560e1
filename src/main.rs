//! Delta Exchange OHLC downloader - main entry point
//!
//! This binary provides three subcommands:
//! - fetch: Download OHLC history for one symbol to CSV (default)
//! - top: Rank symbols by 24h USD turnover
//! - symbols: List products available on the exchange

use anyhow::Result;
use clap::{Parser, Subcommand};
use delta_ohlc::Config;
use std::path::PathBuf;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "delta-ohlc")]
#[command(about = "Download OHLC history and ticker rankings from Delta Exchange", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API base URL (overrides config file and DELTA_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download OHLC candles for a symbol and year range to CSV
    Fetch {
        /// Trading symbol (prompted if omitted). E.g., "BTCUSD"
        #[arg(short, long)]
        symbol: Option<String>,

        /// First year of the range (prompted if omitted)
        #[arg(long, requires = "end_year")]
        start_year: Option<i32>,

        /// Last year of the range (prompted if omitted)
        #[arg(long, requires = "start_year")]
        end_year: Option<i32>,

        /// Candle resolution. E.g., "1h", "1d"
        #[arg(short, long)]
        resolution: Option<String>,

        /// Output directory for the CSV file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Show the top symbols by 24h turnover in USD
    Top {
        /// Number of symbols to show
        #[arg(
            short = 'n',
            long,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        count: Option<usize>,
    },

    /// List available symbols
    Symbols {
        /// Only show symbols containing this text
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Log file naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // Console stays quiet so prompts and the progress spinner remain readable
    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
        .with_filter(console_level);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command_name = match &cli.command {
        None | Some(Commands::Fetch { .. }) => "fetch",
        Some(Commands::Top { .. }) => "top",
        Some(Commands::Symbols { .. }) => "symbols",
    };

    setup_logging(cli.verbose, command_name)?;

    let config = Config::load(cli.config.as_deref(), cli.base_url)?;
    info!("Using API at {}", config.base_url);

    match cli.command {
        None => commands::fetch::run(
            config,
            commands::fetch::FetchArgs {
                verbose: cli.verbose,
                ..Default::default()
            },
        ),

        Some(Commands::Fetch {
            symbol,
            start_year,
            end_year,
            resolution,
            output_dir,
        }) => commands::fetch::run(
            config,
            commands::fetch::FetchArgs {
                symbol,
                start_year,
                end_year,
                resolution,
                output_dir,
                verbose: cli.verbose,
            },
        ),

        Some(Commands::Top { count }) => commands::top::run(config, count),

        Some(Commands::Symbols { filter }) => commands::symbols::run(config, filter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_top_count_must_be_positive() {
        assert!(Cli::try_parse_from(["delta-ohlc", "top", "--count", "0"]).is_err());
        assert!(Cli::try_parse_from(["delta-ohlc", "top", "-n", "-3"]).is_err());

        let cli = Cli::try_parse_from(["delta-ohlc", "top", "-n", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Top { count: Some(3) })));

        let cli = Cli::try_parse_from(["delta-ohlc", "top"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Top { count: None })));
    }

    #[test]
    fn test_fetch_years_come_in_pairs() {
        assert!(Cli::try_parse_from(["delta-ohlc", "fetch", "--start-year", "2021"]).is_err());

        let cli = Cli::try_parse_from([
            "delta-ohlc",
            "fetch",
            "-s",
            "btcusd",
            "--start-year",
            "2021",
            "--end-year",
            "2022",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Some(Commands::Fetch {
                start_year: Some(2021),
                end_year: Some(2022),
                ..
            })
        ));
    }
}
