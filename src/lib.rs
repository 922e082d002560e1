//! Delta Exchange OHLC Downloader
//!
//! Fetches candlestick history, product listings and ticker snapshots from
//! the Delta Exchange public REST API. Candle history is paginated over a
//! requested date range, merged into a clean OHLC table and saved as CSV.
//!
//! ```no_run
//! use chrono::{TimeZone, Utc};
//! use delta_ohlc::data::{fetch_history, HistoryRequest, OhlcTable, PaginationSettings};
//! use delta_ohlc::{Config, DeltaClient};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let client = DeltaClient::new(&config)?;
//!     let request = HistoryRequest {
//!         symbol: "BTCUSD".to_string(),
//!         resolution: "1d".to_string(),
//!         start: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
//!         end: Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap(),
//!     };
//!     let run = fetch_history(&client, &request, PaginationSettings::from(&config));
//!     let table = OhlcTable::assemble(run.candles, request.start, request.end);
//!     table.write_csv("BTCUSD_1d_2023_ohlc.csv")?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod exchange;
pub mod prompt;
pub mod ranking;
pub mod types;

pub use config::Config;
pub use error::{FetchError, InputError};
pub use exchange::DeltaClient;
pub use types::*;
