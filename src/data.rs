//! Historical candle download and OHLC table assembly
//!
//! The pagination loop walks a time cursor from the requested start to the
//! requested end, one candles request at a time. The raw pages are then
//! merged into an [`OhlcTable`]: converted to UTC times, deduplicated,
//! sorted, clipped to the requested range and written to CSV.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::io::Write;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{FetchResult, InputError};
use crate::exchange::{CandleQuery, DeltaClient};
use crate::types::{Candle, OhlcBar};

// =============================================================================
// Constants
// =============================================================================

/// Candle resolutions accepted by the candles endpoint
pub const RESOLUTIONS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "1d", "1w",
];

/// Column order of the CSV output
pub const COLUMNS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

/// Check a resolution against [`RESOLUTIONS`]
pub fn parse_resolution(input: &str) -> Result<String, InputError> {
    let resolution = input.trim();
    if RESOLUTIONS.contains(&resolution) {
        Ok(resolution.to_string())
    } else {
        Err(InputError::UnknownResolution(resolution.to_string()))
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Anything that can serve one page of candles
pub trait CandleSource {
    fn fetch_page(&self, query: &CandleQuery) -> FetchResult<Vec<Candle>>;
}

impl CandleSource for DeltaClient {
    fn fetch_page(&self, query: &CandleQuery) -> FetchResult<Vec<Candle>> {
        self.get_candles(query)
    }
}

/// What to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: String,
    pub resolution: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Page size and courtesy delay of the pagination loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    pub limit_per_request: u32,
    pub request_delay: Duration,
}

impl From<&Config> for PaginationSettings {
    fn from(config: &Config) -> Self {
        PaginationSettings {
            limit_per_request: config.limit_per_request,
            request_delay: config.request_delay(),
        }
    }
}

/// Why the pagination loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Last candle reached the requested end
    ReachedEnd,
    /// API returned no candles
    EmptyPage,
    /// Page smaller than the limit, nothing more to fetch
    ShortPage,
    /// Page did not move past the cursor
    NoProgress,
    /// A request failed; earlier pages are kept
    Failed(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ReachedEnd => write!(f, "reached the requested end time"),
            StopReason::EmptyPage => write!(f, "no more candles in range"),
            StopReason::ShortPage => write!(f, "page smaller than limit, history exhausted"),
            StopReason::NoProgress => write!(f, "API stopped advancing"),
            StopReason::Failed(e) => write!(f, "request failed: {}", e),
        }
    }
}

/// Progress of one completed page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based request counter
    pub page: usize,
    pub page_len: usize,
    pub total: usize,
    /// Window start of the request, unix seconds
    pub cursor: i64,
}

/// Everything gathered by one pagination run
#[derive(Debug, Clone)]
pub struct FetchRun {
    pub candles: Vec<Candle>,
    pub requests: usize,
    pub stop: StopReason,
}

impl FetchRun {
    /// True when the run ended on a failed request
    pub fn failed(&self) -> bool {
        matches!(self.stop, StopReason::Failed(_))
    }
}

/// Download the full requested range
pub fn fetch_history<S: CandleSource + ?Sized>(
    source: &S,
    request: &HistoryRequest,
    settings: PaginationSettings,
) -> FetchRun {
    fetch_history_with(source, request, settings, |_| {})
}

/// Download the full requested range, reporting each page to `on_page`
pub fn fetch_history_with<S, F>(
    source: &S,
    request: &HistoryRequest,
    settings: PaginationSettings,
    mut on_page: F,
) -> FetchRun
where
    S: CandleSource + ?Sized,
    F: FnMut(&PageProgress),
{
    let overall_start = request.start.timestamp();
    let overall_end = request.end.timestamp();
    let limit = settings.limit_per_request;

    info!(
        "Fetching {} ({}) candles from {} to {}",
        request.symbol,
        request.resolution,
        request.start.format("%Y-%m-%d %H:%M:%S UTC"),
        request.end.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let mut candles: Vec<Candle> = Vec::new();
    let mut requests = 0;
    let mut cursor = overall_start;

    let stop = loop {
        if cursor > overall_end {
            break StopReason::ReachedEnd;
        }

        let query = CandleQuery {
            symbol: request.symbol.clone(),
            resolution: request.resolution.clone(),
            start: cursor,
            end: overall_end,
            limit,
        };
        requests += 1;
        debug!("Requesting chunk starting at {}", cursor);

        let page = match source.fetch_page(&query) {
            Ok(page) => page,
            Err(e) => {
                info!("Error during pagination, keeping {} candles: {}", candles.len(), e);
                break StopReason::Failed(e.to_string());
            }
        };

        // Pages are usually ascending; the max also covers newest-first pages
        let Some(last_time) = page.iter().map(|c| c.time).max() else {
            info!("No more candles found in this segment");
            break StopReason::EmptyPage;
        };

        let page_len = page.len();
        candles.extend(page);
        info!(
            "Fetched {} candles in this chunk. Total so far: {}",
            page_len,
            candles.len()
        );
        on_page(&PageProgress {
            page: requests,
            page_len,
            total: candles.len(),
            cursor,
        });

        if last_time >= overall_end {
            break StopReason::ReachedEnd;
        }
        if page_len < limit as usize {
            break StopReason::ShortPage;
        }
        if last_time < cursor {
            info!(
                "Latest candle {} is before cursor {}, stopping",
                last_time, cursor
            );
            break StopReason::NoProgress;
        }

        cursor = last_time + 1;

        if !settings.request_delay.is_zero() {
            sleep(settings.request_delay);
        }
    };

    info!("Pagination finished after {} requests: {}", requests, stop);

    FetchRun {
        candles,
        requests,
        stop,
    }
}

// =============================================================================
// OHLC Table
// =============================================================================

/// Deduplicated, time-sorted, range-bounded candles for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OhlcTable {
    bars: Vec<OhlcBar>,
}

impl OhlcTable {
    /// Merge raw pages into a table bounded by `[start, end]`
    ///
    /// The first occurrence of a timestamp wins.
    pub fn assemble(candles: Vec<Candle>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let fetched = candles.len();

        let bars: Vec<OhlcBar> = candles
            .into_iter()
            .filter_map(|c| match OhlcBar::try_from(c) {
                Ok(bar) => Some(bar),
                Err(e) => {
                    warn!("Skipping candle: {}", e);
                    None
                }
            })
            .unique_by(|bar| bar.time)
            .sorted_by_key(|bar| bar.time)
            .filter(|bar| bar.time >= start && bar.time <= end)
            .collect();

        if bars.len() != fetched {
            debug!(
                "Assembled {} rows from {} fetched candles",
                bars.len(),
                fetched
            );
        }

        OhlcTable { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[OhlcBar] {
        &self.bars
    }

    pub fn first(&self) -> Option<&OhlcBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&OhlcBar> {
        self.bars.last()
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> &[OhlcBar] {
        &self.bars[..n.min(self.bars.len())]
    }

    /// Last `n` rows
    pub fn tail(&self, n: usize) -> &[OhlcBar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }

    /// Write the table as CSV with a `time,open,high,low,close,volume` header
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;

        writer.write_record(COLUMNS)?;
        for bar in &self.bars {
            writer.serialize(bar)?;
        }
        writer.flush().context("Failed to flush CSV output")?;

        info!("Saved {} rows to {}", self.bars.len(), path.display());
        Ok(())
    }

    /// Read a table previously written by [`OhlcTable::write_csv`]
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;

        let mut bars = Vec::new();
        for (row_idx, result) in reader.deserialize::<OhlcBar>().enumerate() {
            let bar = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
            bars.push(bar);
        }

        Ok(OhlcTable { bars })
    }
}

/// Write `table` to `path`, creating missing directories, and report the
/// outcome on `output`
///
/// A failed write is logged and reported but is not an error of the caller;
/// only a failure to write the report itself is. Returns whether the file
/// was saved.
pub fn save_and_report<W: Write>(table: &OhlcTable, path: &Path, output: &mut W) -> Result<bool> {
    match create_parent_and_write(table, path) {
        Ok(()) => {
            writeln!(output, "\n--- Data successfully saved to {} ---", path.display())?;
            Ok(true)
        }
        Err(e) => {
            error!("Error saving data to CSV: {:#}", e);
            writeln!(output, "\nError saving data to CSV: {:#}", e)?;
            Ok(false)
        }
    }
}

fn create_parent_and_write(table: &OhlcTable, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
    }
    table.write_csv(path)
}

/// Output file name: `{SYMBOL}_{RESOLUTION}_{YYYYMMDD}_{YYYYMMDD}_ohlc.csv`
pub fn output_filename(
    symbol: &str,
    resolution: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    format!(
        "{}_{}_{}_{}_ohlc.csv",
        symbol,
        resolution,
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

// =============================================================================
// Tests
// =============================================================================
