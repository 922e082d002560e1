//! Interactive symbol and date range input
//!
//! Validation lives in plain functions returning [`InputError`] so the same
//! rules serve both the interactive prompts and the command-line flags.
//! The prompt loops keep asking until the input validates or the input
//! stream closes.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, SubsecRound, TimeZone, Utc};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use tracing::debug;

use crate::error::InputError;

/// Earliest accepted year
pub const MIN_YEAR: i32 = 1900;

/// Delta Exchange keeps candle history from 2020-03-30 onwards
pub const HISTORY_FLOOR_YEAR: i32 = 2020;

/// Number of symbols shown after a rejected symbol
const SAMPLE_SIZE: usize = 5;

/// Validated request window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Jan 1 00:00:00 UTC of the start year
    pub start: DateTime<Utc>,
    /// Dec 31 23:59:59 UTC of the end year, or now if that is in the future
    pub end: DateTime<Utc>,
    /// End was moved back to the current time
    pub end_clamped: bool,
    /// Start year is older than the exchange's history
    pub before_history: bool,
}

/// Trim and uppercase a user-typed symbol
pub fn normalize_symbol(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Accept a symbol only if it is listed
pub fn validate_symbol(input: &str, symbols: &HashSet<String>) -> Result<String, InputError> {
    let symbol = normalize_symbol(input);
    if symbols.contains(&symbol) {
        Ok(symbol)
    } else {
        Err(InputError::UnknownSymbol(symbol))
    }
}

/// A few listed symbols, sorted so the hint is stable between runs
pub fn symbol_sample(symbols: &HashSet<String>, n: usize) -> Vec<&str> {
    let mut sample: Vec<&str> = symbols.iter().map(String::as_str).collect();
    sample.sort_unstable();
    sample.truncate(n);
    sample
}

/// Parse one year
pub fn parse_year(input: &str) -> Result<i32, InputError> {
    let trimmed = input.trim();
    trimmed
        .parse::<i32>()
        .map_err(|_| InputError::NotAYear(trimmed.to_string()))
}

/// Turn a start and end year into a request window
pub fn validate_year_range(
    start_year: i32,
    end_year: i32,
    now: DateTime<Utc>,
) -> Result<DateRange, InputError> {
    let max = now.year();
    for year in [start_year, end_year] {
        if !(MIN_YEAR..=max).contains(&year) {
            return Err(InputError::YearOutOfRange {
                year,
                min: MIN_YEAR,
                max,
            });
        }
    }

    if start_year > end_year {
        return Err(InputError::StartAfterEnd {
            start: start_year,
            end: end_year,
        });
    }

    let start = Utc
        .with_ymd_and_hms(start_year, 1, 1, 0, 0, 0)
        .single()
        .ok_or(InputError::YearOutOfRange {
            year: start_year,
            min: MIN_YEAR,
            max,
        })?;
    let end = Utc
        .with_ymd_and_hms(end_year, 12, 31, 23, 59, 59)
        .single()
        .ok_or(InputError::YearOutOfRange {
            year: end_year,
            min: MIN_YEAR,
            max,
        })?;

    let now = now.trunc_subsecs(0);
    let (end, end_clamped) = if end > now { (now, true) } else { (end, false) };

    Ok(DateRange {
        start,
        end,
        end_clamped,
        before_history: start_year < HISTORY_FLOOR_YEAR,
    })
}

/// Parse and validate a year range from text
pub fn parse_year_range(
    start: &str,
    end: &str,
    now: DateTime<Utc>,
) -> Result<DateRange, InputError> {
    validate_year_range(parse_year(start)?, parse_year(end)?, now)
}

/// Print the advisories attached to a range
pub fn report_range<W: Write>(output: &mut W, range: &DateRange) -> Result<()> {
    if range.before_history {
        writeln!(
            output,
            "\nWarning: Delta Exchange historical data generally starts from March 30, 2020."
        )?;
        writeln!(output, "         You may not get data for years before this date.")?;
    }
    if range.end_clamped {
        writeln!(
            output,
            "Warning: End year is not over yet. Adjusting end to now ({}).",
            range.end.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
    }
    Ok(())
}

fn read_line<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    if read == 0 {
        return Err(InputError::EndOfInput.into());
    }
    Ok(line)
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;
    read_line(input)
}

/// Ask for a symbol until a listed one is entered
pub fn prompt_symbol<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    symbols: &HashSet<String>,
) -> Result<String> {
    loop {
        let line = ask(
            input,
            output,
            "\nEnter the trading symbol (e.g., BTCUSD, ETHUSD): ",
        )?;

        match validate_symbol(&line, symbols) {
            Ok(symbol) => return Ok(symbol),
            Err(e) => {
                debug!("Rejected symbol input: {}", e);
                writeln!(output, "Error: {}. Please try again.", e)?;
                writeln!(output, "Available symbols count: {}", symbols.len())?;
                if !symbols.is_empty() {
                    writeln!(
                        output,
                        "Some examples: {}",
                        symbol_sample(symbols, SAMPLE_SIZE).join(", ")
                    )?;
                }
            }
        }
    }
}

/// Ask for a start and end year until they form a valid range
pub fn prompt_date_range<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    now: DateTime<Utc>,
) -> Result<DateRange> {
    loop {
        let start = ask(input, output, "Enter the START year (e.g., 2020): ")?;
        let start_year = match parse_year(&start) {
            Ok(year) => year,
            Err(e) => {
                debug!("Rejected year input: {}", e);
                writeln!(output, "Invalid input. Please enter a valid year (e.g., 2023).")?;
                continue;
            }
        };

        let end = ask(input, output, "Enter the END year (e.g., 2024): ")?;
        let end_year = match parse_year(&end) {
            Ok(year) => year,
            Err(e) => {
                debug!("Rejected year input: {}", e);
                writeln!(output, "Invalid input. Please enter a valid year (e.g., 2023).")?;
                continue;
            }
        };

        match validate_year_range(start_year, end_year, now) {
            Ok(range) => {
                report_range(output, &range)?;
                return Ok(range);
            }
            Err(e) => {
                debug!("Rejected year range: {}", e);
                writeln!(output, "Error: {}.", e)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn symbols() -> HashSet<String> {
        ["BTCUSD", "ETHUSD", "SOLUSD"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_validate_symbol_normalizes() {
        assert_eq!(validate_symbol("  btcusd \n", &symbols()).unwrap(), "BTCUSD");
        assert_eq!(
            validate_symbol("dogeusd", &symbols()),
            Err(InputError::UnknownSymbol("DOGEUSD".to_string()))
        );
    }

    #[test]
    fn test_symbol_sample_is_sorted_and_bounded() {
        assert_eq!(symbol_sample(&symbols(), 2), vec!["BTCUSD", "ETHUSD"]);
        assert_eq!(symbol_sample(&symbols(), 10).len(), 3);
    }

    #[test]
    fn test_year_range_bounds() {
        let range = validate_year_range(2021, 2022, now()).unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2022, 12, 31, 23, 59, 59).unwrap());
        assert!(!range.end_clamped);
        assert!(!range.before_history);
    }

    #[test]
    fn test_current_year_is_clamped_to_now() {
        let range = validate_year_range(2024, 2024, now()).unwrap();
        assert_eq!(range.end, now());
        assert!(range.end_clamped);
    }

    #[test]
    fn test_early_start_is_advisory_only() {
        let range = validate_year_range(2018, 2021, now()).unwrap();
        assert!(range.before_history);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_year_range_rejections() {
        assert_eq!(
            validate_year_range(1899, 2020, now()),
            Err(InputError::YearOutOfRange {
                year: 1899,
                min: 1900,
                max: 2024
            })
        );
        assert!(matches!(
            validate_year_range(2020, 2025, now()),
            Err(InputError::YearOutOfRange { year: 2025, .. })
        ));
        assert_eq!(
            validate_year_range(2023, 2021, now()),
            Err(InputError::StartAfterEnd {
                start: 2023,
                end: 2021
            })
        );
        assert_eq!(
            parse_year_range("twenty", "2021", now()),
            Err(InputError::NotAYear("twenty".to_string()))
        );
    }

    #[test]
    fn test_prompt_symbol_reprompts_until_valid() {
        let mut input = Cursor::new("XYZ\n\nethusd\n");
        let mut output = Vec::new();

        let symbol = prompt_symbol(&mut input, &mut output, &symbols()).unwrap();

        assert_eq!(symbol, "ETHUSD");
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Enter the trading symbol").count(), 3);
        assert!(text.contains("'XYZ' is not a valid or currently listed symbol"));
        assert!(text.contains("Available symbols count: 3"));
        assert!(text.contains("Some examples: BTCUSD, ETHUSD, SOLUSD"));
    }

    #[test]
    fn test_prompt_symbol_ends_on_eof() {
        let mut input = Cursor::new("nope\n");
        let mut output = Vec::new();
        let err = prompt_symbol(&mut input, &mut output, &symbols()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<InputError>(),
            Some(&InputError::EndOfInput)
        );
    }

    #[test]
    fn test_prompt_date_range_recovers_from_bad_input() {
        let mut input = Cursor::new("abc\n2022\n2020\n2019\n2024\n");
        let mut output = Vec::new();

        let range = prompt_date_range(&mut input, &mut output, now()).unwrap();

        assert_eq!(range.start, Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, now());
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Invalid input. Please enter a valid year"));
        assert!(text.contains("start year (2022) cannot be after end year (2020)"));
        assert!(text.contains("historical data generally starts from March 30, 2020"));
        assert!(text.contains("Adjusting end to now"));
    }
}
