//! Top-N ranking of tickers by 24h USD turnover

use std::fmt::Write as _;
use tracing::{info, warn};

use crate::types::Ticker;

/// Field used to rank tickers
pub const TURNOVER_FIELD: &str = "turnover_usd";

/// Columns shown for ranked tickers, in display order
pub const DISPLAY_COLUMNS: &[&str] = &[
    "symbol",
    TURNOVER_FIELD,
    "volume",
    "last_price",
    "close",
    "open",
    "high",
    "low",
];

/// Tickers sorted by turnover, highest first
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Display columns present in the fetched tickers
    pub columns: Vec<&'static str>,
    pub rows: Vec<Ticker>,
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Symbols in rank order
    pub fn symbols(&self) -> Vec<&str> {
        self.rows.iter().map(Ticker::symbol).collect()
    }

    /// Render as a left-aligned text table
    pub fn render(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|t| self.columns.iter().map(|c| t.display_value(c)).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                cells
                    .iter()
                    .map(|row| row[i].len())
                    .chain(std::iter::once(col.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        let _ = writeln!(out, "{}", header.join("  ").trim_end());

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<w$}", v, w = *w))
                .collect();
            let _ = writeln!(out, "{}", line.join("  ").trim_end());
        }
        out
    }
}

/// Rank tickers by 24h USD turnover and keep the top `n`
///
/// Tickers whose turnover is not numeric are dropped. The result is empty if
/// no ticker carries the turnover field at all.
pub fn top_by_turnover(tickers: Vec<Ticker>, n: usize) -> Ranking {
    if tickers.is_empty() {
        warn!("Could not retrieve any ticker data.");
        return Ranking::default();
    }

    if !tickers.iter().any(|t| t.has_field(TURNOVER_FIELD)) {
        warn!(
            "'{}' field not found in ticker data, cannot rank by volume",
            TURNOVER_FIELD
        );
        return Ranking::default();
    }

    let columns: Vec<&'static str> = DISPLAY_COLUMNS
        .iter()
        .copied()
        .filter(|col| tickers.iter().any(|t| t.has_field(col)))
        .collect();

    let total = tickers.len();
    let mut ranked: Vec<(f64, Ticker)> = tickers
        .into_iter()
        .filter_map(|t| t.turnover_usd().map(|v| (v, t)))
        .collect();

    if ranked.len() < total {
        info!(
            "Dropped {} tickers without numeric {}",
            total - ranked.len(),
            TURNOVER_FIELD
        );
    }

    // Stable sort keeps API order among equal turnovers
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(n);

    Ranking {
        columns,
        rows: ranked.into_iter().map(|(_, t)| t).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn ticker(value: serde_json::Value) -> Ticker {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> Vec<Ticker> {
        vec![
            ticker(json!({"symbol": "ETHUSD", "turnover_usd": "2500000.5", "close": 3100})),
            ticker(json!({"symbol": "BADUSD", "turnover_usd": "n/a", "close": 1})),
            ticker(json!({"symbol": "BTCUSD", "turnover_usd": 9000000, "close": 64000})),
            ticker(json!({"symbol": "NULLUSD", "turnover_usd": null})),
            ticker(json!({"symbol": "SOLUSD", "turnover_usd": 1200000.0, "volume": 55})),
            ticker(json!({"symbol": "XRPUSD", "close": 0.5})),
        ]
    }

    #[test]
    fn test_ranking_is_descending_and_drops_non_numeric() {
        let ranking = top_by_turnover(sample(), 10);

        assert_eq!(ranking.symbols(), vec!["BTCUSD", "ETHUSD", "SOLUSD"]);
        let turnovers: Vec<f64> = ranking
            .rows
            .iter()
            .map(|t| t.turnover_usd().unwrap())
            .collect();
        for pair in turnovers.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        assert_relative_eq!(turnovers[1], 2500000.5);
    }

    #[test]
    fn test_ranking_truncates_to_n() {
        let ranking = top_by_turnover(sample(), 2);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking.symbols(), vec!["BTCUSD", "ETHUSD"]);
    }

    #[test]
    fn test_only_present_columns_are_shown() {
        let ranking = top_by_turnover(sample(), 10);
        assert_eq!(ranking.columns, vec!["symbol", "turnover_usd", "volume", "close"]);
    }

    #[test]
    fn test_missing_turnover_field_yields_empty() {
        let tickers = vec![ticker(json!({"symbol": "BTCUSD", "volume": 10}))];
        let ranking = top_by_turnover(tickers, 5);
        assert!(ranking.is_empty());
        assert!(ranking.columns.is_empty());
    }

    #[test]
    fn test_tickers_without_symbol_are_still_ranked() {
        let tickers = vec![
            ticker(json!({"symbol": null, "turnover_usd": 3})),
            ticker(json!({"turnover_usd": 5, "close": 2})),
        ];
        let ranking = top_by_turnover(tickers, 5);

        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking.symbols(), vec!["", ""]);
        assert_eq!(ranking.columns, vec!["turnover_usd", "close"]);
        assert!(ranking.render().starts_with("turnover_usd  close"));
    }

    #[test]
    fn test_symbol_column_kept_when_any_ticker_has_one() {
        let tickers = vec![
            ticker(json!({"symbol": null, "turnover_usd": 3})),
            ticker(json!({"symbol": "BTCUSD", "turnover_usd": 5})),
        ];
        let ranking = top_by_turnover(tickers, 5);

        assert_eq!(ranking.symbols(), vec!["BTCUSD", ""]);
        assert_eq!(ranking.columns, vec!["symbol", "turnover_usd"]);
    }

    #[test]
    fn test_no_tickers_yields_empty() {
        assert!(top_by_turnover(Vec::new(), 5).is_empty());
    }

    #[test]
    fn test_render_aligns_columns() {
        let ranking = top_by_turnover(sample(), 2);
        let text = ranking.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("symbol  turnover_usd"));
        assert!(lines[1].starts_with("BTCUSD  9000000"));
        assert!(lines[2].starts_with("ETHUSD  2500000.5"));
    }
}
