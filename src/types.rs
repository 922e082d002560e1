//! Core data types for products, tickers and candles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Raw candle timestamp could not be mapped to a UTC datetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("candle timestamp {0} is out of range")]
pub struct TimestampOutOfRange(pub i64);

/// Exchange-listed instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique trading symbol (e.g., "BTCUSD")
    pub symbol: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
    /// Listing state, e.g. "live" or "expired"
    #[serde(default)]
    pub state: Option<String>,
    /// Remaining fields as returned by the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Live market snapshot for one symbol
///
/// The tickers endpoint returns a wide, loosely typed record. Only the symbol
/// is pulled out; every other field stays raw and is read on demand. A
/// missing or null symbol does not reject the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Ticker {
    /// Whether the record carries the given field
    pub fn has_field(&self, name: &str) -> bool {
        if name == "symbol" {
            return self.symbol.is_some();
        }
        self.fields.contains_key(name)
    }

    /// Symbol, or an empty string when the record has none
    pub fn symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or_default()
    }

    /// Numeric value of a field
    ///
    /// Numbers and numeric strings are accepted; anything else (null, text,
    /// NaN) counts as missing.
    pub fn number(&self, name: &str) -> Option<f64> {
        let value = match self.fields.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        (!value.is_nan()).then_some(value)
    }

    /// 24h traded value in USD
    pub fn turnover_usd(&self) -> Option<f64> {
        self.number("turnover_usd")
    }

    /// Field rendered for a text table
    pub fn display_value(&self, name: &str) -> String {
        if name == "symbol" {
            return self.symbol().to_string();
        }
        match self.fields.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// One OHLCV bar as returned by the candles endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, unix seconds
    pub time: i64,
    #[serde(deserialize_with = "deserialize_f64_or_string")]
    pub open: f64,
    #[serde(deserialize_with = "deserialize_f64_or_string")]
    pub high: f64,
    #[serde(deserialize_with = "deserialize_f64_or_string")]
    pub low: f64,
    #[serde(deserialize_with = "deserialize_f64_or_string")]
    pub close: f64,
    /// Missing or null volume reads as 0
    #[serde(default, deserialize_with = "deserialize_volume")]
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// One row of an assembled OHLC table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    #[serde(with = "csv_time")]
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl TryFrom<Candle> for OhlcBar {
    type Error = TimestampOutOfRange;

    fn try_from(c: Candle) -> Result<Self, Self::Error> {
        let time = DateTime::from_timestamp(c.time, 0).ok_or(TimestampOutOfRange(c.time))?;
        Ok(Self {
            time,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        })
    }
}

/// CSV representation of bar times: `2024-01-01 00:00:00+00:00`
pub(crate) mod csv_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_str(s, FORMAT) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = s.parse::<DateTime<Utc>>() {
            return Ok(dt);
        }
        // Fall back to a naive timestamp and assume UTC
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
            .map_err(|_| format!("failed to parse time: {}", s))
    }
}

// Prices arrive as numbers on most endpoints and as strings on a few
fn deserialize_f64_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(F64OrString { null_as_zero: false })
}

fn deserialize_volume<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(F64OrString { null_as_zero: true })
}

// Volume may be null on illiquid buckets; prices may not
struct F64OrString {
    null_as_zero: bool,
}

impl<'de> serde::de::Visitor<'de> for F64OrString {
    type Value = f64;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a number or a string representing a number")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(v)
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(v as f64)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(v as f64)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.trim().parse().map_err(serde::de::Error::custom)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        if self.null_as_zero {
            Ok(0.0)
        } else {
            Err(E::invalid_type(serde::de::Unexpected::Unit, &self))
        }
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        self.visit_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_candle_parsing_accepts_strings() {
        let json = r#"{"time": 1704067200, "open": "42000.5", "high": 42500,
                       "low": 41800.0, "close": "42100", "volume": 1234}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.time, 1704067200);
        assert_eq!(candle.open, 42000.5);
        assert_eq!(candle.high, 42500.0);
        assert_eq!(candle.close, 42100.0);
        assert_eq!(candle.volume, 1234.0);
    }

    #[test]
    fn test_candle_without_volume() {
        let json = r#"{"time": 1, "open": 1, "high": 2, "low": 0.5, "close": 1.5}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.volume, 0.0);
    }

    #[test]
    fn test_candle_null_volume_reads_as_zero() {
        let json = r#"{"time": 1, "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": null}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.volume, 0.0);

        // Prices stay strict
        let json = r#"{"time": 1, "open": null, "high": 2, "low": 0.5, "close": 1.5}"#;
        assert!(serde_json::from_str::<Candle>(json).is_err());
    }

    #[test]
    fn test_null_symbol_keeps_ticker() {
        let json = r#"{"result": [{"symbol": "BTCUSD", "turnover_usd": 5},
                                  {"symbol": null, "turnover_usd": 3},
                                  {"turnover_usd": 1}]}"#;
        let tickers: Vec<Ticker> = crate::exchange::parse_result_list(json).unwrap();
        assert_eq!(tickers.len(), 3);
        assert_eq!(tickers[0].symbol(), "BTCUSD");
        assert!(tickers[1].symbol.is_none());
        assert_eq!(tickers[1].symbol(), "");
        assert!(!tickers[1].has_field("symbol"));
        assert_eq!(tickers[2].display_value("symbol"), "");
    }

    #[test]
    fn test_candle_rejects_text_price() {
        let json = r#"{"time": 1, "open": "abc", "high": 2, "low": 0.5, "close": 1.5}"#;
        assert!(serde_json::from_str::<Candle>(json).is_err());
    }

    #[test]
    fn test_bar_from_candle() {
        let bar = OhlcBar::try_from(Candle::new(1704067200, 1.0, 2.0, 0.5, 1.5, 10.0)).unwrap();
        assert_eq!(bar.time, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(bar.close, 1.5);

        let err = OhlcBar::try_from(Candle::new(i64::MAX, 1.0, 1.0, 1.0, 1.0, 0.0)).unwrap_err();
        assert_eq!(err, TimestampOutOfRange(i64::MAX));
    }

    #[test]
    fn test_ticker_numeric_coercion() {
        let json = r#"{"symbol": "BTCUSD", "turnover_usd": "1500000.25", "volume": 12,
                       "close": null, "mark_price": "n/a", "oi": "NaN"}"#;
        let ticker: Ticker = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.symbol(), "BTCUSD");
        assert_eq!(ticker.turnover_usd(), Some(1500000.25));
        assert_eq!(ticker.number("volume"), Some(12.0));
        assert_eq!(ticker.number("close"), None);
        assert_eq!(ticker.number("mark_price"), None);
        assert_eq!(ticker.number("oi"), None);
        assert_eq!(ticker.number("missing"), None);
        assert!(ticker.has_field("close"));
        assert!(!ticker.has_field("missing"));
        assert_eq!(ticker.display_value("close"), "");
        assert_eq!(ticker.display_value("volume"), "12");
        assert_eq!(ticker.display_value("mark_price"), "n/a");
    }

    #[test]
    fn test_product_keeps_extra_fields() {
        let json = r#"{"id": 27, "symbol": "BTCUSD", "state": "live",
                       "contract_type": "perpetual_futures", "tick_size": "0.5"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.symbol, "BTCUSD");
        assert_eq!(product.id, Some(27));
        assert_eq!(product.contract_type.as_deref(), Some("perpetual_futures"));
        assert_eq!(product.extra.get("tick_size"), Some(&Value::from("0.5")));
    }

    #[test]
    fn test_csv_time_format() {
        let dt = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let text = dt.format(csv_time::FORMAT).to_string();
        assert_eq!(text, "2023-12-31 23:59:59+00:00");
        assert_eq!(csv_time::parse(&text).unwrap(), dt);
        assert_eq!(csv_time::parse("2023-12-31 23:59:59").unwrap(), dt);
        assert!(csv_time::parse("yesterday").is_err());
    }
}
