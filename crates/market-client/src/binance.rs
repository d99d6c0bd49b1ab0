use chrono::{DateTime, Utc};
use market_core::{Candle, MarketError, MarketResult, TrackedSymbol};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::http::{decode, malformed, send};

const BASE_URL: &str = "https://api.binance.com";
const UPSTREAM: &str = "Binance";
pub const KLINE_PAGE_LIMIT: u32 = 1000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<ExchangeSymbol>,
}

#[derive(Debug, Deserialize)]
struct ExchangeSymbol {
    symbol: String,
    status: String,
}

#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    /// One page of daily klines starting at `start_ms` (inclusive).
    pub async fn daily_klines(
        &self,
        symbol: TrackedSymbol,
        start_ms: i64,
        limit: u32,
    ) -> MarketResult<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let builder = self.client.get(&url).query(&[
            ("symbol", symbol.pair()),
            ("interval", "1d".to_string()),
            ("startTime", start_ms.to_string()),
            ("limit", limit.to_string()),
        ]);
        let response = send(&self.client, builder, None, UPSTREAM).await?;

        let body: Value = decode(response, UPSTREAM).await?;
        parse_klines(&body)
    }

    /// Every daily candle from `since` up to now, paging 1000 at a time.
    ///
    /// `pause` is slept between pages.
    pub async fn daily_history(
        &self,
        symbol: TrackedSymbol,
        since: DateTime<Utc>,
        pause: Duration,
    ) -> MarketResult<Vec<Candle>> {
        let end_ms = Utc::now().timestamp_millis();
        let mut start_ms = since.timestamp_millis();
        let mut candles = Vec::new();

        while start_ms < end_ms {
            let page = self.daily_klines(symbol, start_ms, KLINE_PAGE_LIMIT).await?;
            let Some(last) = page.last() else {
                break;
            };
            start_ms = last.timestamp.timestamp_millis() + DAY_MS;
            candles.extend(page);

            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        tracing::debug!("Fetched {} daily candles for {}", candles.len(), symbol);
        Ok(candles)
    }

    /// Pairs currently in `TRADING` status.
    pub async fn trading_symbols(&self) -> MarketResult<Vec<String>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let response = send(&self.client, self.client.get(&url), None, UPSTREAM).await?;
        let info: ExchangeInfo = decode(response, UPSTREAM).await?;

        Ok(info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| s.symbol)
            .collect())
    }
}

/// Decode a klines body: an array of arrays, or an `{code, msg}` error object.
pub fn parse_klines(body: &Value) -> MarketResult<Vec<Candle>> {
    if let Ok(err) = serde_json::from_value::<ApiError>(body.clone()) {
        return Err(MarketError::UpstreamUnavailable(format!(
            "{} error {}: {}",
            UPSTREAM, err.code, err.msg
        )));
    }

    let rows = body
        .as_array()
        .ok_or_else(|| malformed(UPSTREAM, "klines body is not an array"))?;
    rows.iter().map(parse_kline).collect()
}

fn parse_kline(row: &Value) -> MarketResult<Candle> {
    let fields = row
        .as_array()
        .filter(|f| f.len() >= 11)
        .ok_or_else(|| malformed(UPSTREAM, "kline row has fewer than 11 fields"))?;

    let int = |i: usize| -> MarketResult<i64> {
        fields[i]
            .as_i64()
            .ok_or_else(|| malformed(UPSTREAM, format!("kline field {} is not an integer", i)))
    };
    // Binance sends prices and volumes as decimal strings
    let num = |i: usize| -> MarketResult<f64> {
        match &fields[i] {
            Value::String(s) => s.parse::<f64>().ok(),
            other => other.as_f64(),
        }
        .ok_or_else(|| malformed(UPSTREAM, format!("kline field {} is not numeric", i)))
    };

    let open_ms = int(0)?;
    let timestamp = DateTime::from_timestamp_millis(open_ms)
        .ok_or_else(|| malformed(UPSTREAM, format!("bad open time {}", open_ms)))?;

    Ok(Candle {
        timestamp,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
        close_time: int(6)?,
        quote_asset_volume: num(7)?,
        num_trades: int(8)?,
        taker_buy_base_vol: num(9)?,
        taker_buy_quote_vol: num(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kline_rows() {
        let body = json!([
            [1704067200000i64, "42283.58", "44184.10", "42180.77", "44179.55", "27174.29",
             1704153599999i64, "1169995682.37", 1586744, "14179.85", "610906245.04", "0"]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 1);
        let c = &candles[0];
        assert_eq!(c.timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(c.close, 44179.55);
        assert_eq!(c.num_trades, 1586744);
        assert_eq!(c.close_time, 1704153599999);
    }

    #[test]
    fn test_error_object_is_upstream_error() {
        let body = json!({"code": -1121, "msg": "Invalid symbol."});
        let err = parse_klines(&body).unwrap_err();
        assert!(matches!(err, MarketError::UpstreamUnavailable(msg) if msg.contains("Invalid symbol")));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let body = json!([[1704067200000i64, "1.0"]]);
        assert!(matches!(parse_klines(&body), Err(MarketError::MalformedResponse(_))));
    }

    #[test]
    fn test_empty_page() {
        assert!(parse_klines(&json!([])).unwrap().is_empty());
    }
}
