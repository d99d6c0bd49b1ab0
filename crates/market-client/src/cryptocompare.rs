use chrono::{DateTime, Utc};
use market_core::{MarketError, MarketResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::http::{decode, malformed, send};

const BASE_URL: &str = "https://min-api.cryptocompare.com/data";
const IMAGE_HOST: &str = "https://www.cryptocompare.com";
const UPSTREAM: &str = "CryptoCompare";

/// One hourly OHLCV bar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HourlyBar {
    pub time: i64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    #[serde(rename = "volumefrom")]
    pub volume_from: Option<f64>,
    #[serde(rename = "volumeto")]
    pub volume_to: Option<f64>,
}

impl HourlyBar {
    pub fn time_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

/// Supply and valuation fields from `pricemultifull`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketInfo {
    pub market_cap: Option<f64>,
    pub supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub image_url: Option<String>,
}

/// Raw news item as returned by the news endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawInsight {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub imageurl: Option<String>,
    #[serde(default)]
    pub published_on: Option<i64>,
}

#[derive(Clone)]
pub struct CryptoCompareClient {
    client: Client,
    api_key: Option<String>,
}

impl CryptoCompareClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> MarketResult<Value> {
        let url = format!("{}{}", BASE_URL, path);
        let mut builder = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Apikey {}", key));
        }
        let response = send(&self.client, builder, None, UPSTREAM).await?;
        decode(response, UPSTREAM).await
    }

    /// The last `limit` hourly bars for `base/quote`.
    pub async fn hourly_history(&self, base: &str, quote: &str, limit: u32) -> MarketResult<Vec<HourlyBar>> {
        let body = self
            .get_json(
                "/v2/histohour",
                &[
                    ("fsym", base.to_string()),
                    ("tsym", quote.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        parse_hourly(&body)
    }

    pub async fn market_info(&self, base: &str, quote: &str) -> MarketResult<MarketInfo> {
        let body = self
            .get_json(
                "/pricemultifull",
                &[("fsyms", base.to_string()), ("tsyms", quote.to_string())],
            )
            .await?;
        Ok(parse_market_info(&body, base, quote))
    }

    /// Latest English news items.
    pub async fn news(&self, limit: u32) -> MarketResult<Vec<RawInsight>> {
        let body = self
            .get_json(
                "/v2/news/",
                &[("lang", "EN".to_string()), ("limit", limit.to_string())],
            )
            .await?;
        let data = body.get("Data").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(data).map_err(|e| malformed(UPSTREAM, e))
    }
}

pub fn parse_hourly(body: &Value) -> MarketResult<Vec<HourlyBar>> {
    let status = body.get("Response").and_then(Value::as_str).unwrap_or_default();
    if status != "Success" {
        let message = body.get("Message").and_then(Value::as_str).unwrap_or("unknown error");
        return Err(MarketError::UpstreamUnavailable(format!(
            "{} histohour failed: {}",
            UPSTREAM, message
        )));
    }

    let rows = body
        .pointer("/Data/Data")
        .cloned()
        .ok_or_else(|| malformed(UPSTREAM, "missing Data.Data"))?;
    serde_json::from_value(rows).map_err(|e| malformed(UPSTREAM, e))
}

pub fn parse_market_info(body: &Value, base: &str, quote: &str) -> MarketInfo {
    let raw = body
        .get("RAW")
        .and_then(|r| r.get(base))
        .and_then(|r| r.get(quote))
        .cloned()
        .unwrap_or(Value::Null);
    let f = |field: &str| raw.get(field).and_then(Value::as_f64);

    MarketInfo {
        market_cap: f("MKTCAP"),
        supply: f("SUPPLY"),
        // zero means "no cap"
        max_supply: f("MAXSUPPLY").filter(|v| *v > 0.0),
        circulating_supply: f("CIRCULATINGSUPPLY"),
        image_url: raw
            .get("IMAGEURL")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}{}", IMAGE_HOST, p)),
    }
}
