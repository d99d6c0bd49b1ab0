use market_core::{MarketError, MarketResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{decode, malformed, send};
use crate::rate_limit::RateLimiter;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const UPSTREAM: &str = "CoinGecko";
const TOP_N: usize = 10;

/// Live market snapshot for one coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub price: Option<f64>,
    pub price_change_percentage: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_change_percentage: Option<f64>,
    pub volume_24h: Option<f64>,
    pub fdv: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub rank: Option<u32>,
    pub ath: Option<f64>,
    pub ath_change_percentage: Option<f64>,
    pub ath_date: Option<String>,
    pub atl: Option<f64>,
    pub atl_change_percentage: Option<f64>,
    pub atl_date: Option<String>,
    pub homepage: Option<String>,
    pub explorer: Option<String>,
    pub description: String,
}

/// Description and percent changes used to enrich hourly coin details.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoinProfile {
    pub description: String,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingCoin {
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub price_btc: Option<f64>,
}

/// Sort order for the `/coins/markets` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketOrder {
    VolumeDesc,
    MarketCapDesc,
}

impl MarketOrder {
    fn as_str(&self) -> &'static str {
        match self {
            MarketOrder::VolumeDesc => "volume_desc",
            MarketOrder::MarketCapDesc => "market_cap_desc",
        }
    }
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl CoinGeckoClient {
    pub fn new(client: Client, rate_limiter: RateLimiter) -> Self {
        Self {
            client,
            rate_limiter,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> MarketResult<Value> {
        let url = format!("{}{}", BASE_URL, path);
        let builder = self.client.get(&url).query(query);
        let response = send(&self.client, builder, Some(&self.rate_limiter), UPSTREAM).await?;
        decode(response, UPSTREAM).await
    }

    pub async fn coin_snapshot(&self, coin_id: &str) -> MarketResult<CoinSnapshot> {
        let body = self.get_json(&format!("/coins/{}", coin_id), &[]).await?;
        parse_snapshot(&body)
    }

    pub async fn coin_profile(&self, coin_id: &str) -> MarketResult<CoinProfile> {
        let body = self.get_json(&format!("/coins/{}", coin_id), &[]).await?;
        Ok(parse_profile(&body))
    }

    /// Daily `[timestamp_ms, price]` pairs for the last `days` days.
    pub async fn market_chart(&self, coin_id: &str, days: u32) -> MarketResult<Vec<[f64; 2]>> {
        let body = self
            .get_json(
                &format!("/coins/{}/market_chart", coin_id),
                &[
                    ("vs_currency", "usd".to_string()),
                    ("days", days.to_string()),
                    ("interval", "daily".to_string()),
                ],
            )
            .await?;

        let prices = body.get("prices").cloned().unwrap_or(Value::Array(Vec::new()));
        let prices: Vec<[f64; 2]> =
            serde_json::from_value(prices).map_err(|e| malformed(UPSTREAM, e))?;
        if prices.is_empty() {
            return Err(MarketError::NoData(format!("no price history for {}", coin_id)));
        }
        Ok(prices)
    }

    /// Top ten coins in the given order, passed through as returned.
    pub async fn markets(&self, order: MarketOrder) -> MarketResult<Vec<Value>> {
        let body = self
            .get_json(
                "/coins/markets",
                &[
                    ("vs_currency", "usd".to_string()),
                    ("order", order.as_str().to_string()),
                    ("per_page", TOP_N.to_string()),
                    ("page", "1".to_string()),
                ],
            )
            .await?;
        serde_json::from_value(body).map_err(|e| malformed(UPSTREAM, e))
    }

    pub async fn trending(&self) -> MarketResult<Vec<TrendingCoin>> {
        let body = self.get_json("/search/trending", &[]).await?;
        Ok(parse_trending(&body))
    }

    pub async fn top_exchanges(&self) -> MarketResult<Vec<Value>> {
        let body = self.get_json("/exchanges", &[]).await?;
        let list = body
            .as_array()
            .ok_or_else(|| malformed(UPSTREAM, "exchanges body is not an array"))?;
        Ok(list.iter().take(TOP_N).cloned().collect())
    }
}

fn usd(market: &Value, field: &str) -> Option<f64> {
    market.get(field).and_then(|v| v.get("usd")).and_then(Value::as_f64)
}

fn first_link(links: &Value, field: &str) -> Option<String> {
    links
        .get(field)
        .and_then(Value::as_array)
        .and_then(|a| a.iter().filter_map(Value::as_str).find(|s| !s.is_empty()))
        .map(str::to_string)
}

fn english_description(body: &Value) -> String {
    body.pointer("/description/en")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn parse_snapshot(body: &Value) -> MarketResult<CoinSnapshot> {
    let market = body
        .get("market_data")
        .ok_or_else(|| malformed(UPSTREAM, "missing market_data"))?;
    let links = body.get("links").cloned().unwrap_or(Value::Null);
    let f = |field: &str| market.get(field).and_then(Value::as_f64);

    Ok(CoinSnapshot {
        price: usd(market, "current_price"),
        price_change_percentage: f("price_change_percentage_24h"),
        market_cap: usd(market, "market_cap"),
        market_cap_change_percentage: f("market_cap_change_percentage_24h"),
        volume_24h: usd(market, "total_volume"),
        fdv: usd(market, "fully_diluted_valuation"),
        total_supply: f("total_supply"),
        max_supply: f("max_supply"),
        circulating_supply: f("circulating_supply"),
        rank: body.get("market_cap_rank").and_then(Value::as_u64).map(|r| r as u32),
        ath: usd(market, "ath"),
        ath_change_percentage: usd(market, "ath_change_percentage"),
        ath_date: market.pointer("/ath_date/usd").and_then(Value::as_str).map(str::to_string),
        atl: usd(market, "atl"),
        atl_change_percentage: usd(market, "atl_change_percentage"),
        atl_date: market.pointer("/atl_date/usd").and_then(Value::as_str).map(str::to_string),
        homepage: first_link(&links, "homepage"),
        explorer: first_link(&links, "blockchain_site"),
        description: english_description(body),
    })
}

pub fn parse_profile(body: &Value) -> CoinProfile {
    CoinProfile {
        description: english_description(body),
        percent_change_24h: body
            .pointer("/market_data/price_change_percentage_24h")
            .and_then(Value::as_f64),
        percent_change_7d: body
            .pointer("/market_data/price_change_percentage_7d")
            .and_then(Value::as_f64),
    }
}

pub fn parse_trending(body: &Value) -> Vec<TrendingCoin> {
    body.get("coins")
        .and_then(Value::as_array)
        .map(|coins| {
            coins
                .iter()
                .filter_map(|c| c.get("item"))
                .take(TOP_N)
                .map(|item| TrendingCoin {
                    name: item.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    symbol: item.get("symbol").and_then(Value::as_str).unwrap_or_default().to_string(),
                    market_cap_rank: item
                        .get("market_cap_rank")
                        .and_then(Value::as_u64)
                        .map(|r| r as u32),
                    price_btc: item.get("price_btc").and_then(Value::as_f64),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_snapshot() {
        let body = json!({
            "market_cap_rank": 1,
            "links": {"homepage": ["", "https://bitcoin.org"], "blockchain_site": []},
            "description": {"en": "The first cryptocurrency."},
            "market_data": {
                "current_price": {"usd": 65000.5},
                "market_cap": {"usd": 1.2e12},
                "total_volume": {"usd": 3.1e10},
                "price_change_percentage_24h": -1.25,
                "max_supply": 21000000.0,
                "ath": {"usd": 73000.0},
                "ath_date": {"usd": "2024-03-14T07:10:36.635Z"}
            }
        });
        let snap = parse_snapshot(&body).unwrap();
        assert_eq!(snap.price, Some(65000.5));
        assert_eq!(snap.rank, Some(1));
        assert_eq!(snap.price_change_percentage, Some(-1.25));
        assert_eq!(snap.homepage.as_deref(), Some("https://bitcoin.org"));
        assert_eq!(snap.explorer, None);
        assert_eq!(snap.fdv, None);
        assert_eq!(snap.ath_date.as_deref(), Some("2024-03-14T07:10:36.635Z"));
        assert_eq!(snap.description, "The first cryptocurrency.");
    }

    #[test]
    fn test_snapshot_without_market_data_is_malformed() {
        assert!(matches!(
            parse_snapshot(&json!({"id": "bitcoin"})),
            Err(MarketError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_trending_limits_to_ten() {
        let coins: Vec<Value> = (0..15)
            .map(|i| json!({"item": {"name": format!("Coin{}", i), "symbol": "C", "market_cap_rank": i, "price_btc": 0.0001}}))
            .collect();
        let trending = parse_trending(&json!({ "coins": coins }));
        assert_eq!(trending.len(), 10);
        assert_eq!(trending[3].name, "Coin3");
        assert_eq!(trending[3].market_cap_rank, Some(3));
    }

    #[test]
    fn test_parse_profile_tolerates_missing_fields() {
        let profile = parse_profile(&json!({"market_data": {"price_change_percentage_7d": 4.2}}));
        assert_eq!(profile.description, "");
        assert_eq!(profile.percent_change_24h, None);
        assert_eq!(profile.percent_change_7d, Some(4.2));
    }
}
