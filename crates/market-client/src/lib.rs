//! HTTP clients for the market data providers.
//!
//! Every call maps transport and status failures to
//! [`MarketError::UpstreamUnavailable`](market_core::MarketError) and
//! unexpected JSON to `MalformedResponse`.

pub mod binance;
pub mod coingecko;
pub mod cryptocompare;
mod http;
pub mod newsapi;
pub mod rate_limit;

pub use binance::BinanceClient;
pub use coingecko::{CoinGeckoClient, CoinProfile, CoinSnapshot, MarketOrder, TrendingCoin};
pub use cryptocompare::{CryptoCompareClient, HourlyBar, MarketInfo, RawInsight};
pub use newsapi::{NewsApiClient, NewsSort};
pub use rate_limit::RateLimiter;

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MarketClientConfig {
    pub timeout: Duration,
    pub news_api_key: Option<String>,
    pub crypto_compare_api_key: Option<String>,
    /// CoinGecko requests per minute
    pub coingecko_rate_limit: usize,
}

impl Default for MarketClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            news_api_key: None,
            crypto_compare_api_key: None,
            coingecko_rate_limit: 30,
        }
    }
}

impl MarketClientConfig {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            timeout: non_empty("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            news_api_key: non_empty("NEWS_API_KEY"),
            crypto_compare_api_key: non_empty("CRYPTO_COMPARE_API_KEY")
                .or_else(|| non_empty("CRYPTOCOMPARE_API_KEY")),
            coingecko_rate_limit: non_empty("COINGECKO_RATE_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.coingecko_rate_limit),
        }
    }
}

/// All market data clients over one shared connection pool.
#[derive(Clone)]
pub struct MarketClient {
    pub binance: BinanceClient,
    pub coingecko: CoinGeckoClient,
    pub cryptocompare: CryptoCompareClient,
    pub news: NewsApiClient,
}

impl MarketClient {
    pub fn new(config: MarketClientConfig) -> Self {
        let client = http::build_client(config.timeout);
        let limiter = RateLimiter::new(
            "CoinGecko",
            config.coingecko_rate_limit,
            Duration::from_secs(60),
        );

        Self {
            binance: BinanceClient::new(client.clone()),
            coingecko: CoinGeckoClient::new(client.clone(), limiter),
            cryptocompare: CryptoCompareClient::new(client.clone(), config.crypto_compare_api_key),
            news: NewsApiClient::new(client, config.news_api_key),
        }
    }

    pub fn from_env() -> Self {
        Self::new(MarketClientConfig::from_env())
    }
}
