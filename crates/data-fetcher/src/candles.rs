use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coin_store::CoinStore;
use market_client::binance::KLINE_PAGE_LIMIT;
use market_client::BinanceClient;
use market_core::{Candle, MarketError, MarketResult, TrackedSymbol};
use tracing::{info, warn};

use crate::{FetchContext, JobReport};

const LOOKBACK_DAYS: i64 = 5 * 365;
const PAGE_PAUSE: Duration = Duration::from_millis(200);
const ERROR_PAUSE: Duration = Duration::from_secs(5);
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Pages of daily klines starting at an epoch-millisecond timestamp.
#[async_trait]
pub trait KlinePages: Send + Sync {
    async fn page(&self, symbol: TrackedSymbol, start_ms: i64) -> MarketResult<Vec<Candle>>;
}

#[async_trait]
impl KlinePages for BinanceClient {
    async fn page(&self, symbol: TrackedSymbol, start_ms: i64) -> MarketResult<Vec<Candle>> {
        self.daily_klines(symbol, start_ms, KLINE_PAGE_LIMIT).await
    }
}

/// Result of backfilling one symbol. Pages stored before an error stay stored.
#[derive(Debug)]
pub struct Backfill {
    pub written: u64,
    pub error: Option<MarketError>,
}

/// Page from `since` up to now, upserting each page as it arrives.
pub async fn backfill(
    store: &CoinStore,
    pages: &dyn KlinePages,
    symbol: TrackedSymbol,
    since: DateTime<Utc>,
    pause: Duration,
) -> Backfill {
    let end_ms = Utc::now().timestamp_millis();
    let mut start_ms = since.timestamp_millis();
    let mut written = 0;

    while start_ms < end_ms {
        let page = match pages.page(symbol, start_ms).await {
            Ok(page) => page,
            Err(e) => return Backfill { written, error: Some(e) },
        };
        let Some(last) = page.last() else {
            break;
        };
        start_ms = last.timestamp.timestamp_millis() + DAY_MS;

        match store.upsert_candles(symbol, &page).await {
            Ok(n) => written += n,
            Err(e) => {
                return Backfill {
                    written,
                    error: Some(e.into()),
                }
            }
        }

        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    Backfill { written, error: None }
}

/// Page daily klines per symbol and upsert them by `(symbol, timestamp)`.
pub async fn run(ctx: &FetchContext) -> JobReport {
    let since = Utc::now() - chrono::Duration::days(LOOKBACK_DAYS);
    let mut report = JobReport::default();

    for &symbol in ctx.registry.symbols() {
        report.processed += 1;

        let result = backfill(&ctx.store, &ctx.market.binance, symbol, since, PAGE_PAUSE).await;
        report.written += result.written;

        match result.error {
            None => info!("{}: {} candles upserted", symbol, result.written),
            Some(e) => {
                warn!(
                    "Candle fetch failed for {} after {} candles: {}",
                    symbol, result.written, e
                );
                report.failed += 1;
                tokio::time::sleep(ERROR_PAUSE).await;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves `pages` pages of `per_page` daily candles, then fails.
    struct Scripted {
        pages: usize,
        per_page: i64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KlinePages for Scripted {
        async fn page(&self, _symbol: TrackedSymbol, start_ms: i64) -> MarketResult<Vec<Candle>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.pages {
                return Err(MarketError::UpstreamUnavailable("Binance 503".to_string()));
            }
            Ok((0..self.per_page)
                .map(|i| {
                    let ts = DateTime::from_timestamp_millis(start_ms + i * DAY_MS).unwrap();
                    Candle {
                        timestamp: ts,
                        open: 1.0,
                        high: 1.0,
                        low: 1.0,
                        close: 1.0,
                        volume: 1.0,
                        close_time: ts.timestamp_millis() + DAY_MS - 1,
                        quote_asset_volume: 1.0,
                        num_trades: 1,
                        taker_buy_base_vol: 0.5,
                        taker_buy_quote_vol: 0.5,
                    }
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_failed_page_keeps_earlier_pages() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        let pages = Scripted {
            pages: 1,
            per_page: 10,
            calls: AtomicUsize::new(0),
        };
        let since = Utc::now() - chrono::Duration::days(100);

        let result = backfill(&store, &pages, TrackedSymbol::Btc, since, Duration::ZERO).await;

        assert!(matches!(result.error, Some(MarketError::UpstreamUnavailable(_))));
        assert_eq!(result.written, 10);
        assert_eq!(pages.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.count_candles(TrackedSymbol::Btc).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_backfill_stops_at_now() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        let pages = Scripted {
            pages: usize::MAX,
            per_page: 5,
            calls: AtomicUsize::new(0),
        };
        let since = Utc::now() - chrono::Duration::days(12);

        let result = backfill(&store, &pages, TrackedSymbol::Eth, since, Duration::ZERO).await;

        assert!(result.error.is_none());
        assert_eq!(pages.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.written, 15);
    }
}
