use async_trait::async_trait;
use chrono::{Duration, Utc};
use coin_store::CoinStore;
use market_client::BinanceClient;
use market_core::{MarketResult, PricePoint, TrackedSymbol};

/// Daily close history for one symbol, oldest first.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn daily_closes(&self, symbol: TrackedSymbol) -> MarketResult<Vec<PricePoint>>;
}

/// Live history straight from the exchange.
#[derive(Clone)]
pub struct ExchangeHistory {
    binance: BinanceClient,
    lookback: Duration,
}

impl ExchangeHistory {
    pub fn new(binance: BinanceClient, lookback: Duration) -> Self {
        Self { binance, lookback }
    }
}

#[async_trait]
impl HistorySource for ExchangeHistory {
    async fn daily_closes(&self, symbol: TrackedSymbol) -> MarketResult<Vec<PricePoint>> {
        let since = Utc::now() - self.lookback;
        let candles = self
            .binance
            .daily_history(symbol, since, std::time::Duration::ZERO)
            .await?;

        Ok(candles
            .into_iter()
            .map(|c| PricePoint {
                timestamp: c.timestamp,
                close: c.close,
            })
            .collect())
    }
}

#[async_trait]
impl HistorySource for CoinStore {
    async fn daily_closes(&self, symbol: TrackedSymbol) -> MarketResult<Vec<PricePoint>> {
        Ok(CoinStore::daily_closes(self, symbol).await?)
    }
}
