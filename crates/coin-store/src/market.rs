//! Candles and hourly coin details.

use chrono::{DateTime, Utc};
use market_core::{Candle, CoinDetail, PricePoint, TrackedSymbol};

use crate::db::CoinStore;
use crate::error::StoreResult;
use crate::models::{CoinDetailRow, HourlyClose};

impl CoinStore {
    /// Insert or overwrite candles keyed by `(symbol, timestamp)`. Returns rows written.
    pub async fn upsert_candles(&self, symbol: TrackedSymbol, candles: &[Candle]) -> StoreResult<u64> {
        let pair = symbol.pair();
        let mut tx = self.pool().begin().await?;
        let mut written = 0;

        for c in candles {
            let result = sqlx::query(
                r#"
                INSERT INTO candles (symbol, timestamp, open, high, low, close, volume, close_time,
                                     quote_asset_volume, num_trades, taker_buy_base_vol, taker_buy_quote_vol)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(symbol, timestamp) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume,
                    close_time = excluded.close_time,
                    quote_asset_volume = excluded.quote_asset_volume,
                    num_trades = excluded.num_trades,
                    taker_buy_base_vol = excluded.taker_buy_base_vol,
                    taker_buy_quote_vol = excluded.taker_buy_quote_vol
                "#,
            )
            .bind(&pair)
            .bind(c.timestamp)
            .bind(c.open)
            .bind(c.high)
            .bind(c.low)
            .bind(c.close)
            .bind(c.volume)
            .bind(c.close_time)
            .bind(c.quote_asset_volume)
            .bind(c.num_trades)
            .bind(c.taker_buy_base_vol)
            .bind(c.taker_buy_quote_vol)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    pub async fn count_candles(&self, symbol: TrackedSymbol) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candles WHERE symbol = ?")
            .bind(symbol.pair())
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Daily closes, oldest first.
    pub async fn daily_closes(&self, symbol: TrackedSymbol) -> StoreResult<Vec<PricePoint>> {
        let rows: Vec<(DateTime<Utc>, f64)> = sqlx::query_as(
            "SELECT timestamp, close FROM candles WHERE symbol = ? ORDER BY timestamp ASC",
        )
        .bind(symbol.pair())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(timestamp, close)| PricePoint { timestamp, close })
            .collect())
    }

    /// Insert details whose time is not stored yet. Returns how many were new.
    pub async fn insert_coin_details(&self, symbol: TrackedSymbol, details: &[CoinDetail]) -> StoreResult<u64> {
        let pair = symbol.pair();
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;

        for d in details {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO coin_details (
                    symbol, time, open_price, high_price, low_price, close_price, volume_from, volume_to,
                    market_cap, supply, max_supply, circulating_supply, image_url, description,
                    percent_change_24h, percent_change_7d)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&pair)
            .bind(d.time)
            .bind(d.open_price)
            .bind(d.high_price)
            .bind(d.low_price)
            .bind(d.close_price)
            .bind(d.volume_from)
            .bind(d.volume_to)
            .bind(d.market_cap)
            .bind(d.supply)
            .bind(d.max_supply)
            .bind(d.circulating_supply)
            .bind(&d.image_url)
            .bind(&d.description)
            .bind(d.percent_change_24h)
            .bind(d.percent_change_7d)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn latest_coin_detail(&self, symbol: TrackedSymbol) -> StoreResult<Option<CoinDetail>> {
        let row = sqlx::query_as::<_, CoinDetailRow>(
            "SELECT * FROM coin_details WHERE symbol = ? ORDER BY time DESC LIMIT 1",
        )
        .bind(symbol.pair())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(CoinDetail::from))
    }

    /// Hourly closes at or after `since`, oldest first.
    pub async fn hourly_closes(&self, symbol: TrackedSymbol, since: DateTime<Utc>) -> StoreResult<Vec<HourlyClose>> {
        let rows = sqlx::query_as::<_, HourlyClose>(
            "SELECT time, close_price FROM coin_details WHERE symbol = ? AND time >= ? ORDER BY time ASC",
        )
        .bind(symbol.pair())
        .bind(since)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
