use chrono::{NaiveDate, Utc};
use coin_store::CoinStore;
use forecast_engine::{ForecastEngine, ScalerFit};
use market_core::{ForecastHorizon, ForecastReport, MarketError, MarketResult, PricePoint, TrackedSymbol};
use response_cache::{ttl, CacheKey, ResponseCache};
use tracing::info;

use crate::analysis::AnalysisService;
use crate::history::HistorySource;

/// Days forecast by the scheduled job.
pub const BATCH_HORIZON: usize = 14;

/// Share of the most recent history the on-demand scaler is fit on.
pub const ON_DEMAND_FIT_FRACTION: f64 = 0.2;

/// Forecast engine plus analysis, behind the response cache.
pub struct PredictionPipeline {
    engine: ForecastEngine,
    analysis: AnalysisService,
    cache: ResponseCache,
}

impl PredictionPipeline {
    pub fn new(engine: ForecastEngine, analysis: AnalysisService, cache: ResponseCache) -> Self {
        Self {
            engine,
            analysis,
            cache,
        }
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    /// Forecast `horizon` days after `history` and analyze the result.
    pub async fn forecast(
        &self,
        symbol: TrackedSymbol,
        history: &[PricePoint],
        horizon: usize,
        fit: ScalerFit,
        today: NaiveDate,
    ) -> MarketResult<ForecastReport> {
        let run = self.engine.run(history, horizon, fit).await?;
        let analysis = self.analysis.analyze(symbol, today, &run.predictions).await;

        Ok(ForecastReport {
            symbol,
            generated_on: today,
            horizon,
            sentiment_label: analysis.verdict.label,
            sentiment_score: analysis.verdict.score,
            recommendation: analysis.verdict.recommendation,
            final_score: analysis.verdict.final_score,
            price_analysis: analysis.price_analysis,
            summary: analysis.summary,
            charts: run.charts,
            predictions: run.predictions,
        })
    }

    /// On-demand forecast from live history, cached per symbol, horizon and day.
    pub async fn forecast_on_demand(
        &self,
        source: &dyn HistorySource,
        symbol: TrackedSymbol,
        horizon: ForecastHorizon,
    ) -> MarketResult<ForecastReport> {
        let today = Utc::now().date_naive();
        let key = CacheKey::new("prediction")
            .part(symbol)
            .part(horizon.days())
            .part(today);

        self.cache
            .get_or_compute(&key, ttl::PREDICTION, || async {
                let history = source.daily_closes(symbol).await?;
                self.forecast(
                    symbol,
                    &history,
                    horizon.days(),
                    ScalerFit::RecentFraction(ON_DEMAND_FIT_FRACTION),
                    today,
                )
                .await
            })
            .await
    }

    /// Forecast from stored candles and persist one row per day.
    pub async fn batch_forecast(&self, store: &CoinStore, symbol: TrackedSymbol) -> MarketResult<ForecastReport> {
        let history = store.daily_closes(symbol).await?;

        // strictly more than window + horizon points
        let needed = self.engine.window() + BATCH_HORIZON + 1;
        if history.len() < needed {
            return Err(MarketError::InsufficientHistory {
                needed,
                got: history.len(),
            });
        }

        let today = Utc::now().date_naive();
        let report = self
            .forecast(symbol, &history, BATCH_HORIZON, ScalerFit::FullHistory, today)
            .await?;
        store.save_forecast(&report).await?;

        info!(
            "Stored {}-day forecast for {} ({}, score {:.2})",
            BATCH_HORIZON, symbol, report.recommendation, report.final_score
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use forecast_engine::{ForecastConfig, LinearWindowModel};
    use market_core::{Candle, Headline, NewsSource, TextGenerator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const WINDOW: usize = 5;

    struct Offline;

    #[async_trait]
    impl TextGenerator for Offline {
        async fn complete(&self, _system: Option<&str>, _prompt: &str) -> MarketResult<String> {
            Err(MarketError::UpstreamUnavailable("offline".to_string()))
        }
    }

    #[async_trait]
    impl NewsSource for Offline {
        async fn headlines(&self, _query: &str, _limit: usize) -> MarketResult<Vec<Headline>> {
            Ok(Vec::new())
        }
    }

    struct CountingHistory {
        points: Vec<PricePoint>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HistorySource for CountingHistory {
        async fn daily_closes(&self, _symbol: TrackedSymbol) -> MarketResult<Vec<PricePoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.points.clone())
        }
    }

    fn series(n: usize) -> Vec<PricePoint> {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| PricePoint {
                timestamp: start + Duration::days(i as i64),
                close: 100.0 + (i as f64 * 0.7).sin() * 10.0 + i as f64 * 0.1,
            })
            .collect()
    }

    fn pipeline() -> PredictionPipeline {
        let model = Arc::new(LinearWindowModel::naive(WINDOW).unwrap());
        let engine = ForecastEngine::new(model, &ForecastConfig { window: WINDOW }).unwrap();
        let cache = ResponseCache::in_memory();
        let analysis = AnalysisService::new(Arc::new(Offline), Arc::new(Offline), cache.clone());
        PredictionPipeline::new(engine, analysis, cache)
    }

    #[tokio::test]
    async fn test_forecast_builds_report() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let report = pipeline()
            .forecast(TrackedSymbol::Btc, &series(40), 7, ScalerFit::FullHistory, today)
            .await
            .unwrap();

        assert_eq!(report.predictions.len(), 7);
        assert_eq!(report.horizon, 7);
        assert_eq!(report.price_analysis.days.len(), 7);
        assert_eq!(report.charts.history.len(), 40);
        assert_eq!(report.charts.backtest.len(), 40 - WINDOW);
        assert!(report.predictions.iter().all(|p| p.is_finite()));
    }

    #[tokio::test]
    async fn test_on_demand_is_cached() {
        let pipeline = pipeline();
        let source = CountingHistory {
            points: series(60),
            calls: AtomicUsize::new(0),
        };

        let a = pipeline
            .forecast_on_demand(&source, TrackedSymbol::Eth, ForecastHorizon::Two)
            .await
            .unwrap();
        let b = pipeline
            .forecast_on_demand(&source, TrackedSymbol::Eth, ForecastHorizon::Two)
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        pipeline
            .forecast_on_demand(&source, TrackedSymbol::Eth, ForecastHorizon::Seven)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_on_demand_short_history_rejected() {
        let source = CountingHistory {
            points: series(WINDOW + 1),
            calls: AtomicUsize::new(0),
        };
        let err = pipeline()
            .forecast_on_demand(&source, TrackedSymbol::Eth, ForecastHorizon::Fourteen)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InsufficientHistory { .. }));
    }

    #[tokio::test]
    async fn test_batch_forecast_persists_rows() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        let candles: Vec<Candle> = series(WINDOW + BATCH_HORIZON + 5)
            .into_iter()
            .map(|p| Candle {
                timestamp: p.timestamp,
                open: p.close,
                high: p.close,
                low: p.close,
                close: p.close,
                volume: 1.0,
                close_time: p.timestamp.timestamp_millis(),
                quote_asset_volume: 1.0,
                num_trades: 1,
                taker_buy_base_vol: 0.0,
                taker_buy_quote_vol: 0.0,
            })
            .collect();
        store.upsert_candles(TrackedSymbol::Ada, &candles).await.unwrap();

        let report = pipeline().batch_forecast(&store, TrackedSymbol::Ada).await.unwrap();
        assert_eq!(report.predictions.len(), BATCH_HORIZON);

        let rows = store.latest_forecasts(TrackedSymbol::Ada, 14).await.unwrap();
        assert_eq!(rows.len(), BATCH_HORIZON);
    }

    #[tokio::test]
    async fn test_batch_forecast_needs_more_than_window_plus_horizon() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        let err = pipeline().batch_forecast(&store, TrackedSymbol::Ada).await.unwrap_err();
        assert!(matches!(
            err,
            MarketError::InsufficientHistory { needed, got: 0 } if needed == WINDOW + BATCH_HORIZON + 1
        ));
    }
}
