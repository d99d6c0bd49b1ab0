use std::collections::VecDeque;
use std::sync::Arc;

use market_core::{
    BacktestPoint, ChartArtifacts, MarketError, MarketResult, PriceModel, PricePoint,
};
use tracing::debug;

use crate::scaler::MinMaxScaler;
use crate::window::sliding_windows;

pub const DEFAULT_WINDOW: usize = 100;

#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub window: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl ForecastConfig {
    pub fn from_env() -> Self {
        let window = std::env::var("FORECAST_WINDOW")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_WINDOW);
        Self { window }
    }
}

/// Which part of the history the scaler is fit on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalerFit {
    /// Fit on the whole series (batch job).
    FullHistory,
    /// Fit on the most recent fraction of the series; the back-test runs on
    /// that slice only (on-demand endpoint uses `0.2`).
    RecentFraction(f64),
}

/// Forecast plus the diagnostics that produced it.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub predictions: Vec<f64>,
    pub charts: ChartArtifacts,
    pub scaler: MinMaxScaler,
}

pub struct ForecastEngine {
    model: Arc<dyn PriceModel>,
    window: usize,
}

impl ForecastEngine {
    pub fn new(model: Arc<dyn PriceModel>, config: &ForecastConfig) -> MarketResult<Self> {
        if model.window_size() != config.window {
            return Err(MarketError::Model(format!(
                "model '{}' expects window {}, configured window is {}",
                model.name(),
                model.window_size(),
                config.window
            )));
        }
        Ok(Self {
            model,
            window: config.window,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    fn check_history(&self, len: usize, horizon: usize) -> MarketResult<()> {
        if horizon == 0 {
            return Err(MarketError::Validation("forecast horizon must be positive".to_string()));
        }
        if len == 0 {
            return Err(MarketError::NoData("no price history".to_string()));
        }
        let needed = self.window + horizon;
        if len < needed {
            return Err(MarketError::InsufficientHistory { needed, got: len });
        }
        Ok(())
    }

    /// Forecast `horizon` future closes with the scaler fit on `closes`.
    pub async fn forecast(&self, closes: &[f64], horizon: usize) -> MarketResult<Vec<f64>> {
        self.check_history(closes.len(), horizon)?;
        let scaler = MinMaxScaler::fit(closes)?;
        self.roll_forward(&scaler, closes, horizon).await
    }

    /// Seed with the last `window` scaled closes and feed each prediction back in.
    async fn roll_forward(
        &self,
        scaler: &MinMaxScaler,
        closes: &[f64],
        horizon: usize,
    ) -> MarketResult<Vec<f64>> {
        let seed = &closes[closes.len() - self.window..];
        let mut window: VecDeque<f64> = scaler.transform_all(seed).into();
        let mut out = Vec::with_capacity(horizon);

        for step in 0..horizon {
            let input: Vec<f64> = window.iter().copied().collect();
            let next = self.model.predict(&input).await?;
            if !next.is_finite() {
                return Err(MarketError::Model(format!(
                    "model '{}' returned a non-finite value at step {}",
                    self.model.name(),
                    step + 1
                )));
            }
            out.push(scaler.inverse(next));
            window.pop_front();
            window.push_back(next);
        }

        Ok(out)
    }

    /// Rebuild every `window -> next` pair over `history` and score it.
    pub async fn backtest(
        &self,
        scaler: &MinMaxScaler,
        history: &[PricePoint],
    ) -> MarketResult<Vec<BacktestPoint>> {
        let closes: Vec<f64> = history.iter().map(|p| p.close).collect();
        let set = sliding_windows(&scaler.transform_all(&closes), self.window);
        if set.is_empty() {
            return Ok(Vec::new());
        }

        let predicted = self.model.predict_batch(&set.inputs).await?;
        if predicted.len() != set.len() {
            return Err(MarketError::Model(format!(
                "model returned {} predictions for {} windows",
                predicted.len(),
                set.len()
            )));
        }

        let mut points = Vec::with_capacity(set.len());
        for (i, (target, pred)) in set.targets.iter().zip(&predicted).enumerate() {
            if !pred.is_finite() {
                return Err(MarketError::Model("back-test produced a non-finite value".to_string()));
            }
            points.push(BacktestPoint {
                timestamp: Some(history[self.window + i].timestamp),
                actual: scaler.inverse(*target),
                predicted: scaler.inverse(*pred),
            });
        }
        Ok(points)
    }

    /// Back-test and forecast a dated history in one pass.
    pub async fn run(
        &self,
        history: &[PricePoint],
        horizon: usize,
        fit: ScalerFit,
    ) -> MarketResult<ForecastRun> {
        self.check_history(history.len(), horizon)?;

        let fit_slice = match fit {
            ScalerFit::FullHistory => history,
            ScalerFit::RecentFraction(fraction) => {
                let fraction = fraction.clamp(f64::EPSILON, 1.0);
                let start = (history.len() as f64 * (1.0 - fraction)) as usize;
                &history[start.min(history.len() - 1)..]
            }
        };

        let fit_closes: Vec<f64> = fit_slice.iter().map(|p| p.close).collect();
        let scaler = MinMaxScaler::fit(&fit_closes)?;

        let backtest = self.backtest(&scaler, fit_slice).await?;
        if backtest.is_empty() {
            return Err(MarketError::InsufficientHistory {
                needed: self.window + 1,
                got: fit_slice.len(),
            });
        }

        let closes: Vec<f64> = history.iter().map(|p| p.close).collect();
        let predictions = self.roll_forward(&scaler, &closes, horizon).await?;

        debug!(
            "Forecast with '{}': {} history points, {} back-test points, horizon {}",
            self.model.name(),
            history.len(),
            backtest.len(),
            horizon
        );

        Ok(ForecastRun {
            predictions,
            charts: ChartArtifacts {
                history: history.to_vec(),
                backtest,
            },
            scaler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearWindowModel;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    /// Extends the window's average step.
    struct Drift {
        window: usize,
    }

    #[async_trait]
    impl PriceModel for Drift {
        fn name(&self) -> &str {
            "drift"
        }

        fn window_size(&self) -> usize {
            self.window
        }

        async fn predict(&self, window: &[f64]) -> MarketResult<f64> {
            let first = window[0];
            let last = window[window.len() - 1];
            Ok(last + (last - first) / (window.len() - 1) as f64)
        }
    }

    struct Broken;

    #[async_trait]
    impl PriceModel for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn window_size(&self) -> usize {
            5
        }

        async fn predict(&self, _window: &[f64]) -> MarketResult<f64> {
            Ok(f64::NAN)
        }
    }

    fn engine(model: Arc<dyn PriceModel>, window: usize) -> ForecastEngine {
        ForecastEngine::new(model, &ForecastConfig { window }).unwrap()
    }

    fn history(closes: &[f64]) -> Vec<PricePoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint {
                timestamp: start + Duration::days(i as i64),
                close: *c,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_forecast_returns_exactly_horizon_finite_values() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let engine = engine(Arc::new(Drift { window: 10 }), 10);

        let out = engine.forecast(&closes, 14).await.unwrap();
        assert_eq!(out.len(), 14);
        assert!(out.iter().all(|v| v.is_finite()));
        // linear trend continues one unit per day on the original scale
        assert!((out[0] - 130.0).abs() < 1e-9);
        assert!((out[13] - 143.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_forecast_is_deterministic() {
        let closes: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin() * 10.0 + 50.0).collect();
        let engine = engine(Arc::new(Drift { window: 8 }), 8);
        let a = engine.forecast(&closes, 7).await.unwrap();
        let b = engine.forecast(&closes, 7).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_insufficient_history_rejected() {
        let engine = engine(Arc::new(LinearWindowModel::naive(10).unwrap()), 10);
        let err = engine.forecast(&[1.0; 11], 2).await.unwrap_err();
        assert!(matches!(err, MarketError::InsufficientHistory { needed: 12, got: 11 }));

        let err = engine.forecast(&[], 2).await.unwrap_err();
        assert!(matches!(err, MarketError::NoData(_)));
    }

    #[tokio::test]
    async fn test_exact_minimum_history_accepted() {
        let engine = engine(Arc::new(LinearWindowModel::naive(10).unwrap()), 10);
        let closes: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let out = engine.forecast(&closes, 2).await.unwrap();
        assert_eq!(out, vec![11.0, 11.0]);
    }

    #[tokio::test]
    async fn test_non_finite_model_output_is_error() {
        let engine = engine(Arc::new(Broken), 5);
        let err = engine.forecast(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 2).await.unwrap_err();
        assert!(matches!(err, MarketError::Model(_)));
    }

    #[test]
    fn test_window_mismatch_rejected_at_construction() {
        let model = Arc::new(LinearWindowModel::naive(50).unwrap());
        assert!(ForecastEngine::new(model, &ForecastConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_run_full_history_backtest_length() {
        let closes: Vec<f64> = (0..25).map(|i| 10.0 + i as f64).collect();
        let engine = engine(Arc::new(Drift { window: 5 }), 5);
        let run = engine.run(&history(&closes), 3, ScalerFit::FullHistory).await.unwrap();

        assert_eq!(run.predictions.len(), 3);
        assert_eq!(run.charts.history.len(), 25);
        assert_eq!(run.charts.backtest.len(), 20);
        let first = run.charts.backtest[0];
        assert!((first.actual - 15.0).abs() < 1e-9);
        assert!((first.predicted - 15.0).abs() < 1e-9);
        assert_eq!(first.timestamp, Some(run.charts.history[5].timestamp));
    }

    #[tokio::test]
    async fn test_run_recent_fraction_fits_on_slice() {
        let closes: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let engine = engine(Arc::new(Drift { window: 5 }), 5);
        let run = engine
            .run(&history(&closes), 2, ScalerFit::RecentFraction(0.2))
            .await
            .unwrap();

        // last 10 points: 40..=49
        assert_eq!(run.scaler.min(), 40.0);
        assert_eq!(run.scaler.max(), 49.0);
        assert_eq!(run.charts.backtest.len(), 5);
        assert!((run.predictions[0] - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_run_recent_slice_too_short() {
        let closes: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let engine = engine(Arc::new(Drift { window: 5 }), 5);
        let err = engine
            .run(&history(&closes), 2, ScalerFit::RecentFraction(0.2))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InsufficientHistory { .. }));
    }
}
