use chrono::{Duration, Utc};
use market_core::{latest_per_date, ForecastReport, StoredForecast, TrackedSymbol};

use crate::db::CoinStore;
use crate::error::{StoreError, StoreResult};
use crate::models::ForecastRow;

impl CoinStore {
    /// Persist a report as one row per predicted day, dated from `generated_on`.
    ///
    /// All rows of one report share `created_at`, so readers can tell
    /// generations apart. Returns the new row ids in day order.
    pub async fn save_forecast(&self, report: &ForecastReport) -> StoreResult<Vec<i64>> {
        if report.predictions.is_empty() {
            return Err(StoreError::Validation("forecast has no predictions".to_string()));
        }

        let created_at = Utc::now();
        let price_analysis = serde_json::to_string(&report.price_analysis)?;
        let charts = serde_json::to_string(&report.charts)?;
        let pair = report.symbol.pair();

        let mut tx = self.pool().begin().await?;
        let mut ids = Vec::with_capacity(report.predictions.len());

        for (idx, price) in report.predictions.iter().enumerate() {
            let date = report.generated_on + Duration::days(idx as i64);
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO forecasts (symbol, date, created_at, predicted_price, sentiment_label,
                                       recommendation, final_score, summary, price_analysis, charts)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(&pair)
            .bind(date)
            .bind(created_at)
            .bind(price)
            .bind(report.sentiment_label.as_str())
            .bind(report.recommendation.as_str())
            .bind(report.final_score)
            .bind(&report.summary)
            .bind(&price_analysis)
            .bind(&charts)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        tracing::info!("Saved {} forecast rows for {}", ids.len(), report.symbol);
        Ok(ids)
    }

    pub async fn forecasts_for(&self, symbol: TrackedSymbol) -> StoreResult<Vec<StoredForecast>> {
        let rows = sqlx::query_as::<_, ForecastRow>(
            "SELECT * FROM forecasts WHERE symbol = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(symbol.pair())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(StoredForecast::try_from).collect()
    }

    /// The newest forecast per date, newest date first, at most `limit` dates.
    pub async fn latest_forecasts(&self, symbol: TrackedSymbol, limit: usize) -> StoreResult<Vec<StoredForecast>> {
        let rows = self.forecasts_for(symbol).await?;
        Ok(latest_per_date(rows, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use market_core::{ChartArtifacts, PriceAnalysis, Recommendation, SentimentLabel};

    fn report(on: NaiveDate, predictions: Vec<f64>) -> ForecastReport {
        ForecastReport {
            symbol: TrackedSymbol::Eth,
            generated_on: on,
            horizon: predictions.len(),
            predictions,
            sentiment_label: SentimentLabel::Positive,
            sentiment_score: 0.4,
            recommendation: Recommendation::Buy,
            final_score: 85.0,
            price_analysis: PriceAnalysis {
                days: Vec::new(),
                summary: "steady".to_string(),
                generated: false,
            },
            summary: "ETH news".to_string(),
            charts: ChartArtifacts::default(),
        }
    }

    #[tokio::test]
    async fn test_save_one_row_per_day() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        let on = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let ids = store.save_forecast(&report(on, vec![10.0, 11.0, 12.0])).await.unwrap();
        assert_eq!(ids.len(), 3);

        let rows = store.latest_forecasts(TrackedSymbol::Eth, 14).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());
        assert_eq!(rows[0].predicted_price, 12.0);
        assert_eq!(rows[2].recommendation, Recommendation::Buy);
        assert_eq!(rows[2].price_analysis["summary"], "steady");
    }

    #[tokio::test]
    async fn test_newer_generation_wins_per_date() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        let day1 = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        store.save_forecast(&report(day1, vec![10.0, 11.0])).await.unwrap();
        store.save_forecast(&report(day2, vec![20.0, 21.0])).await.unwrap();

        let rows = store.latest_forecasts(TrackedSymbol::Eth, 14).await.unwrap();
        let prices: Vec<f64> = rows.iter().map(|r| r.predicted_price).collect();
        assert_eq!(prices, vec![21.0, 20.0, 10.0]);
    }

    #[tokio::test]
    async fn test_empty_report_rejected() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        let on = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(matches!(
            store.save_forecast(&report(on, vec![])).await,
            Err(StoreError::Validation(_))
        ));
        assert!(store.latest_forecasts(TrackedSymbol::Eth, 14).await.unwrap().is_empty());
    }
}
