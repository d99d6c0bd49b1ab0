use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{MarketError, TrackedSymbol};

/// Daily OHLCV candle from the exchange. Keyed by `timestamp` per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Candle close time in epoch milliseconds
    pub close_time: i64,
    pub quote_asset_volume: f64,
    pub num_trades: i64,
    pub taker_buy_base_vol: f64,
    pub taker_buy_quote_vol: f64,
}

/// Hourly market snapshot. Unique by `time` per symbol, append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub time: DateTime<Utc>,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub volume_from: Option<f64>,
    pub volume_to: Option<f64>,
    pub market_cap: Option<f64>,
    pub supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
}

/// Sentiment tag attached to a stored news article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsSentiment {
    Good,
    Neutral,
    Bad,
}

impl NewsSentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsSentiment::Good => "Good",
            NewsSentiment::Neutral => "Neutral",
            NewsSentiment::Bad => "Bad",
        }
    }

    /// Lenient parse of generated text; anything unrecognised is `Neutral`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "good" => NewsSentiment::Good,
            "bad" => NewsSentiment::Bad,
            _ => NewsSentiment::Neutral,
        }
    }
}

/// Crypto news article, unique by `link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub sentiment: NewsSentiment,
    pub image: Option<String>,
    pub link: String,
    pub published_at: DateTime<Utc>,
}

/// Raw headline from a news search, before any classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InsightCategory {
    Bitcoin,
    Ethereum,
    Solana,
    Altcoin,
    Multicoin,
    General,
}

impl InsightCategory {
    pub const ALL: [InsightCategory; 6] = [
        InsightCategory::Bitcoin,
        InsightCategory::Ethereum,
        InsightCategory::Solana,
        InsightCategory::Altcoin,
        InsightCategory::Multicoin,
        InsightCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsightCategory::Bitcoin => "BITCOIN",
            InsightCategory::Ethereum => "ETHEREUM",
            InsightCategory::Solana => "SOLANA",
            InsightCategory::Altcoin => "ALTCOIN",
            InsightCategory::Multicoin => "MULTICOIN",
            InsightCategory::General => "GENERAL",
        }
    }

    /// First category word found in free text, or `General`.
    pub fn find_in(text: &str) -> Self {
        let upper = text.to_uppercase();
        upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .find_map(|word| InsightCategory::ALL.iter().copied().find(|c| c.as_str() == word))
            .unwrap_or(InsightCategory::General)
    }
}

/// Insight article from the news aggregator, deduplicated by `(title, link)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightArticle {
    pub title: String,
    pub link: String,
    pub date: Option<DateTime<Utc>>,
    pub source: String,
    pub image: Option<String>,
    pub category: InsightCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

/// Forecast horizon in days. Only 2, 7 and 14 are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ForecastHorizon {
    Two,
    Seven,
    Fourteen,
}

impl ForecastHorizon {
    pub fn days(&self) -> usize {
        match self {
            ForecastHorizon::Two => 2,
            ForecastHorizon::Seven => 7,
            ForecastHorizon::Fourteen => 14,
        }
    }
}

impl Default for ForecastHorizon {
    fn default() -> Self {
        ForecastHorizon::Two
    }
}

impl TryFrom<u32> for ForecastHorizon {
    type Error = MarketError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            2 => Ok(ForecastHorizon::Two),
            7 => Ok(ForecastHorizon::Seven),
            14 => Ok(ForecastHorizon::Fourteen),
            _ => Err(MarketError::Validation("Days must be 2, 7, or 14.".to_string())),
        }
    }
}

impl From<ForecastHorizon> for u32 {
    fn from(h: ForecastHorizon) -> Self {
        h.days() as u32
    }
}

/// A single close price on the history chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// One step of the "actual vs predicted" diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestPoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub actual: f64,
    pub predicted: f64,
}

/// Chart data behind a forecast. Rendering is left to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifacts {
    pub history: Vec<PricePoint>,
    pub backtest: Vec<BacktestPoint>,
}

/// Per-day rationale for a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAnalysis {
    pub date: NaiveDate,
    pub predicted_price: f64,
    pub trend: Trend,
    pub action: Recommendation,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub days: Vec<DayAnalysis>,
    pub summary: String,
    /// `false` when the rule-based fallback produced the text
    pub generated: bool,
}

/// Full output of one prediction run for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub symbol: TrackedSymbol,
    pub generated_on: NaiveDate,
    pub horizon: usize,
    pub predictions: Vec<f64>,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f64,
    pub recommendation: Recommendation,
    pub final_score: f64,
    pub price_analysis: PriceAnalysis,
    pub summary: String,
    pub charts: ChartArtifacts,
}

/// Persisted forecast row: one per symbol, per predicted day, per generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredForecast {
    pub id: i64,
    pub symbol: TrackedSymbol,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub predicted_price: f64,
    pub sentiment_label: SentimentLabel,
    pub recommendation: Recommendation,
    pub final_score: f64,
    pub summary: String,
    pub price_analysis: serde_json::Value,
    pub charts: serde_json::Value,
}

/// Keep one forecast per date (the most recently created), newest date first,
/// at most `limit` dates.
pub fn latest_per_date(mut rows: Vec<StoredForecast>, limit: usize) -> Vec<StoredForecast> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let mut picked: Vec<StoredForecast> = Vec::new();
    for row in rows {
        if picked.len() == limit {
            break;
        }
        if !picked.iter().any(|p| p.date == row.date) {
            picked.push(row);
        }
    }

    picked.sort_by(|a, b| b.date.cmp(&a.date));
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored(id: i64, day: u32, created_min: u32, price: f64) -> StoredForecast {
        StoredForecast {
            id,
            symbol: TrackedSymbol::Btc,
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, created_min, 0).unwrap(),
            predicted_price: price,
            sentiment_label: SentimentLabel::Neutral,
            recommendation: Recommendation::Hold,
            final_score: 50.0,
            summary: String::new(),
            price_analysis: serde_json::json!({}),
            charts: serde_json::json!({}),
        }
    }

    #[test]
    fn test_horizon_accepts_only_enumerated_values() {
        assert_eq!(ForecastHorizon::try_from(2).unwrap().days(), 2);
        assert_eq!(ForecastHorizon::try_from(7).unwrap().days(), 7);
        assert_eq!(ForecastHorizon::try_from(14).unwrap().days(), 14);
        assert!(ForecastHorizon::try_from(3).is_err());
        assert!(ForecastHorizon::try_from(0).is_err());
        assert!(serde_json::from_str::<ForecastHorizon>("5").is_err());
        assert_eq!(serde_json::from_str::<ForecastHorizon>("7").unwrap(), ForecastHorizon::Seven);
    }

    #[test]
    fn test_latest_per_date_keeps_newest_generation() {
        let rows = vec![
            stored(1, 2, 0, 100.0),
            stored(2, 3, 0, 101.0),
            stored(3, 2, 30, 200.0),
            stored(4, 3, 30, 201.0),
        ];
        let picked = latest_per_date(rows, 14);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].date.to_string(), "2025-06-03");
        assert_eq!(picked[0].predicted_price, 201.0);
        assert_eq!(picked[1].predicted_price, 200.0);
    }

    #[test]
    fn test_latest_per_date_respects_limit() {
        let rows = (1..=10).map(|d| stored(d as i64, d, d, d as f64)).collect();
        let picked = latest_per_date(rows, 2);
        assert_eq!(picked.len(), 2);
        assert!(picked[0].date > picked[1].date);
    }

    #[test]
    fn test_insight_category_from_text() {
        assert_eq!(InsightCategory::find_in("Category: ethereum"), InsightCategory::Ethereum);
        assert_eq!(InsightCategory::find_in("  SOLANA."), InsightCategory::Solana);
        assert_eq!(InsightCategory::find_in("I think it's about stocks"), InsightCategory::General);
    }

    #[test]
    fn test_news_sentiment_lenient() {
        assert_eq!(NewsSentiment::parse_lenient("good"), NewsSentiment::Good);
        assert_eq!(NewsSentiment::parse_lenient("BAD"), NewsSentiment::Bad);
        assert_eq!(NewsSentiment::parse_lenient("mixed"), NewsSentiment::Neutral);
    }
}
