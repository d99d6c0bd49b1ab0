use chrono::{DateTime, NaiveDate, Utc};
use market_core::{
    CoinDetail, InsightArticle, InsightCategory, NewsArticle, NewsSentiment, Recommendation,
    SentimentLabel, StoredForecast, TrackedSymbol,
};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

pub const FEEDBACK_MAX_LEN: usize = 255;

/// Exchange trading pair imported from the symbol list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CryptoSymbol {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feedback {
    pub id: i64,
    pub author: Option<String>,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackInput {
    #[serde(default)]
    pub author: Option<String>,
    pub feedback: String,
}

impl FeedbackInput {
    pub fn validate(&self) -> StoreResult<()> {
        let text = self.feedback.trim();
        if text.is_empty() {
            return Err(StoreError::Validation("feedback must not be empty".to_string()));
        }
        if text.chars().count() > FEEDBACK_MAX_LEN {
            return Err(StoreError::Validation(format!(
                "feedback must be at most {} characters",
                FEEDBACK_MAX_LEN
            )));
        }
        Ok(())
    }
}

/// One hourly close for the coin chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HourlyClose {
    pub time: DateTime<Utc>,
    pub close_price: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CoinDetailRow {
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

impl From<CoinDetailRow> for CoinDetail {
    fn from(r: CoinDetailRow) -> Self {
        CoinDetail {
            time: r.time,
            open_price: r.open_price,
            high_price: r.high_price,
            low_price: r.low_price,
            close_price: r.close_price,
            volume_from: r.volume_from,
            volume_to: r.volume_to,
            market_cap: r.market_cap,
            supply: r.supply,
            max_supply: r.max_supply,
            circulating_supply: r.circulating_supply,
            image_url: r.image_url,
            description: r.description,
            percent_change_24h: r.percent_change_24h,
            percent_change_7d: r.percent_change_7d,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ForecastRow {
    pub id: i64,
    pub symbol: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub predicted_price: f64,
    pub sentiment_label: String,
    pub recommendation: String,
    pub final_score: f64,
    pub summary: String,
    pub price_analysis: String,
    pub charts: String,
}

impl TryFrom<ForecastRow> for StoredForecast {
    type Error = StoreError;

    fn try_from(r: ForecastRow) -> Result<Self, Self::Error> {
        let symbol: TrackedSymbol = r
            .symbol
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown symbol '{}'", r.symbol)))?;
        Ok(StoredForecast {
            id: r.id,
            symbol,
            date: r.date,
            created_at: r.created_at,
            predicted_price: r.predicted_price,
            sentiment_label: parse_label(&r.sentiment_label)?,
            recommendation: parse_recommendation(&r.recommendation)?,
            final_score: r.final_score,
            summary: r.summary,
            price_analysis: serde_json::from_str(&r.price_analysis)?,
            charts: serde_json::from_str(&r.charts)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct NewsRow {
    pub title: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub sentiment: String,
    pub image: Option<String>,
    pub link: String,
    pub published_at: DateTime<Utc>,
}

impl From<NewsRow> for NewsArticle {
    fn from(r: NewsRow) -> Self {
        NewsArticle {
            title: r.title,
            description: r.description,
            summary: r.summary,
            sentiment: NewsSentiment::parse_lenient(&r.sentiment),
            image: r.image,
            link: r.link,
            published_at: r.published_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct InsightRow {
    pub title: String,
    pub link: String,
    pub date: Option<DateTime<Utc>>,
    pub source: String,
    pub image: Option<String>,
    pub category: String,
}

impl From<InsightRow> for InsightArticle {
    fn from(r: InsightRow) -> Self {
        InsightArticle {
            title: r.title,
            link: r.link,
            date: r.date,
            source: r.source,
            image: r.image,
            category: InsightCategory::find_in(&r.category),
        }
    }
}

fn parse_label(raw: &str) -> StoreResult<SentimentLabel> {
    match raw {
        "Positive" => Ok(SentimentLabel::Positive),
        "Neutral" => Ok(SentimentLabel::Neutral),
        "Negative" => Ok(SentimentLabel::Negative),
        other => Err(StoreError::Corrupt(format!("unknown sentiment label '{}'", other))),
    }
}

fn parse_recommendation(raw: &str) -> StoreResult<Recommendation> {
    match raw {
        "Buy" => Ok(Recommendation::Buy),
        "Hold" => Ok(Recommendation::Hold),
        "Sell" => Ok(Recommendation::Sell),
        other => Err(StoreError::Corrupt(format!("unknown recommendation '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_validation() {
        let ok = FeedbackInput { author: None, feedback: "Great charts".to_string() };
        assert!(ok.validate().is_ok());

        let empty = FeedbackInput { author: None, feedback: "   ".to_string() };
        assert!(matches!(empty.validate(), Err(StoreError::Validation(_))));

        let long = FeedbackInput { author: None, feedback: "x".repeat(256) };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!(parse_label("Positive").unwrap(), SentimentLabel::Positive);
        assert!(parse_label("positive").is_err());
        assert_eq!(parse_recommendation("Sell").unwrap(), Recommendation::Sell);
    }
}
