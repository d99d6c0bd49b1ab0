//! Sentiment, recommendation and narrative for one forecast.

use std::convert::Infallible;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use market_core::{
    DayAnalysis, Headline, MarketError, MarketResult, NewsSource, PriceAnalysis, Recommendation,
    SentimentLabel, TextGenerator, TrackedSymbol, Trend,
};
use response_cache::{ttl, CacheKey, ResponseCache};
use sentiment_analysis::{
    fallback_day_analysis, fallback_news_summary, fallback_outlook, SentimentAnalysisEngine, Verdict,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::strip_fences;

const NEWS_LIMIT: usize = 20;
const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert crypto analyst who summarizes crypto news.";

/// Everything the analysis layer adds on top of a forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAnalysis {
    pub verdict: Verdict,
    pub price_analysis: PriceAnalysis,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NewsAssessment {
    verdict: Verdict,
    summary: String,
}

pub struct AnalysisService {
    generator: Arc<dyn TextGenerator>,
    news: Arc<dyn NewsSource>,
    cache: ResponseCache,
    sentiment: SentimentAnalysisEngine,
}

impl AnalysisService {
    pub fn new(generator: Arc<dyn TextGenerator>, news: Arc<dyn NewsSource>, cache: ResponseCache) -> Self {
        Self {
            generator,
            news,
            cache,
            sentiment: SentimentAnalysisEngine::new(),
        }
    }

    /// Analyze `predictions`, the first of which is for `start`.
    pub async fn analyze(&self, symbol: TrackedSymbol, start: NaiveDate, predictions: &[f64]) -> ForecastAnalysis {
        let sentiment = self.sentiment(symbol, predictions).await;
        let price_analysis = self.price_analysis(symbol, start, predictions).await;

        ForecastAnalysis {
            verdict: sentiment.verdict,
            price_analysis,
            summary: sentiment.summary,
        }
    }

    /// Verdict and news summary, memoized per symbol and forecast series.
    async fn sentiment(&self, symbol: TrackedSymbol, predictions: &[f64]) -> NewsAssessment {
        let key = match CacheKey::new("sentiment").part(symbol).hashed(predictions) {
            Ok(key) => key,
            Err(e) => {
                warn!("Could not build sentiment cache key for {}: {}", symbol, e);
                return self.assess_news(symbol, predictions).await;
            }
        };

        let cached: Result<NewsAssessment, Infallible> = self
            .cache
            .get_or_compute(&key, ttl::ANALYSIS, || async {
                Ok(self.assess_news(symbol, predictions).await)
            })
            .await;

        match cached {
            Ok(assessment) => assessment,
            Err(never) => match never {},
        }
    }

    async fn assess_news(&self, symbol: TrackedSymbol, predictions: &[f64]) -> NewsAssessment {
        let headlines = self.recent_headlines(symbol).await;
        let texts: Vec<String> = headlines.iter().map(headline_text).collect();
        let (_, score) = self.sentiment.average_polarity(texts.as_slice());
        let verdict = self.sentiment.evaluate(score, predictions);
        let summary = self.news_summary(symbol, &texts, verdict.label, score).await;

        NewsAssessment { verdict, summary }
    }

    /// Headlines for the coin; a failed fetch counts as no news.
    async fn recent_headlines(&self, symbol: TrackedSymbol) -> Vec<Headline> {
        match self.news.headlines(symbol.coingecko_id(), NEWS_LIMIT).await {
            Ok(headlines) => headlines,
            Err(e) => {
                warn!("News fetch failed for {}: {}", symbol, e);
                Vec::new()
            }
        }
    }

    pub async fn news_summary(
        &self,
        symbol: TrackedSymbol,
        texts: &[String],
        label: SentimentLabel,
        score: f64,
    ) -> String {
        if texts.is_empty() {
            return fallback_news_summary(symbol.base(), label, score, 0);
        }

        let prompt = format!(
            "Summarize the following cryptocurrency-related news about {} into 100-200 words. \
             Highlight the main sentiment, market trends, and significant events:\n\n{}",
            symbol.coingecko_id(),
            texts.join("\n")
        );

        match self.generator.complete(Some(SUMMARY_SYSTEM_PROMPT), &prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                debug!("News summary fallback for {}: {}", symbol, e);
                fallback_news_summary(symbol.base(), label, score, texts.len())
            }
        }
    }

    /// Per-day trend, action and reason, plus an overall outlook.
    pub async fn price_analysis(&self, symbol: TrackedSymbol, start: NaiveDate, predictions: &[f64]) -> PriceAnalysis {
        let fallback = || PriceAnalysis {
            days: fallback_day_analysis(start, predictions),
            summary: fallback_outlook(&symbol.pair(), predictions),
            generated: false,
        };

        if predictions.is_empty() {
            return fallback();
        }

        let key = match CacheKey::new("price_analysis")
            .part(symbol)
            .part(start)
            .hashed(predictions)
        {
            Ok(key) => key,
            Err(e) => {
                warn!("Could not build analysis cache key for {}: {}", symbol, e);
                return fallback();
            }
        };

        let generated: MarketResult<PriceAnalysis> = self
            .cache
            .get_or_compute(&key, ttl::ANALYSIS, || async {
                let prompt = price_analysis_prompt(symbol, start, predictions);
                let reply = self.generator.complete(None, &prompt).await?;
                parse_price_analysis(&reply, symbol, start, predictions)
            })
            .await;

        generated.unwrap_or_else(|e| {
            debug!("Price analysis fallback for {}: {}", symbol, e);
            fallback()
        })
    }
}

fn headline_text(h: &Headline) -> String {
    format!("{} {}", h.title, h.description.as_deref().unwrap_or(""))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn price_analysis_prompt(symbol: TrackedSymbol, start: NaiveDate, predictions: &[f64]) -> String {
    let pairs: Vec<Value> = predictions
        .iter()
        .enumerate()
        .map(|(i, price)| {
            serde_json::json!({
                "date": (start + Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
                "price": round2(*price),
            })
        })
        .collect();
    let data = serde_json::to_string_pretty(&pairs).unwrap_or_default();

    format!(
        r#"You are an expert financial analyst.

Based on the following predicted prices for {coin}, provide an expert analysis for each day.
For each prediction, give:
- "date": the date of the prediction
- "predicted_price": the predicted price (as given)
- "trend": one of "Uptrend", "Downtrend", or "Sideways"
- "action": one of "Buy", "Hold", or "Sell"
- "reason": a short explanation why the model might be predicting this price based on recent trends, past data, or momentum (50-100 words)

At the end, return a final item:
{{"prediction_summary": "Summarize all predictions and give general advice."}}

Use only the following predicted prices:
{data}

Return the result as a valid JSON array. Do not include markdown or explanation."#,
        coin = symbol.pair(),
        data = data
    )
}

fn parse_trend(raw: &str) -> Option<Trend> {
    match raw.trim().to_lowercase().as_str() {
        "uptrend" => Some(Trend::Uptrend),
        "downtrend" => Some(Trend::Downtrend),
        "sideways" => Some(Trend::Sideways),
        _ => None,
    }
}

fn parse_action(raw: &str) -> Option<Recommendation> {
    match raw.trim().to_lowercase().as_str() {
        "buy" => Some(Recommendation::Buy),
        "hold" => Some(Recommendation::Hold),
        "sell" => Some(Recommendation::Sell),
        _ => None,
    }
}

/// Parse the generator's JSON array. Prices always come from the forecast,
/// never from the reply; one entry per forecast day is required.
pub fn parse_price_analysis(
    reply: &str,
    symbol: TrackedSymbol,
    start: NaiveDate,
    predictions: &[f64],
) -> MarketResult<PriceAnalysis> {
    let items: Vec<Value> = serde_json::from_str(strip_fences(reply))
        .map_err(|e| MarketError::MalformedResponse(format!("price analysis is not a JSON array: {}", e)))?;

    let mut days = Vec::with_capacity(predictions.len());
    let mut summary = None;

    for item in &items {
        if let Some(text) = item.get("prediction_summary").and_then(Value::as_str) {
            summary = Some(text.trim().to_string());
            continue;
        }
        let Some(price) = predictions.get(days.len()) else {
            break;
        };

        let field = |name: &str| item.get(name).and_then(Value::as_str);
        let trend = field("trend").and_then(parse_trend);
        let action = field("action").and_then(parse_action);
        let reason = field("reason").map(str::trim).filter(|r| !r.is_empty());

        let (Some(trend), Some(action), Some(reason)) = (trend, action, reason) else {
            return Err(MarketError::MalformedResponse(format!(
                "price analysis entry {} is incomplete",
                days.len() + 1
            )));
        };

        days.push(DayAnalysis {
            date: start + Duration::days(days.len() as i64),
            predicted_price: round2(*price),
            trend,
            action,
            reason: reason.to_string(),
        });
    }

    if days.len() != predictions.len() {
        return Err(MarketError::MalformedResponse(format!(
            "price analysis covers {} of {} days",
            days.len(),
            predictions.len()
        )));
    }

    Ok(PriceAnalysis {
        days,
        summary: summary.unwrap_or_else(|| fallback_outlook(&symbol.pair(), predictions)),
        generated: true,
    })
}
