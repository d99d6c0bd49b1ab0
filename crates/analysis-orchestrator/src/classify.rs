//! Per-article classification through the text generator.

use market_core::{InsightCategory, MarketResult, NewsSentiment, TextGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const NEWS_SYSTEM_PROMPT: &str = "You are a sentiment analysis and summarization bot. \
Return JSON: {\"sentiment\": \"Good|Neutral|Bad\", \"summary\": \"30 to 40 word summary\"}";

const NO_SUMMARY: &str = "No summary provided.";
const UNPARSABLE: &str = "Could not summarize.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsClassification {
    pub sentiment: NewsSentiment,
    pub summary: String,
}

/// Sentiment and a short summary for one article.
///
/// A reply that is not JSON becomes `Neutral` with a placeholder summary;
/// only a failed generator call is an error.
pub async fn classify_news(generator: &dyn TextGenerator, text: &str) -> MarketResult<NewsClassification> {
    let prompt = format!("{}\n\nAnalyze and summarize:", text);
    let reply = generator.complete(Some(NEWS_SYSTEM_PROMPT), &prompt).await?;
    Ok(parse_news_classification(&reply))
}

pub fn parse_news_classification(reply: &str) -> NewsClassification {
    let Ok(parsed) = serde_json::from_str::<Value>(strip_fences(reply)) else {
        return NewsClassification {
            sentiment: NewsSentiment::Neutral,
            summary: UNPARSABLE.to_string(),
        };
    };

    let sentiment = parsed
        .get("sentiment")
        .and_then(Value::as_str)
        .map(NewsSentiment::parse_lenient)
        .unwrap_or(NewsSentiment::Neutral);
    let summary = parsed
        .get("summary")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(NO_SUMMARY)
        .trim()
        .to_string();

    NewsClassification { sentiment, summary }
}

/// Topic of an insight article; anything unrecognized is `General`.
pub async fn classify_insight(generator: &dyn TextGenerator, title: &str, body: &str) -> MarketResult<InsightCategory> {
    let categories: Vec<&str> = InsightCategory::ALL.iter().map(|c| c.as_str()).collect();
    let prompt = format!(
        "Classify the following crypto news article into one of these categories: {}.\n\n\
         Title: {}\n\nContent: {}\n\nCategory:",
        categories.join(", "),
        title,
        body
    );
    let reply = generator.complete(None, &prompt).await?;
    Ok(InsightCategory::find_in(&reply))
}

/// Drop a surrounding markdown code fence, if any.
pub(crate) fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
