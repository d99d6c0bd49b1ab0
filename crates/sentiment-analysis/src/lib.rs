use market_core::{Recommendation, SentimentLabel};
use serde::{Deserialize, Serialize};

pub mod explain;
pub mod lexicon;

pub use explain::{
    fallback_day_analysis, fallback_explanations, fallback_news_summary, fallback_outlook,
};
pub use lexicon::PolarityScorer;

const LABEL_THRESHOLD: f64 = 0.1;
const RECOMMENDATION_THRESHOLD: f64 = 0.2;

/// Sentiment and recommendation for one forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: SentimentLabel,
    pub score: f64,
    pub recommendation: Recommendation,
    pub final_score: f64,
}

/// Maps an average polarity to a label: above 0.1 positive, below -0.1 negative.
pub fn sentiment_label(score: f64) -> SentimentLabel {
    if score > LABEL_THRESHOLD {
        SentimentLabel::Positive
    } else if score < -LABEL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Buy only when sentiment and forecast both point up, Sell only when both point down.
pub fn recommend(sentiment: f64, price_delta: f64) -> Recommendation {
    if sentiment > RECOMMENDATION_THRESHOLD && price_delta > 0.0 {
        Recommendation::Buy
    } else if sentiment < -RECOMMENDATION_THRESHOLD && price_delta < 0.0 {
        Recommendation::Sell
    } else {
        Recommendation::Hold
    }
}

/// Mean of the sentiment scaled to 0..100 and a direction score (100 rising, 50 otherwise),
/// rounded to two decimals.
pub fn final_score(sentiment: f64, price_delta: f64) -> f64 {
    let sentiment_score = (sentiment + 1.0) * 50.0;
    let price_score = if price_delta > 0.0 { 100.0 } else { 50.0 };
    ((sentiment_score + price_score) / 2.0 * 100.0).round() / 100.0
}

pub struct SentimentAnalysisEngine {
    scorer: PolarityScorer,
}

impl SentimentAnalysisEngine {
    pub fn new() -> Self {
        Self {
            scorer: PolarityScorer::new(),
        }
    }

    /// Average compound polarity over `texts`; no texts reads as Neutral 0.0.
    pub fn average_polarity<S: AsRef<str>>(&self, texts: &[S]) -> (SentimentLabel, f64) {
        if texts.is_empty() {
            return (SentimentLabel::Neutral, 0.0);
        }
        let total: f64 = texts.iter().map(|t| self.scorer.compound(t.as_ref())).sum();
        let avg = total / texts.len() as f64;
        (sentiment_label(avg), avg)
    }

    /// Combine news polarity with a forecast series.
    ///
    /// With fewer than two forecast values there is no direction, so the result
    /// is Hold with a score of 50.
    pub fn evaluate(&self, sentiment: f64, predictions: &[f64]) -> Verdict {
        let label = sentiment_label(sentiment);
        let (first, last) = match (predictions.first(), predictions.last()) {
            (Some(first), Some(last)) if predictions.len() >= 2 => (*first, *last),
            _ => {
                return Verdict {
                    label,
                    score: sentiment,
                    recommendation: Recommendation::Hold,
                    final_score: 50.0,
                }
            }
        };

        let delta = last - first;
        Verdict {
            label,
            score: sentiment,
            recommendation: recommend(sentiment, delta),
            final_score: final_score(sentiment, delta),
        }
    }
}

impl Default for SentimentAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_thresholds() {
        assert_eq!(sentiment_label(0.11), SentimentLabel::Positive);
        assert_eq!(sentiment_label(0.1), SentimentLabel::Neutral);
        assert_eq!(sentiment_label(-0.1), SentimentLabel::Neutral);
        assert_eq!(sentiment_label(-0.5), SentimentLabel::Negative);
    }

    #[test]
    fn test_recommendation_mapping() {
        assert_eq!(recommend(0.25, 5.0), Recommendation::Buy);
        assert_eq!(recommend(-0.3, -5.0), Recommendation::Sell);
        assert_eq!(recommend(0.0, 5.0), Recommendation::Hold);
        assert_eq!(recommend(0.25, -5.0), Recommendation::Hold);
        assert_eq!(recommend(0.2, 5.0), Recommendation::Hold);
    }

    #[test]
    fn test_final_score() {
        assert_eq!(final_score(0.0, 5.0), 75.0);
        assert_eq!(final_score(0.0, -5.0), 50.0);
        assert_eq!(final_score(1.0, 1.0), 100.0);
        assert_eq!(final_score(0.5, 1.0), 87.5);
        assert_eq!(final_score(-0.5, -1.0), 37.5);
    }

    #[test]
    fn test_evaluate_short_forecast_holds() {
        let engine = SentimentAnalysisEngine::new();
        let v = engine.evaluate(0.9, &[100.0]);
        assert_eq!(v.label, SentimentLabel::Positive);
        assert_eq!(v.recommendation, Recommendation::Hold);
        assert_eq!(v.final_score, 50.0);
    }

    #[test]
    fn test_evaluate_uses_first_and_last() {
        let engine = SentimentAnalysisEngine::new();
        let v = engine.evaluate(0.3, &[100.0, 90.0, 101.0]);
        assert_eq!(v.recommendation, Recommendation::Buy);
        assert_eq!(v.final_score, 82.5);
    }

    #[test]
    fn test_average_polarity() {
        let engine = SentimentAnalysisEngine::new();
        let empty: [&str; 0] = [];
        assert_eq!(engine.average_polarity(&empty), (SentimentLabel::Neutral, 0.0));

        let (label, score) = engine.average_polarity(&["Bitcoin holders are happy", "ETH upgrade brings strong gains"]);
        assert_eq!(label, SentimentLabel::Positive);
        assert!(score > 0.1);
    }
}
