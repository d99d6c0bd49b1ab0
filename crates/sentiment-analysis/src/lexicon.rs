//! VADER compound polarity for news text.

use vader_sentiment::SentimentIntensityAnalyzer;

pub struct PolarityScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl PolarityScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Normalized compound polarity in `[-1, 1]`.
    pub fn compound(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        self.analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }
}

impl Default for PolarityScorer {
    fn default() -> Self {
        Self::new()
    }
}
