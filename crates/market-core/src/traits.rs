use async_trait::async_trait;

use crate::{Headline, MarketResult};

/// A trained next-step price model.
///
/// Takes the last `window_size()` normalized closes and returns the next
/// normalized value. Implementations must be safe to share across tasks.
#[async_trait]
pub trait PriceModel: Send + Sync {
    fn name(&self) -> &str;

    fn window_size(&self) -> usize;

    async fn predict(&self, window: &[f64]) -> MarketResult<f64>;

    /// Score many windows. The default calls `predict` once per window.
    async fn predict_batch(&self, windows: &[Vec<f64>]) -> MarketResult<Vec<f64>> {
        let mut out = Vec::with_capacity(windows.len());
        for w in windows {
            out.push(self.predict(w).await?);
        }
        Ok(out)
    }
}

/// Free-text generation backend (chat completion style).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> MarketResult<String>;
}

/// Search over recent news headlines.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn headlines(&self, query: &str, limit: usize) -> MarketResult<Vec<Headline>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LastValue;

    #[async_trait]
    impl PriceModel for LastValue {
        fn name(&self) -> &str {
            "last-value"
        }

        fn window_size(&self) -> usize {
            3
        }

        async fn predict(&self, window: &[f64]) -> MarketResult<f64> {
            Ok(*window.last().unwrap_or(&0.0))
        }
    }

    #[tokio::test]
    async fn test_default_batch_uses_predict() {
        let model = LastValue;
        let out = model
            .predict_batch(&[vec![0.1, 0.2, 0.3], vec![0.5, 0.4, 0.9]])
            .await
            .unwrap();
        assert_eq!(out, vec![0.3, 0.9]);
    }
}
