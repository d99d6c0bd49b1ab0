//! Scheduled fetch jobs: exchange candles, hourly coin details, news,
//! categorized insights, the exchange symbol list and the batch forecast.
//!
//! Every job walks its items independently; one failed symbol or article is
//! logged and skipped, never fatal to the batch.

use std::fmt;
use std::sync::Arc;

use analysis_orchestrator::PredictionPipeline;
use coin_store::CoinStore;
use market_client::MarketClient;
use market_core::{SymbolRegistry, TextGenerator};
use response_cache::ResponseCache;

pub mod candles;
pub mod cli;
pub mod details;
pub mod forecast;
pub mod insights;
pub mod news;
pub mod symbols;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Candles,
    Details,
    News,
    Insights,
    Symbols,
    Forecast,
}

impl Job {
    pub const ALL: [Job; 6] = [
        Job::Symbols,
        Job::Candles,
        Job::Details,
        Job::News,
        Job::Insights,
        Job::Forecast,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Job::Candles => "candles",
            Job::Details => "details",
            Job::News => "news",
            Job::Insights => "insights",
            Job::Symbols => "symbols",
            Job::Forecast => "forecast",
        }
    }

    /// `--candles` style command-line flag.
    pub fn from_flag(flag: &str) -> Option<Job> {
        let name = flag.strip_prefix("--")?;
        Job::ALL.iter().copied().find(|j| j.name() == name)
    }
}

/// Outcome counters for one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub processed: usize,
    pub written: u64,
    pub failed: usize,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} written, {} failed",
            self.processed, self.written, self.failed
        )
    }
}

/// Shared handles for every job.
pub struct FetchContext {
    pub store: CoinStore,
    pub market: MarketClient,
    pub cache: ResponseCache,
    pub registry: SymbolRegistry,
    /// Article sentiment and summary.
    pub news_classifier: Arc<dyn TextGenerator>,
    /// Insight category.
    pub insight_classifier: Arc<dyn TextGenerator>,
    pub pipeline: PredictionPipeline,
    pub news_concurrency: usize,
}

impl FetchContext {
    pub async fn run(&self, job: Job) -> JobReport {
        tracing::info!("Starting {} job", job.name());
        let report = match job {
            Job::Candles => candles::run(self).await,
            Job::Details => details::run(self).await,
            Job::News => news::run(self).await,
            Job::Insights => insights::run(self).await,
            Job::Symbols => symbols::run(self).await,
            Job::Forecast => forecast::run(self).await,
        };
        tracing::info!("Finished {} job: {}", job.name(), report);
        report
    }
}

/// Cut `text` to at most `max` characters.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_flags() {
        assert_eq!(Job::from_flag("--news"), Some(Job::News));
        assert_eq!(Job::from_flag("--forecast"), Some(Job::Forecast));
        assert_eq!(Job::from_flag("news"), None);
        assert_eq!(Job::from_flag("--all"), None);
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
