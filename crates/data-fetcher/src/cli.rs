//! Hand-rolled flag parsing for the data-fetcher binary.

use crate::Job;

pub const DEFAULT_NEWS_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchArgs {
    pub jobs: Vec<Job>,
    /// Pairs given after `--symbols`; `None` means the configured universe.
    pub symbols: Option<Vec<String>>,
    pub db_path: Option<String>,
    pub news_concurrency: usize,
}

/// `--symbols` followed by pairs narrows the universe; a bare `--symbols`
/// selects the symbol-list job.
pub fn parse_args(args: &[String]) -> FetchArgs {
    let value_after = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .filter(|v| !v.starts_with("--"))
            .cloned()
    };

    let symbols: Option<Vec<String>> = args.iter().position(|a| a == "--symbols").and_then(|idx| {
        let pairs: Vec<String> = args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .cloned()
            .collect();
        (!pairs.is_empty()).then_some(pairs)
    });

    let jobs = if args.iter().any(|a| a == "--all") {
        Job::ALL.to_vec()
    } else {
        Job::ALL
            .iter()
            .copied()
            .filter(|job| match job {
                Job::Symbols => symbols.is_none() && args.iter().any(|a| a == "--symbols"),
                other => args.iter().any(|a| Job::from_flag(a) == Some(*other)),
            })
            .collect()
    };

    FetchArgs {
        jobs,
        symbols,
        db_path: value_after("--db"),
        news_concurrency: value_after("--concurrency")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_NEWS_CONCURRENCY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &str) -> Vec<String> {
        std::iter::once("data-fetcher")
            .chain(raw.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_job_selection() {
        let parsed = parse_args(&args("--candles --forecast"));
        assert_eq!(parsed.jobs, vec![Job::Candles, Job::Forecast]);
        assert!(parsed.symbols.is_none());
        assert_eq!(parsed.news_concurrency, DEFAULT_NEWS_CONCURRENCY);

        assert_eq!(parse_args(&args("--all")).jobs.len(), 6);
        assert!(parse_args(&args("")).jobs.is_empty());
    }

    #[test]
    fn test_symbols_flag_is_job_or_filter() {
        let narrowed = parse_args(&args("--candles --symbols BTCUSDT eth --db test.db"));
        assert_eq!(narrowed.jobs, vec![Job::Candles]);
        assert_eq!(narrowed.symbols, Some(vec!["BTCUSDT".to_string(), "eth".to_string()]));
        assert_eq!(narrowed.db_path.as_deref(), Some("test.db"));

        let job = parse_args(&args("--symbols --news"));
        assert_eq!(job.jobs, vec![Job::Symbols, Job::News]);
        assert!(job.symbols.is_none());
    }

    #[test]
    fn test_concurrency_must_be_positive() {
        assert_eq!(parse_args(&args("--news --concurrency 3")).news_concurrency, 3);
        assert_eq!(parse_args(&args("--news --concurrency 0")).news_concurrency, 8);
    }
}
