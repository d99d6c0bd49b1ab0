//! data-fetcher: run the scheduled fetch jobs once.
//!
//! Usage:
//!   cargo run -p data-fetcher -- --all
//!   cargo run -p data-fetcher -- --candles --forecast --symbols BTCUSDT ETHUSDT
//!   cargo run -p data-fetcher -- --news --db coins.db

use std::sync::Arc;

use analysis_orchestrator::{build_pipeline, PipelineConfig};
use coin_store::CoinStore;
use data_fetcher::cli::{parse_args, DEFAULT_NEWS_CONCURRENCY};
use data_fetcher::{FetchContext, Job};
use market_client::MarketClient;
use market_core::SymbolRegistry;
use response_cache::{CacheConfig, ResponseCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "data_fetcher=info,analysis_orchestrator=info,market_client=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let parsed = parse_args(&args);

    if parsed.jobs.is_empty() {
        eprintln!("Usage:");
        eprintln!("  data-fetcher --all                        Run every job");
        eprintln!("  data-fetcher --candles --details --news --insights --symbols --forecast");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --symbols BTCUSDT ETHUSDT ...   Limit to these tracked pairs");
        eprintln!("  --db PATH                       SQLite DB path (default: DATABASE_URL or coins.db)");
        eprintln!("  --concurrency N                 Parallel news classifications (default: {})", DEFAULT_NEWS_CONCURRENCY);
        std::process::exit(1);
    }

    let registry = match &parsed.symbols {
        Some(pairs) => SymbolRegistry::validate(pairs.as_slice())?,
        None => SymbolRegistry::from_env()?,
    };

    let database_url = parsed
        .db_path
        .as_ref()
        .map(|path| format!("sqlite:{}", path))
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite:coins.db".to_string());

    tracing::info!(
        "data-fetcher: jobs={:?}, {} symbols, db={}",
        parsed.jobs.iter().map(Job::name).collect::<Vec<_>>(),
        registry.len(),
        database_url
    );

    let store = CoinStore::connect(&database_url).await?;
    let cache = ResponseCache::from_config(&CacheConfig::from_env()).await;
    let market = MarketClient::from_env();

    let pipeline_config = PipelineConfig::from_env();
    let pipeline = build_pipeline(&pipeline_config, &market, cache.clone())?;
    let chat = pipeline_config.inference.chat_client();

    let ctx = FetchContext {
        store,
        market,
        cache,
        registry,
        news_classifier: Arc::new(chat.with_params(100, 0.3)),
        insight_classifier: Arc::new(chat.with_params(10, 0.0)),
        pipeline,
        news_concurrency: parsed.news_concurrency,
    };

    let mut failures = 0;
    for job in parsed.jobs {
        failures += ctx.run(job).await.failed;
    }

    tracing::info!("All jobs done ({} failed items)", failures);
    Ok(())
}
