use tracing::warn;

use crate::{FetchContext, JobReport};

/// Batch forecast for every tracked symbol with enough stored history.
pub async fn run(ctx: &FetchContext) -> JobReport {
    let mut report = JobReport::default();

    for &symbol in ctx.registry.symbols() {
        report.processed += 1;
        match ctx.pipeline.batch_forecast(&ctx.store, symbol).await {
            Ok(saved) => report.written += saved.predictions.len() as u64,
            Err(e) => {
                warn!("Forecast skipped for {}: {}", symbol, e);
                report.failed += 1;
            }
        }
    }

    report
}
