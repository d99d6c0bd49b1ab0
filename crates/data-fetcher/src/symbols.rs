use crate::{FetchContext, JobReport};

/// Replace the stored pair list with the exchange's `TRADING` pairs.
pub async fn run(ctx: &FetchContext) -> JobReport {
    let mut report = JobReport {
        processed: 1,
        ..Default::default()
    };

    let names = match ctx.market.binance.trading_symbols().await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("Symbol list fetch failed: {}", e);
            report.failed = 1;
            return report;
        }
    };

    match ctx.store.replace_symbols(&names).await {
        Ok(n) => report.written = n as u64,
        Err(e) => {
            tracing::warn!("Symbol list store failed: {}", e);
            report.failed = 1;
        }
    }
    report
}
