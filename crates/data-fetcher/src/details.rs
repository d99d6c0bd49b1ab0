use std::time::Duration;

use market_client::{CoinProfile, HourlyBar, MarketInfo};
use market_core::CoinDetail;
use tracing::warn;

use crate::{FetchContext, JobReport};

const HOURLY_POINTS: u32 = 720;
const SYMBOL_PAUSE: Duration = Duration::from_secs(1);

/// Hourly history plus supply and profile data, inserted only for new hours.
pub async fn run(ctx: &FetchContext) -> JobReport {
    let mut report = JobReport::default();

    for &symbol in ctx.registry.symbols() {
        report.processed += 1;
        let cc = &ctx.market.cryptocompare;

        let bars = match cc.hourly_history(symbol.base(), symbol.quote(), HOURLY_POINTS).await {
            Ok(bars) => bars,
            Err(e) => {
                warn!("Hourly history failed for {}: {}", symbol, e);
                report.failed += 1;
                tokio::time::sleep(SYMBOL_PAUSE).await;
                continue;
            }
        };

        let info = cc.market_info(symbol.base(), symbol.quote()).await.unwrap_or_else(|e| {
            warn!("Market info failed for {}: {}", symbol, e);
            MarketInfo::default()
        });
        let profile = ctx
            .market
            .coingecko
            .coin_profile(symbol.coingecko_id())
            .await
            .unwrap_or_else(|e| {
                warn!("Coin profile failed for {}: {}", symbol, e);
                CoinProfile::default()
            });

        let details = build_details(&bars, &info, &profile);
        match ctx.store.insert_coin_details(symbol, &details).await {
            Ok(n) => {
                tracing::info!("{}: {} new hourly details", symbol, n);
                report.written += n;
            }
            Err(e) => {
                warn!("Detail insert failed for {}: {}", symbol, e);
                report.failed += 1;
            }
        }

        tokio::time::sleep(SYMBOL_PAUSE).await;
    }

    report
}

/// One detail row per bar with a valid time; supply and profile fields are
/// copied onto every row.
pub fn build_details(bars: &[HourlyBar], info: &MarketInfo, profile: &CoinProfile) -> Vec<CoinDetail> {
    let description = Some(profile.description.clone()).filter(|d| !d.trim().is_empty());

    bars.iter()
        .filter_map(|bar| {
            Some(CoinDetail {
                time: bar.time_utc()?,
                open_price: bar.open,
                high_price: bar.high,
                low_price: bar.low,
                close_price: bar.close,
                volume_from: bar.volume_from,
                volume_to: bar.volume_to,
                market_cap: info.market_cap,
                supply: info.supply,
                max_supply: info.max_supply,
                circulating_supply: info.circulating_supply,
                image_url: info.image_url.clone(),
                description: description.clone(),
                percent_change_24h: profile.percent_change_24h,
                percent_change_7d: profile.percent_change_7d,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, close: f64) -> HourlyBar {
        HourlyBar {
            time,
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            volume_from: Some(1.0),
            volume_to: Some(close),
        }
    }

    #[test]
    fn test_build_details_merges_sources() {
        let info = MarketInfo {
            market_cap: Some(1e9),
            image_url: Some("https://www.cryptocompare.com/media/btc.png".to_string()),
            ..Default::default()
        };
        let profile = CoinProfile {
            description: "Digital gold".to_string(),
            percent_change_24h: Some(1.5),
            percent_change_7d: Some(-2.0),
        };

        let rows = build_details(&[bar(1_700_000_000, 10.0), bar(1_700_003_600, 11.0)], &info, &profile);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].close_price, Some(11.0));
        assert_eq!(rows[0].market_cap, Some(1e9));
        assert_eq!(rows[0].description.as_deref(), Some("Digital gold"));
        assert_eq!(rows[1].percent_change_7d, Some(-2.0));
        assert_eq!(rows[0].time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_empty_description_is_none() {
        let rows = build_details(&[bar(1_700_000_000, 1.0)], &MarketInfo::default(), &CoinProfile::default());
        assert!(rows[0].description.is_none());
        assert!(rows[0].percent_change_24h.is_none());
    }
}
