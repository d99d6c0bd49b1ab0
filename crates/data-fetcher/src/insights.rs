use analysis_orchestrator::classify_insight;
use chrono::{DateTime, Utc};
use market_client::RawInsight;
use market_core::{InsightArticle, InsightCategory};
use tracing::warn;

use crate::{truncate_chars, FetchContext, JobReport};

const PAGE_SIZE: u32 = 30;
const TITLE_MAX: usize = 255;
const LINK_MAX: usize = 512;
const SOURCE_MAX: usize = 255;

pub async fn run(ctx: &FetchContext) -> JobReport {
    let mut report = JobReport::default();

    let items = match ctx.market.cryptocompare.news(PAGE_SIZE).await {
        Ok(items) => items,
        Err(e) => {
            warn!("Insight fetch failed: {}", e);
            report.failed += 1;
            return report;
        }
    };

    for raw in items {
        report.processed += 1;
        let Some(mut insight) = normalize(&raw, Utc::now()) else {
            warn!("Skipping insight without title or link");
            report.failed += 1;
            continue;
        };

        match ctx.store.insight_exists(&insight.title, &insight.link).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                warn!("Insight lookup failed for {}: {}", insight.link, e);
                report.failed += 1;
                continue;
            }
        }

        insight.category = classify_insight(ctx.insight_classifier.as_ref(), &raw.title, &raw.body)
            .await
            .unwrap_or_else(|e| {
                warn!("Insight classification failed for {}: {}", insight.link, e);
                InsightCategory::General
            });

        match ctx.store.insert_insight(&insight).await {
            Ok(true) => report.written += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("Insight insert failed for {}: {}", insight.link, e);
                report.failed += 1;
            }
        }
    }

    report
}

/// Trimmed and truncated insight with category `General`; `None` without a
/// title or link.
pub fn normalize(raw: &RawInsight, now: DateTime<Utc>) -> Option<InsightArticle> {
    let title = raw.title.trim();
    let link = raw.url.trim();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let source = match raw.source.trim() {
        "" => "Unknown",
        s => s,
    };

    Some(InsightArticle {
        title: truncate_chars(title, TITLE_MAX),
        link: truncate_chars(link, LINK_MAX),
        date: Some(
            raw.published_on
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .unwrap_or(now),
        ),
        source: truncate_chars(source, SOURCE_MAX),
        image: raw.imageurl.clone().filter(|u| !u.trim().is_empty()),
        category: InsightCategory::General,
    })
}
