use analysis_orchestrator::{classify_news, NewsClassification};
use futures_util::stream::{self, StreamExt};
use market_client::NewsSort;
use market_core::{Headline, MarketResult, NewsArticle, TextGenerator};
use response_cache::{ttl, CacheKey, ResponseCache};
use tracing::{debug, warn};

use crate::{FetchContext, JobReport};

const QUERY: &str = "cryptocurrency OR blockchain";
const PAGE_SIZE: u32 = 30;

const FALLBACK_IMAGES: [&str; 3] = [
    "https://id1.dpi.or.id/uploads/images/2025/06/image_750x395_684b0498cc96b_1.jpg",
    "https://media.product.which.co.uk/prod/images/original/eda400066cb6-crypto-various.jpg",
    "https://www.pymnts.com/wp-content/uploads/2021/05/us-eyes-regulatory-perimeter-for-cryptos.jpg",
];

/// Newest headlines, classified in a bounded pool, inserted if the link is new.
pub async fn run(ctx: &FetchContext) -> JobReport {
    let mut report = JobReport::default();

    let headlines = match ctx.market.news.everything(QUERY, NewsSort::PublishedAt, PAGE_SIZE).await {
        Ok(headlines) => headlines,
        Err(e) => {
            warn!("News fetch failed: {}", e);
            report.failed += 1;
            return report;
        }
    };

    let mut fresh = Vec::with_capacity(headlines.len());
    for headline in headlines {
        report.processed += 1;
        match ctx.store.news_exists(&headline.url).await {
            Ok(false) => fresh.push(headline),
            Ok(true) => debug!("News already stored: {}", headline.url),
            Err(e) => {
                warn!("News lookup failed for {}: {}", headline.url, e);
                report.failed += 1;
            }
        }
    }

    let generator = ctx.news_classifier.as_ref();
    let cache = &ctx.cache;
    let classified: Vec<Option<NewsArticle>> = stream::iter(fresh)
        .map(|headline| async move {
            let text = article_text(&headline);
            match classify_cached(generator, cache, &text).await {
                Ok(classification) => normalize(headline, classification),
                Err(e) => {
                    warn!("Classification failed for {}: {}", headline.url, e);
                    None
                }
            }
        })
        .buffer_unordered(ctx.news_concurrency.max(1))
        .collect()
        .await;

    for article in classified {
        let Some(article) = article else {
            report.failed += 1;
            continue;
        };
        match ctx.store.insert_news(&article).await {
            Ok(true) => report.written += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("News insert failed for {}: {}", article.link, e);
                report.failed += 1;
            }
        }
    }

    report
}

fn article_text(headline: &Headline) -> String {
    format!("{} {}", headline.title, headline.description.as_deref().unwrap_or(""))
}

/// Classification memoized by a hash of the article text.
pub async fn classify_cached(
    generator: &dyn TextGenerator,
    cache: &ResponseCache,
    text: &str,
) -> MarketResult<NewsClassification> {
    let key = CacheKey::new("news_analyze").hashed(text)?;
    cache
        .get_or_compute(&key, ttl::ANALYSIS, || classify_news(generator, text))
        .await
}

/// Build the stored article; `None` when a required field is missing.
pub fn normalize(headline: Headline, classification: NewsClassification) -> Option<NewsArticle> {
    let published_at = headline.published_at?;
    let image = headline
        .image
        .filter(|url| has_image_extension(url))
        .unwrap_or_else(|| fallback_image(&headline.url).to_string());

    Some(NewsArticle {
        title: headline.title,
        description: headline.description,
        summary: Some(classification.summary),
        sentiment: classification.sentiment,
        image: Some(image),
        link: headline.url,
        published_at,
    })
}

pub fn has_image_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default().to_lowercase();
    [".jpg", ".jpeg", ".png"].iter().any(|ext| path.ends_with(ext))
}

/// Same link always gets the same placeholder.
pub fn fallback_image(link: &str) -> &'static str {
    let hash = link
        .bytes()
        .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)));
    FALLBACK_IMAGES[(hash % FALLBACK_IMAGES.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use market_core::NewsSentiment;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl TextGenerator for Counting {
        async fn complete(&self, _system: Option<&str>, _prompt: &str) -> MarketResult<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"sentiment": "Bad", "summary": "Exchange hacked."}"#.to_string())
        }
    }

    fn headline(image: Option<&str>, published: bool) -> Headline {
        Headline {
            title: "Exchange hacked".to_string(),
            description: Some("Funds lost".to_string()),
            url: "https://news.example/hack".to_string(),
            image: image.map(str::to_string),
            published_at: published.then(|| Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()),
        }
    }

    fn classification() -> NewsClassification {
        NewsClassification {
            sentiment: NewsSentiment::Bad,
            summary: "Exchange hacked.".to_string(),
        }
    }

    #[test]
    fn test_image_extension_check() {
        assert!(has_image_extension("https://cdn.x/a.JPG"));
        assert!(has_image_extension("https://cdn.x/a.png?w=600"));
        assert!(!has_image_extension("https://cdn.x/a.webp"));
        assert!(!has_image_extension("https://cdn.x/image"));
    }

    #[test]
    fn test_fallback_image_is_deterministic() {
        let a = fallback_image("https://news.example/1");
        assert_eq!(a, fallback_image("https://news.example/1"));
        assert!(FALLBACK_IMAGES.contains(&a));
    }

    #[test]
    fn test_normalize_replaces_bad_image() {
        let article = normalize(headline(Some("https://cdn.x/a.gif"), true), classification()).unwrap();
        assert_eq!(article.image.as_deref(), Some(fallback_image("https://news.example/hack")));
        assert_eq!(article.sentiment, NewsSentiment::Bad);

        let kept = normalize(headline(Some("https://cdn.x/a.jpeg"), true), classification()).unwrap();
        assert_eq!(kept.image.as_deref(), Some("https://cdn.x/a.jpeg"));
    }

    #[test]
    fn test_normalize_requires_publish_time() {
        assert!(normalize(headline(None, false), classification()).is_none());
    }

    #[tokio::test]
    async fn test_classification_is_memoized() {
        let generator = Counting(AtomicUsize::new(0));
        let cache = ResponseCache::in_memory();

        let first = classify_cached(&generator, &cache, "Exchange hacked Funds lost").await.unwrap();
        let second = classify_cached(&generator, &cache, "Exchange hacked Funds lost").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(generator.0.load(Ordering::SeqCst), 1);
    }
}
