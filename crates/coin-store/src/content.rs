//! News, categorized insights and the exchange symbol list.

use market_core::{InsightArticle, NewsArticle};

use crate::db::CoinStore;
use crate::error::StoreResult;
use crate::models::{CryptoSymbol, InsightRow, NewsRow};

impl CoinStore {
    /// Insert unless the link is already stored. Returns whether a row was added.
    pub async fn insert_news(&self, article: &NewsArticle) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO news (title, description, summary, sentiment, image, link, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.summary)
        .bind(article.sentiment.as_str())
        .bind(&article.image)
        .bind(&article.link)
        .bind(article.published_at)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn news_exists(&self, link: &str) -> StoreResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM news WHERE link = ? LIMIT 1")
            .bind(link)
            .fetch_optional(self.pool())
            .await?;
        Ok(found.is_some())
    }

    pub async fn recent_news(&self, limit: i64) -> StoreResult<Vec<NewsArticle>> {
        let rows = sqlx::query_as::<_, NewsRow>(
            "SELECT title, description, summary, sentiment, image, link, published_at
             FROM news ORDER BY published_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(NewsArticle::from).collect())
    }

    pub async fn insert_insight(&self, insight: &InsightArticle) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO insights (title, link, date, source, image, category)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&insight.title)
        .bind(&insight.link)
        .bind(insight.date)
        .bind(&insight.source)
        .bind(&insight.image)
        .bind(insight.category.as_str())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insight_exists(&self, title: &str, link: &str) -> StoreResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM insights WHERE title = ? AND link = ? LIMIT 1")
                .bind(title)
                .bind(link)
                .fetch_optional(self.pool())
                .await?;
        Ok(found.is_some())
    }

    pub async fn recent_insights(&self, limit: i64) -> StoreResult<Vec<InsightArticle>> {
        let rows = sqlx::query_as::<_, InsightRow>(
            "SELECT title, link, date, source, image, category
             FROM insights ORDER BY date DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(InsightArticle::from).collect())
    }

    /// Swap the stored symbol list for `names` in one transaction.
    pub async fn replace_symbols(&self, names: &[String]) -> StoreResult<usize> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM crypto_symbols").execute(&mut *tx).await?;

        for name in names {
            sqlx::query("INSERT INTO crypto_symbols (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(names.len())
    }

    pub async fn list_symbols(&self) -> StoreResult<Vec<CryptoSymbol>> {
        let rows = sqlx::query_as::<_, CryptoSymbol>("SELECT id, name FROM crypto_symbols ORDER BY name ASC")
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use market_core::{InsightCategory, NewsSentiment};

    fn article(link: &str, hour: i64) -> NewsArticle {
        NewsArticle {
            title: format!("Story {}", link),
            description: Some("desc".to_string()),
            summary: Some("short".to_string()),
            sentiment: NewsSentiment::Good,
            image: None,
            link: link.to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour),
        }
    }

    #[tokio::test]
    async fn test_news_dedup_by_link() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        assert!(store.insert_news(&article("https://a", 1)).await.unwrap());
        assert!(!store.insert_news(&article("https://a", 2)).await.unwrap());
        assert!(store.insert_news(&article("https://b", 3)).await.unwrap());
        assert!(store.news_exists("https://a").await.unwrap());
        assert!(!store.news_exists("https://c").await.unwrap());

        let recent = store.recent_news(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].link, "https://b");
        assert_eq!(recent[1].sentiment, NewsSentiment::Good);
    }

    #[tokio::test]
    async fn test_insight_dedup_and_category() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        let insight = InsightArticle {
            title: "ETH upgrade".to_string(),
            link: "https://x".to_string(),
            date: Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            source: "CoinDesk".to_string(),
            image: None,
            category: InsightCategory::Ethereum,
        };
        assert!(store.insert_insight(&insight).await.unwrap());
        assert!(!store.insert_insight(&insight).await.unwrap());
        assert!(store.insight_exists("ETH upgrade", "https://x").await.unwrap());

        let rows = store.recent_insights(5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, InsightCategory::Ethereum);
    }

    #[tokio::test]
    async fn test_replace_symbols() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        store.replace_symbols(&["ETHUSDT".to_string(), "BTCUSDT".to_string()]).await.unwrap();
        store.replace_symbols(&["SOLUSDT".to_string()]).await.unwrap();

        let names: Vec<String> = store.list_symbols().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["SOLUSDT"]);
    }
}
