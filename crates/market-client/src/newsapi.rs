use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_core::{Headline, MarketError, MarketResult, NewsSource};
use reqwest::Client;
use serde::Deserialize;

use crate::http::{decode, send};

const BASE_URL: &str = "https://newsapi.org/v2";
const UPSTREAM: &str = "NewsAPI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsSort {
    Relevancy,
    PublishedAt,
}

impl NewsSort {
    fn as_str(&self) -> &'static str {
        match self {
            NewsSort::Relevancy => "relevancy",
            NewsSort::PublishedAt => "publishedAt",
        }
    }
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
}

#[derive(Clone)]
pub struct NewsApiClient {
    client: Client,
    api_key: Option<String>,
}

impl NewsApiClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    /// `/everything` search in English.
    pub async fn everything(&self, query: &str, sort: NewsSort, page_size: u32) -> MarketResult<Vec<Headline>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MarketError::UpstreamUnavailable("NEWS_API_KEY is not set".to_string()))?;

        let url = format!("{}/everything", BASE_URL);
        let builder = self.client.get(&url).header("X-Api-Key", key).query(&[
            ("q", query.to_string()),
            ("language", "en".to_string()),
            ("sortBy", sort.as_str().to_string()),
            ("pageSize", page_size.to_string()),
            ("page", "1".to_string()),
        ]);
        let response = send(&self.client, builder, None, UPSTREAM).await?;
        let body: EverythingResponse = decode(response, UPSTREAM).await?;

        Ok(body.articles.into_iter().filter_map(into_headline).collect())
    }
}

/// Articles without a title or URL are dropped.
fn into_headline(raw: RawArticle) -> Option<Headline> {
    let title = raw.title.filter(|t| !t.trim().is_empty())?;
    let url = raw.url.filter(|u| !u.trim().is_empty())?;
    Some(Headline {
        title,
        description: raw.description.filter(|d| !d.trim().is_empty()),
        url,
        image: raw.url_to_image,
        published_at: raw
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc)),
    })
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn headlines(&self, query: &str, limit: usize) -> MarketResult<Vec<Headline>> {
        self.everything(query, NewsSort::Relevancy, limit as u32).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_headline_requires_title_and_url() {
        let body: EverythingResponse = serde_json::from_str(
            r#"{"status":"ok","articles":[
                {"title":"BTC climbs","description":"","url":"https://x.test/a","urlToImage":null,"publishedAt":"2025-06-01T10:00:00Z"},
                {"title":null,"url":"https://x.test/b"},
                {"title":"No link","url":""}
            ]}"#,
        )
        .unwrap();
        let headlines: Vec<Headline> = body.articles.into_iter().filter_map(into_headline).collect();
        assert_eq!(headlines.len(), 1);
        assert_eq!(headlines[0].description, None);
        assert_eq!(
            headlines[0].published_at.unwrap().to_rfc3339(),
            "2025-06-01T10:00:00+00:00"
        );
    }
}
