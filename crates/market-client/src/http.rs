use market_core::{MarketError, MarketResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::rate_limit::RateLimiter;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_WAIT: Duration = Duration::from_secs(15);

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("coincast/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send with optional rate limiting and retry on HTTP 429.
pub(crate) async fn send(
    client: &Client,
    builder: RequestBuilder,
    limiter: Option<&RateLimiter>,
    upstream: &str,
) -> MarketResult<Response> {
    let request = builder
        .build()
        .map_err(|e| MarketError::UpstreamUnavailable(format!("{}: {}", upstream, e)))?;

    for attempt in 0..MAX_ATTEMPTS {
        if let Some(limiter) = limiter {
            limiter.acquire().await;
        }
        let req = request.try_clone().ok_or_else(|| {
            MarketError::UpstreamUnavailable(format!("{}: request cannot be retried", upstream))
        })?;
        let response = client
            .execute(req)
            .await
            .map_err(|e| MarketError::UpstreamUnavailable(format!("{}: {}", upstream, e)))?;

        if response.status().as_u16() != 429 {
            return Ok(response);
        }

        tracing::warn!(
            "{} 429 rate limited, waiting {}s before retry {}/{}",
            upstream,
            RETRY_WAIT.as_secs(),
            attempt + 1,
            MAX_ATTEMPTS
        );
        tokio::time::sleep(RETRY_WAIT).await;
    }

    Err(MarketError::UpstreamUnavailable(format!(
        "Rate limited by {} after {} retries",
        upstream, MAX_ATTEMPTS
    )))
}

/// Fail on non-2xx, then decode the body.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response, upstream: &str) -> MarketResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MarketError::UpstreamUnavailable(format!(
            "{} HTTP {}: {}",
            upstream,
            status,
            body.chars().take(300).collect::<String>()
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| MarketError::MalformedResponse(format!("{}: {}", upstream, e)))
}

pub(crate) fn malformed(upstream: &str, detail: impl std::fmt::Display) -> MarketError {
    MarketError::MalformedResponse(format!("{}: {}", upstream, detail))
}
