//! Rate-Limited HTTP Client for hosted model APIs
//!
//! This module provides a rate-limited HTTP client wrapper that respects
//! provider API rate limits and retries requests the provider throttled.

use governor::{Quota, RateLimiter, state::NotKeyed, clock::DefaultClock, middleware::NoOpMiddleware};
use nonzero_ext::nonzero;
use reqwest::{Client, RequestBuilder, Response};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use crate::providers::traits::ProviderError;

/// Longest wait honored from a `Retry-After` header
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Rate-limited HTTP client for API requests
pub struct RateLimitedClient {
    /// Inner HTTP client
    client: Client,

    /// Rate limiter (requests per minute)
    limiter: RateLimiter<NotKeyed, governor::state::InMemoryState, DefaultClock, NoOpMiddleware>,

    /// Configured rate limit
    rate_limit_per_minute: u32,
}

impl RateLimitedClient {
    /// Create a new rate-limited client
    ///
    /// # Arguments
    /// * `rate_limit_per_minute` - Maximum requests allowed per minute
    /// * `timeout` - Whole-request timeout; completions can take a while
    pub fn new(rate_limit_per_minute: u32, timeout: Duration) -> Result<Self, ProviderError> {
        let rate = NonZeroU32::new(rate_limit_per_minute).unwrap_or(nonzero!(1u32));
        let limiter = RateLimiter::direct(Quota::per_minute(rate));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vietvan-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(RateLimitedClient {
            client,
            limiter,
            rate_limit_per_minute: rate.get(),
        })
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Build a POST request
    pub fn post(&self, url: &str) -> RateLimitedRequestBuilder<'_> {
        RateLimitedRequestBuilder {
            client: self,
            builder: self.client.post(url),
        }
    }

    /// Wait for rate limit and execute request
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        self.limiter.until_ready().await;

        debug!("Executing rate-limited request");

        let response = builder.send().await?;

        if let Some(remaining) = response
            .headers()
            .get("x-ratelimit-remaining-requests")
            .or_else(|| response.headers().get("anthropic-ratelimit-requests-remaining"))
            .and_then(|v| v.to_str().ok())
        {
            debug!(remaining = %remaining, "Provider request quota");
        }

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_RETRY_AFTER_SECS);

            warn!(retry_after_secs = retry_after, "Rate limited by provider");

            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        Ok(response)
    }

    /// Execute request, retrying only when the provider answered 429
    pub async fn execute_with_retry(
        &self,
        builder: RequestBuilder,
        max_retries: u32,
    ) -> Result<Response, ProviderError> {
        let mut attempt = 0;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| ProviderError::Internal("Request body cannot be retried".to_string()))?;

            match self.execute(request).await {
                Err(ProviderError::RateLimited { retry_after_secs })
                    if attempt < max_retries && retry_after_secs <= MAX_RETRY_AFTER_SECS =>
                {
                    attempt += 1;
                    debug!(attempt, retry_after_secs, "Retrying throttled request");
                    tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                }
                result => return result,
            }
        }
    }
}

/// Request builder wrapper that enforces rate limiting
pub struct RateLimitedRequestBuilder<'a> {
    client: &'a RateLimitedClient,
    builder: RequestBuilder,
}

impl<'a> RateLimitedRequestBuilder<'a> {
    /// Add a header to the request
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.builder = self.builder.header(key, value);
        self
    }

    /// Add JSON body to the request
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> Self {
        self.builder = self.builder.json(json);
        self
    }

    /// Add a bearer token header
    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.builder = self.builder.bearer_auth(token);
        self
    }

    /// Send the request (waits for rate limit)
    pub async fn send(self) -> Result<Response, ProviderError> {
        self.client.execute(self.builder).await
    }

    /// Send with retries on 429
    pub async fn send_with_retry(self, max_retries: u32) -> Result<Response, ProviderError> {
        self.client.execute_with_retry(self.builder, max_retries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_client_creation() {
        let client = RateLimitedClient::new(120, Duration::from_secs(30)).unwrap();
        assert_eq!(client.rate_limit_per_minute(), 120);
    }

    #[test]
    fn test_zero_rate_clamped_to_one() {
        let client = RateLimitedClient::new(0, Duration::from_secs(30)).unwrap();
        assert_eq!(client.rate_limit_per_minute(), 1);
    }

    #[test]
    fn test_first_permit_is_immediate() {
        let client = RateLimitedClient::new(1, Duration::from_secs(30)).unwrap();
        tokio_test::block_on(client.limiter.until_ready());
        assert!(client.limiter.check().is_err());
    }
}
