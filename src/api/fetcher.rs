//! Retrying HTTP-JSON fetcher
//!
//! This module handles every HTTP request the pipelines make, including:
//! - Building the shared HTTP client
//! - Per-vendor pacing through the shared token bucket
//! - Retry logic for transient failures
//! - Rate-limit waits driven by the server's `Retry-After` hint
//! - Error classification

use crate::api::limiter::VendorLimiter;
use crate::api::FetchError;
use crate::config::HttpConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Upper bound for a single failure backoff
const MAX_BACKOFF_SECS: f64 = 300.0;

/// Builds the HTTP client shared by every vendor
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retry and timeout policy for one fetcher
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Per-attempt timeout
    pub timeout: Duration,

    /// Retries allowed for 5xx and transport failures
    pub max_retries: u32,

    /// Backoff before retry `n` is `backoff_unit * backoff_base^n`
    pub backoff_base: f64,
    pub backoff_unit: Duration,

    /// Wait used when a 429 has no usable `Retry-After`
    pub default_retry_after: Duration,

    /// 429 waits tolerated for a single request before giving up
    pub max_rate_limit_waits: u32,

    /// Longest single 429 wait, whatever `Retry-After` asks for
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
            max_rate_limit_waits: config.max_rate_limit_waits,
            max_retry_after: Duration::from_secs(config.max_retry_after_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait after a 429 carrying `hint`, clamped to `max_retry_after`
    pub fn rate_limit_wait(&self, hint: Option<Duration>) -> Duration {
        hint.unwrap_or(self.default_retry_after).min(self.max_retry_after)
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_unit.as_secs_f64() * self.backoff_base.powi(exponent);
        if secs.is_finite() {
            Duration::from_secs_f64(secs.clamp(0.0, MAX_BACKOFF_SECS))
        } else {
            Duration::from_secs_f64(MAX_BACKOFF_SECS)
        }
    }
}

/// A GET request against a JSON endpoint
#[derive(Debug, Clone)]
pub struct ApiRequest {
    url: Url,
    headers: HeaderMap,
    query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
        }
    }

    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        self.headers.extend(headers.clone());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Outcome of a single HTTP attempt
enum Attempt {
    Done(Value),
    RateLimited(Duration),
    Retry(FetchError),
    Fail(FetchError),
}

/// Fetches and decodes JSON documents under a retry policy
#[derive(Debug, Clone)]
pub struct JsonFetcher {
    client: Client,
    policy: RetryPolicy,
    limiter: Option<Arc<VendorLimiter>>,
}

impl JsonFetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            limiter: None,
        }
    }

    /// Paces every attempt through `limiter`
    pub fn with_limiter(mut self, limiter: Arc<VendorLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Fetches a URL and parses the body as JSON
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 429 | Wait `Retry-After` (or the default, at most `max_retry_after`), retry; not counted as a failure |
    /// | HTTP 5xx | Retry up to `max_retries` times with exponential backoff |
    /// | Timeout / connection error | Retry up to `max_retries` times with exponential backoff |
    /// | Other HTTP 4xx | Fail immediately |
    /// | 2xx with invalid JSON | Fail immediately |
    pub async fn fetch_json(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        let mut attempt = 0u32;
        let mut rate_limit_waits = 0u32;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            match self.attempt(request).await {
                Attempt::Done(value) => return Ok(value),

                Attempt::RateLimited(wait) => {
                    if rate_limit_waits >= self.policy.max_rate_limit_waits {
                        return Err(FetchError::RateLimited {
                            url: request.url.to_string(),
                            waits: rate_limit_waits,
                        });
                    }
                    rate_limit_waits += 1;
                    tracing::warn!(
                        "Rate limited by {}, waiting {:?} (wait {}/{})",
                        request.url,
                        wait,
                        rate_limit_waits,
                        self.policy.max_rate_limit_waits
                    );
                    tokio::time::sleep(wait).await;
                }

                Attempt::Retry(error) => {
                    if attempt >= self.policy.max_retries {
                        return Err(error);
                    }
                    let delay = self.policy.backoff(attempt);
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} in {:?} (retry {}/{}): {}",
                        request.url,
                        delay,
                        attempt,
                        self.policy.max_retries,
                        error
                    );
                    tokio::time::sleep(delay).await;
                }

                Attempt::Fail(error) => return Err(error),
            }
        }
    }

    async fn attempt(&self, request: &ApiRequest) -> Attempt {
        let url = request.url.to_string();

        let response = match self
            .client
            .get(request.url.clone())
            .headers(request.headers.clone())
            .query(&request.query)
            .timeout(self.policy.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(classify_transport(url, e)),
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let hint = retry_after(response.headers());
            return Attempt::RateLimited(self.policy.rate_limit_wait(hint));
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Attempt::Retry(FetchError::ServerError {
                url,
                status: status.as_u16(),
                body: FetchError::truncate_body(body),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Attempt::Fail(FetchError::ClientError {
                url,
                status: status.as_u16(),
                body: FetchError::truncate_body(body),
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Retry(classify_transport(url, e)),
        };

        match serde_json::from_str(&body) {
            Ok(value) => Attempt::Done(value),
            Err(e) => Attempt::Fail(FetchError::Decode {
                url,
                message: e.to_string(),
            }),
        }
    }
}

/// Reads a `Retry-After` header expressed in whole seconds
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn classify_transport(url: String, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else {
        FetchError::Transport {
            url,
            message: error.to_string(),
        }
    }
}
