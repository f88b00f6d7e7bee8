use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::politeness::PolitenessDelay;
use crate::traits::FetchRequest;

/// Seeds used when the input names no start URLs.
pub const DEFAULT_START_URLS: &[&str] = &[
    "https://theresanaiforthat.com/ai/?ref=featured&v=full",
    "https://www.producthunt.com/topics/artificial-intelligence",
];

pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Proxy settings, passed through untouched to the fetch layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyInput {
    #[serde(default)]
    pub proxy_urls: Vec<String>,
}

/// The crawl input document (camelCase JSON).
///
/// ```json
/// { "startUrls": ["https://theresanaiforthat.com/ai/"], "maxItems": 50 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlInput {
    #[serde(default)]
    pub start_urls: Vec<String>,
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub proxy_configuration: Option<ProxyInput>,
}

impl CrawlInput {
    /// Load an input document from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read input file {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Start URLs, falling back to [`DEFAULT_START_URLS`] when none are given.
    pub fn resolved_start_urls(&self) -> Vec<String> {
        let urls: Vec<String> = self
            .start_urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect();

        if urls.is_empty() {
            DEFAULT_START_URLS.iter().map(|u| u.to_string()).collect()
        } else {
            urls
        }
    }

    pub fn resolved_max_items(&self) -> usize {
        self.max_items.unwrap_or(DEFAULT_MAX_ITEMS)
    }

    pub fn proxy_urls(&self) -> &[String] {
        self.proxy_configuration
            .as_ref()
            .map(|p| p.proxy_urls.as_slice())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.resolved_max_items() == 0 {
            return Err(AppError::ConfigError(
                "maxItems must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

/// Fetch retry bound with a short exponential backoff between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// No backoff between retries (tests).
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-indexed): base, 2x base, 4x base, ...
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

/// Tuning of the crawl controller.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Worker slots pulling from the frontier (2 for rendered fetches,
    /// up to 5 for plain HTML).
    pub concurrency: usize,
    /// Bound on a single fetch attempt; exceeding it counts as a failure.
    pub request_timeout: Duration,
    /// Bound on a single attempt that carries a scroll plan.
    pub rendered_timeout: Duration,
    pub retry: RetryPolicy,
    pub politeness: PolitenessDelay,
    /// At most `max_items * max_requests_multiplier` requests per crawl.
    pub max_requests_multiplier: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            request_timeout: Duration::from_secs(60),
            rendered_timeout: Duration::from_secs(180),
            retry: RetryPolicy::default(),
            politeness: PolitenessDelay::default(),
            max_requests_multiplier: 3,
        }
    }
}

impl CrawlConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_rendered_timeout(mut self, timeout: Duration) -> Self {
        self.rendered_timeout = timeout;
        self
    }

    /// Attempt timeout for `request`: rendered scroll sessions get the
    /// longer bound.
    pub fn timeout_for(&self, request: &FetchRequest) -> Duration {
        if request.scroll.is_some() {
            self.rendered_timeout
        } else {
            self.request_timeout
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_politeness(mut self, politeness: PolitenessDelay) -> Self {
        self.politeness = politeness;
        self
    }

    /// Request cap for a crawl with the given item budget. Seeds always fit.
    pub fn max_requests(&self, max_items: usize, seeds: usize) -> usize {
        max_items
            .saturating_mul(self.max_requests_multiplier)
            .max(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteLabel;
    use crate::scroll::ScrollPlan;

    #[test]
    fn parses_camel_case_input() {
        let input: CrawlInput = serde_json::from_str(
            r#"{
                "startUrls": ["https://www.producthunt.com/topics/ai"],
                "maxItems": 25,
                "proxyConfiguration": { "proxyUrls": ["http://proxy.local:8000"] }
            }"#,
        )
        .unwrap();

        assert_eq!(
            input.resolved_start_urls(),
            vec!["https://www.producthunt.com/topics/ai".to_string()]
        );
        assert_eq!(input.resolved_max_items(), 25);
        assert_eq!(input.proxy_urls(), ["http://proxy.local:8000".to_string()]);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn empty_input_uses_defaults() {
        let input: CrawlInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.resolved_start_urls().len(), DEFAULT_START_URLS.len());
        assert_eq!(input.resolved_max_items(), DEFAULT_MAX_ITEMS);
        assert!(input.proxy_urls().is_empty());

        let blank = CrawlInput {
            start_urls: vec!["  ".into()],
            ..CrawlInput::default()
        };
        assert_eq!(blank.resolved_start_urls().len(), DEFAULT_START_URLS.len());
    }

    #[test]
    fn zero_max_items_is_rejected() {
        let input = CrawlInput {
            max_items: Some(0),
            ..CrawlInput::default()
        };
        assert!(matches!(input.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn retry_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_retry(10), Duration::from_secs(8));
        assert_eq!(RetryPolicy::immediate(3).delay_for_retry(2), Duration::ZERO);
    }

    #[test]
    fn request_cap_scales_with_budget() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_requests(100, 2), 300);
        assert_eq!(config.max_requests(1, 5), 5);
        assert_eq!(config.with_concurrency(0).concurrency, 1);
    }

    #[test]
    fn scroll_requests_get_the_rendered_timeout() {
        let config = CrawlConfig::default().with_request_timeout(Duration::from_secs(20));
        let plain = FetchRequest::new(
            "https://theresanaiforthat.com/ai/",
            RouteLabel::TheresAnAiForThat,
        );
        let scrolled = plain.clone().with_scroll(ScrollPlan::new(".tool-card", 50, 100));

        assert_eq!(config.timeout_for(&plain), Duration::from_secs(20));
        assert_eq!(config.timeout_for(&scrolled), Duration::from_secs(180));
    }
}
