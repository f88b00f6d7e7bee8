use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use toolscout_core::error::AppError;
use toolscout_core::traits::{FetchRequest, Fetcher};

use crate::headers::{default_headers, random_user_agent};

/// HTTP fetcher using reqwest.
///
/// Downloads static HTML with browser-like headers and a user agent drawn
/// from a small pool on every request. Scroll plans are ignored: pages that
/// need live rendering go through [`crate::RoutingFetcher`] instead.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_options(Duration::from_secs(30), None)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Self::with_options(timeout, None)
    }

    /// Build a fetcher with a navigation timeout and an optional proxy URL
    /// (`http://`, `https://` or `socks5://`) applied to every scheme.
    pub fn with_options(timeout: Duration, proxy_url: Option<&str>) -> Result<Self, AppError> {
        let mut builder = Client::builder()
            .default_headers(default_headers())
            .timeout(timeout);

        if let Some(proxy_url) = proxy_url {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| AppError::ConfigError(format!("Invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
            tracing::info!("Proxy configuration enabled");
        }

        let client = builder
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, AppError> {
        let url = request.url.as_str();
        if request.scroll.is_some() {
            tracing::debug!(%url, "Static fetcher cannot scroll, fetching initial HTML");
        }

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}
