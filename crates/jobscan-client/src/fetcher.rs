use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jobscan_core::error::AppError;
use jobscan_core::source::PageRequest;
use jobscan_core::traits::Fetcher;
use reqwest::Client;
use tokio::sync::Semaphore;
use url::Url;

pub const DEFAULT_PROXY_ENDPOINT: &str = "http://api.scraperapi.com/";
const DEFAULT_TIMEOUT_SECS: u64 = 70;
const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Connection settings for the scraping proxy.
#[derive(Clone)]
pub struct ProxyConfig {
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
    /// Proxy calls allowed in flight across every harvest sharing the fetcher.
    pub max_concurrency: usize,
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl ProxyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `SCRAPER_API_KEY` (required)
    /// - `SCRAPER_API_URL` (optional, defaults to the public ScraperAPI endpoint)
    /// - `SCRAPER_TIMEOUT_SECS` (optional, defaults to 70)
    /// - `SCRAPER_MAX_CONCURRENCY` (optional, defaults to 10)
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("SCRAPER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::ConfigError("SCRAPER_API_KEY must be set".into()))?;

        let mut config = Self::new(api_key);

        if let Ok(endpoint) = std::env::var("SCRAPER_API_URL") {
            config.endpoint = endpoint;
        }
        if let Ok(raw) = std::env::var("SCRAPER_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid SCRAPER_TIMEOUT_SECS '{raw}'"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(raw) = std::env::var("SCRAPER_MAX_CONCURRENCY") {
            config.max_concurrency = raw.parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid SCRAPER_MAX_CONCURRENCY '{raw}'"))
            })?;
        }

        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }
}

/// Fetcher that routes every page through a ScraperAPI-style proxy.
///
/// The target URL and access key travel as query parameters of a single
/// GET. Clones share one semaphore, so the global in-flight cap holds across
/// concurrent harvests. No retries.
#[derive(Clone)]
pub struct ProxyFetcher {
    client: Client,
    endpoint: Url,
    api_key: Arc<str>,
    timeout_secs: u64,
    permits: Arc<Semaphore>,
}

impl ProxyFetcher {
    pub fn new(config: &ProxyConfig) -> Result<Self, AppError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            AppError::ConfigError(format!("Invalid proxy endpoint '{}': {e}", config.endpoint))
        })?;

        let client = Client::builder()
            .user_agent("jobscan/0.1")
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key: Arc::from(config.api_key.as_str()),
            timeout_secs: config.timeout.as_secs(),
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
        })
    }

    /// Proxy URL for a page. Contains the access key; never log it.
    fn proxy_url(&self, page: &PageRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("api_key", &self.api_key)
                .append_pair("url", &page.url);
            if page.premium {
                query.append_pair("premium", "true");
            }
        }
        url
    }
}

impl Fetcher for ProxyFetcher {
    async fn fetch(&self, page: &PageRequest) -> Result<String, AppError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AppError::Generic(format!("Fetcher shut down: {e}")))?;

        tracing::debug!(source = %page.source, page = page.page, url = %page.url, "Fetching via proxy");

        let response = self
            .client
            .get(self.proxy_url(page))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection to proxy failed: {}", e.without_url()))
                } else {
                    AppError::HttpError(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                url: page.url.clone(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {}", e.without_url())))
    }
}
