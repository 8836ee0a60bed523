//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. State lives
//! behind `Arc<Mutex<_>>` so clones share it and tests can assert on the
//! calls a pipeline made.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{HarvestRun, JobRecord, NewHarvestRun, WriteSummary};
use crate::source::{PageRequest, SourceKind};
use crate::traits::{Extractor, Fetcher, JobStore};

/// Build a record with the three natural-key fields set.
pub fn make_record(source: SourceKind, title: &str, company: &str, location: &str) -> JobRecord {
    let mut record = JobRecord::new(source);
    record.title = Some(title.to_string());
    record.company = Some(company.to_string());
    record.location = Some(location.to_string());
    record
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Scripted response for one page number.
#[derive(Debug, Clone)]
pub enum MockPage {
    Html(String),
    /// Upstream answered with this non-success status.
    Status(u16),
    /// Never completes.
    Hang,
}

/// Mock fetcher keyed by page number.
///
/// Pages without a scripted response fail with an upstream 404.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<HashMap<u32, MockPage>>,
    delay: Option<Duration>,
    fetched: Arc<Mutex<Vec<PageRequest>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, response: MockPage) -> Self {
        Arc::make_mut(&mut self.pages).insert(page, response);
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every page request seen so far, in call order.
    pub fn fetched(&self) -> Vec<PageRequest> {
        self.fetched.lock().unwrap().clone()
    }

    /// Highest number of fetches observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, page: &PageRequest) -> Result<String, AppError> {
        self.fetched.lock().unwrap().push(page.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.pages.get(&page.page).cloned();
        let result = match response {
            Some(MockPage::Html(html)) => Ok(html),
            Some(MockPage::Status(status)) => Err(AppError::UpstreamStatus {
                status,
                url: page.url.clone(),
            }),
            Some(MockPage::Hang) => std::future::pending().await,
            None => Err(AppError::UpstreamStatus {
                status: 404,
                url: page.url.clone(),
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor that maps an exact HTML body to canned records.
///
/// Unknown bodies yield no records.
#[derive(Clone, Default)]
pub struct MockExtractor {
    by_html: Arc<HashMap<String, Vec<JobRecord>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(mut self, html: &str, records: Vec<JobRecord>) -> Self {
        Arc::make_mut(&mut self.by_html).insert(html.to_string(), records);
        self
    }
}

impl Extractor for MockExtractor {
    fn extract(&self, html: &str, _source: SourceKind) -> Vec<JobRecord> {
        self.by_html.get(html).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

/// Store whose every operation fails with a database error.
#[derive(Clone, Copy, Default)]
pub struct FailingStore;

fn store_down() -> AppError {
    AppError::DatabaseError("connection refused".into())
}

impl JobStore for FailingStore {
    async fn replace_all(
        &self,
        _source: SourceKind,
        _records: &[JobRecord],
    ) -> Result<WriteSummary, AppError> {
        Err(store_down())
    }

    async fn upsert(
        &self,
        _source: SourceKind,
        _records: &[JobRecord],
    ) -> Result<WriteSummary, AppError> {
        Err(store_down())
    }

    async fn find_all(&self, _source: SourceKind) -> Result<Vec<JobRecord>, AppError> {
        Err(store_down())
    }

    async fn record_harvest(&self, _run: &NewHarvestRun) -> Result<Uuid, AppError> {
        Err(store_down())
    }

    async fn harvest_history(
        &self,
        _source: SourceKind,
        _limit: usize,
    ) -> Result<Vec<HarvestRun>, AppError> {
        Err(store_down())
    }
}
