use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{HarvestRun, JobRecord, NewHarvestRun, WriteSummary};
use crate::source::{PageRequest, SourceKind};

/// Fetches the raw HTML of one job board page.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, page: &PageRequest) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Turns a page of HTML into listings using a source's selector rules.
///
/// Implementations never fail on content: a field whose selector matches
/// nothing is `None`, and a page with no listings yields an empty vector.
pub trait Extractor: Send + Sync + Clone {
    fn extract(&self, html: &str, source: SourceKind) -> Vec<JobRecord>;
}

/// Persists and retrieves per-source listing collections.
pub trait JobStore: Send + Sync + Clone {
    /// Swap the source's whole collection for `records` in one atomic step.
    fn replace_all(
        &self,
        source: SourceKind,
        records: &[JobRecord],
    ) -> impl Future<Output = Result<WriteSummary, AppError>> + Send;

    /// Update records matching on natural key, insert the rest, in one batch.
    fn upsert(
        &self,
        source: SourceKind,
        records: &[JobRecord],
    ) -> impl Future<Output = Result<WriteSummary, AppError>> + Send;

    /// All records for a source in storage order.
    fn find_all(
        &self,
        source: SourceKind,
    ) -> impl Future<Output = Result<Vec<JobRecord>, AppError>> + Send;

    /// Append a completed harvest to the run history. Returns the run id.
    fn record_harvest(
        &self,
        run: &NewHarvestRun,
    ) -> impl Future<Output = Result<Uuid, AppError>> + Send;

    /// Most recent harvest runs for a source, newest first.
    fn harvest_history(
        &self,
        source: SourceKind,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<HarvestRun>, AppError>> + Send;
}
