use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use jobscan_core::models::{HarvestRun, JobRecord, PersistenceMode};
use jobscan_core::source::SourceKind;

// ---------------------------------------------------------------------------
// Harvest
// ---------------------------------------------------------------------------

/// Search parameters. Both are optional for sources that apply defaults.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct FetchJobsRequest {
    #[serde(default, alias = "jobTitle")]
    pub job_title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchJobsResponse {
    pub message: String,
    /// Records written by this harvest.
    pub job_count: usize,
    pub inserted: u64,
    pub updated: u64,
    pub pages_failed: usize,
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobListingResponse {
    #[schema(value_type = String, example = "Glassdoor")]
    pub source: SourceKind,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub posted_ago: Option<String>,
    pub salary: Option<String>,
    pub logo_url: Option<String>,
    pub apply_status: Option<String>,
    pub query_title: Option<String>,
    pub query_location: Option<String>,
}

impl From<JobRecord> for JobListingResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            source: record.source,
            title: record.title,
            company: record.company,
            location: record.location,
            description: record.description,
            link: record.link,
            posted_ago: record.posted_ago,
            salary: record.salary,
            logo_url: record.logo_url,
            apply_status: record.apply_status,
            query_title: record.query_title,
            query_location: record.query_location,
        }
    }
}

// ---------------------------------------------------------------------------
// Harvest history
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of runs to return (default 10, max 100).
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HarvestRunResponse {
    pub id: Uuid,
    #[schema(value_type = String, example = "Glassdoor")]
    pub source: SourceKind,
    pub query_title: String,
    pub query_location: String,
    #[schema(value_type = String, example = "replace")]
    pub persistence_mode: PersistenceMode,
    pub pages_planned: u32,
    pub pages_failed: u32,
    pub record_count: u32,
    pub inserted: u64,
    pub updated: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl From<HarvestRun> for HarvestRunResponse {
    fn from(run: HarvestRun) -> Self {
        Self {
            id: run.id,
            source: run.source,
            query_title: run.query_title,
            query_location: run.query_location,
            persistence_mode: run.persistence_mode,
            pages_planned: run.pages_planned,
            pages_failed: run.pages_failed,
            record_count: run.record_count,
            inserted: run.inserted,
            updated: run.updated,
            started_at: run.started_at,
            finished_at: run.finished_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
