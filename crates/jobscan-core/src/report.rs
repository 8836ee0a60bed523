use crate::error::AppError;
use crate::models::{PersistenceMode, SearchQuery, WriteSummary};
use crate::source::SourceKind;

/// Events emitted by the harvest pipeline for monitoring/logging.
#[derive(Debug, Clone)]
pub enum HarvestEvent<'a> {
    Started {
        source: SourceKind,
        query: &'a SearchQuery,
        pages: usize,
        mode: PersistenceMode,
    },
    PageFetched {
        source: SourceKind,
        page: u32,
        bytes: usize,
        records: usize,
    },
    PageFailed {
        source: SourceKind,
        page: u32,
        error: &'a AppError,
    },
    Persisted {
        source: SourceKind,
        mode: PersistenceMode,
        summary: &'a WriteSummary,
    },
    Completed {
        source: SourceKind,
        record_count: usize,
        pages_failed: usize,
    },
}

/// Trait for receiving harvest events (decoupled logging).
pub trait HarvestReporter: Send + Sync {
    fn report(&self, event: HarvestEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHarvestReporter;

impl HarvestReporter for TracingHarvestReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        match event {
            HarvestEvent::Started {
                source,
                query,
                pages,
                mode,
            } => {
                tracing::info!(
                    %source,
                    job_title = %query.job_title,
                    location = %query.location,
                    %pages,
                    %mode,
                    "Harvest started"
                );
            }
            HarvestEvent::PageFetched {
                source,
                page,
                bytes,
                records,
            } => {
                tracing::debug!(%source, %page, %bytes, %records, "Page extracted");
            }
            HarvestEvent::PageFailed {
                source,
                page,
                error,
            } => {
                tracing::warn!(
                    %source,
                    %page,
                    status = ?error.upstream_status(),
                    %error,
                    "Page failed, contributing no records"
                );
            }
            HarvestEvent::Persisted {
                source,
                mode,
                summary,
            } => {
                tracing::info!(
                    %source,
                    %mode,
                    inserted = summary.inserted,
                    updated = summary.updated,
                    unchanged = summary.unchanged,
                    deleted = summary.deleted,
                    "Records persisted"
                );
            }
            HarvestEvent::Completed {
                source,
                record_count,
                pages_failed,
            } => {
                tracing::info!(%source, %record_count, %pages_failed, "Harvest completed");
            }
        }
    }
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl HarvestReporter for SilentReporter {}
