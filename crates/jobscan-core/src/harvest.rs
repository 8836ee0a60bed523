use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::HarvestConfig;
use crate::error::AppError;
use crate::limiter::run_bounded_until;
use crate::models::{
    HarvestRun, JobRecord, NewHarvestRun, PersistenceMode, SearchQuery, WriteSummary,
    dedupe_by_natural_key,
};
use crate::report::{HarvestEvent, HarvestReporter};
use crate::source::{PageRequest, SourceKind};
use crate::traits::{Extractor, Fetcher, JobStore};

/// Outcome of one harvest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestReport {
    pub source: SourceKind,
    pub query: SearchQuery,
    pub mode: PersistenceMode,
    pub pages_planned: usize,
    pub pages_failed: usize,
    /// Records written after noise filtering and natural-key dedup.
    pub record_count: usize,
    pub summary: WriteSummary,
    /// History entry id; `None` if the run could not be logged.
    pub run_id: Option<Uuid>,
}

struct PageHarvest {
    bytes: usize,
    records: Vec<JobRecord>,
}

/// Orchestrates a harvest: plan → bounded fetch+extract → shape → write.
///
/// Generic over the fetcher, extractor and store so the same pipeline serves
/// every source and runs against mocks in tests.
pub struct HarvestService<F, E, S>
where
    F: Fetcher,
    E: Extractor,
    S: JobStore,
{
    fetcher: F,
    extractor: E,
    store: S,
    config: HarvestConfig,
}

impl<F, E, S> HarvestService<F, E, S>
where
    F: Fetcher,
    E: Extractor,
    S: JobStore,
{
    pub fn new(fetcher: F, extractor: E, store: S, config: HarvestConfig) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            config,
        }
    }

    /// Run a full harvest for `source` and persist the result.
    ///
    /// Returns only after the store write completes. Failed pages contribute
    /// no records. Pages still running when the deadline passes count as
    /// failed; whatever settled before it is persisted. Only a store failure
    /// fails the harvest.
    pub async fn harvest<R: HarvestReporter>(
        &self,
        source: SourceKind,
        query: &SearchQuery,
        reporter: &R,
    ) -> Result<HarvestReport, AppError> {
        let descriptor = source.descriptor();
        let mode = self.config.persistence_for(source);
        let pages = descriptor.plan(query);
        let started_at = Utc::now();

        reporter.report(HarvestEvent::Started {
            source,
            query,
            pages: pages.len(),
            mode,
        });

        let outcomes = self.harvest_pages(&pages).await;

        let mut pages_failed = 0;
        let mut collected = Vec::new();
        for (page, outcome) in pages.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| Err(self.deadline_error()));
            match outcome {
                Ok(harvest) => {
                    reporter.report(HarvestEvent::PageFetched {
                        source,
                        page: page.page,
                        bytes: harvest.bytes,
                        records: harvest.records.len(),
                    });
                    collected.extend(harvest.records);
                }
                Err(error) => {
                    pages_failed += 1;
                    reporter.report(HarvestEvent::PageFailed {
                        source,
                        page: page.page,
                        error: &error,
                    });
                }
            }
        }

        let records = dedupe_by_natural_key(
            collected
                .into_iter()
                .filter(|r| !r.is_noise())
                .map(|r| r.with_query(query))
                .collect(),
        );

        let summary = match mode {
            PersistenceMode::Replace => self.store.replace_all(source, &records).await?,
            PersistenceMode::Upsert => self.store.upsert(source, &records).await?,
        };
        reporter.report(HarvestEvent::Persisted {
            source,
            mode,
            summary: &summary,
        });

        let run = NewHarvestRun {
            source,
            query: query.clone(),
            persistence_mode: mode,
            pages_planned: pages.len() as u32,
            pages_failed: pages_failed as u32,
            record_count: records.len() as u32,
            summary,
            started_at,
        };
        let run_id = match self.store.record_harvest(&run).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(%source, error = %e, "Failed to record harvest run");
                None
            }
        };

        reporter.report(HarvestEvent::Completed {
            source,
            record_count: records.len(),
            pages_failed,
        });

        Ok(HarvestReport {
            source,
            query: query.clone(),
            mode,
            pages_planned: pages.len(),
            pages_failed,
            record_count: records.len(),
            summary,
            run_id,
        })
    }

    /// Stored records for a source, identifiers stripped.
    pub async fn list(&self, source: SourceKind) -> Result<Vec<JobRecord>, AppError> {
        self.store.find_all(source).await
    }

    /// Recent harvest runs for a source, newest first.
    pub async fn history(
        &self,
        source: SourceKind,
        limit: usize,
    ) -> Result<Vec<HarvestRun>, AppError> {
        self.store.harvest_history(source, limit).await
    }

    /// Fetch and extract every page, `None` for pages cut off by the deadline.
    async fn harvest_pages(
        &self,
        pages: &[PageRequest],
    ) -> Vec<Option<Result<PageHarvest, AppError>>> {
        let tasks: Vec<_> = pages
            .iter()
            .cloned()
            .map(|page| {
                let fetcher = self.fetcher.clone();
                let extractor = self.extractor.clone();
                async move {
                    let html = fetcher.fetch(&page).await?;
                    let records = extractor.extract(&html, page.source);
                    Ok::<_, AppError>(PageHarvest {
                        bytes: html.len(),
                        records,
                    })
                }
            })
            .collect();

        let deadline = self.config.deadline.map(|d| Instant::now() + d);
        let slots = run_bounded_until(tasks, self.config.max_in_flight, deadline).await;

        let unfinished = slots.iter().filter(|slot| slot.is_none()).count();
        if unfinished > 0 {
            tracing::warn!(
                unfinished,
                deadline_secs = self.deadline_secs(),
                "Harvest deadline reached, keeping settled pages"
            );
        }
        slots
    }

    fn deadline_secs(&self) -> u64 {
        self.config.deadline.map_or(0, |d| d.as_secs())
    }

    fn deadline_error(&self) -> AppError {
        AppError::Timeout(self.deadline_secs())
    }
}
