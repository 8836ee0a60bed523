use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    HarvestRun, JobRecord, NaturalKey, NewHarvestRun, WriteSummary, dedupe_by_natural_key,
};
use crate::source::SourceKind;
use crate::traits::JobStore;

/// In-process [`JobStore`] for dry runs and tests.
///
/// Replace is a single swap under the write lock, so readers never observe
/// an empty intermediate collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    listings: HashMap<SourceKind, Vec<JobRecord>>,
    runs: Vec<HarvestRun>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryStore {
    async fn replace_all(
        &self,
        source: SourceKind,
        records: &[JobRecord],
    ) -> Result<WriteSummary, AppError> {
        let fresh = dedupe_by_natural_key(records.to_vec());
        let inserted = fresh.len() as u64;

        let mut state = self.state.write().await;
        let previous = state.listings.insert(source, fresh).unwrap_or_default();

        Ok(WriteSummary {
            inserted,
            deleted: previous.len() as u64,
            ..WriteSummary::default()
        })
    }

    async fn upsert(
        &self,
        source: SourceKind,
        records: &[JobRecord],
    ) -> Result<WriteSummary, AppError> {
        let incoming = dedupe_by_natural_key(records.to_vec());

        let mut state = self.state.write().await;
        let collection = state.listings.entry(source).or_default();
        let index: HashMap<NaturalKey, usize> = collection
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.natural_key(), pos))
            .collect();

        let mut summary = WriteSummary::default();
        for record in incoming {
            match index.get(&record.natural_key()) {
                Some(&pos) if collection[pos] == record => summary.unchanged += 1,
                Some(&pos) => {
                    collection[pos] = record;
                    summary.updated += 1;
                }
                None => {
                    collection.push(record);
                    summary.inserted += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn find_all(&self, source: SourceKind) -> Result<Vec<JobRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state.listings.get(&source).cloned().unwrap_or_default())
    }

    async fn record_harvest(&self, run: &NewHarvestRun) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let mut state = self.state.write().await;
        state.runs.push(HarvestRun {
            id,
            source: run.source,
            query_title: run.query.job_title.clone(),
            query_location: run.query.location.clone(),
            persistence_mode: run.persistence_mode,
            pages_planned: run.pages_planned,
            pages_failed: run.pages_failed,
            record_count: run.record_count,
            inserted: run.summary.inserted,
            updated: run.summary.updated,
            started_at: run.started_at,
            finished_at: Utc::now(),
        });
        Ok(id)
    }

    async fn harvest_history(
        &self,
        source: SourceKind,
        limit: usize,
    ) -> Result<Vec<HarvestRun>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .runs
            .iter()
            .rev()
            .filter(|run| run.source == source)
            .take(limit)
            .cloned()
            .collect())
    }
}
