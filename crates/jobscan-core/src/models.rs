use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::Field;
use crate::source::SourceKind;

/// One scraped job listing.
///
/// Every field except `source` may be missing on the page and is then
/// `None`. Storage identifiers never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub source: SourceKind,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Absolute URL of the listing.
    pub link: Option<String>,
    /// Free-text recency, as shown by the board ("3 days ago", "24h").
    pub posted_ago: Option<String>,
    pub salary: Option<String>,
    pub logo_url: Option<String>,
    /// Free-text tag such as "Easy Apply".
    pub apply_status: Option<String>,
    /// Job title of the search that produced this record.
    pub query_title: Option<String>,
    /// Location of the search that produced this record.
    pub query_location: Option<String>,
}

/// Natural identity of a listing within one source.
pub type NaturalKey = (Option<String>, Option<String>, Option<String>);

impl JobRecord {
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            title: None,
            company: None,
            location: None,
            description: None,
            link: None,
            posted_ago: None,
            salary: None,
            logo_url: None,
            apply_status: None,
            query_title: None,
            query_location: None,
        }
    }

    pub fn set(&mut self, field: Field, value: Option<String>) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Company => &mut self.company,
            Field::Location => &mut self.location,
            Field::Description => &mut self.description,
            Field::Link => &mut self.link,
            Field::PostedAgo => &mut self.posted_ago,
            Field::Salary => &mut self.salary,
            Field::LogoUrl => &mut self.logo_url,
            Field::ApplyStatus => &mut self.apply_status,
        };
        *slot = value;
    }

    /// Stamp the search parameters that produced this record.
    pub fn with_query(mut self, query: &SearchQuery) -> Self {
        self.query_title = Some(query.job_title.clone());
        self.query_location = Some(query.location.clone());
        self
    }

    /// Extraction noise: no title, or neither company nor location.
    pub fn is_noise(&self) -> bool {
        self.title.is_none() || (self.company.is_none() && self.location.is_none())
    }

    /// The upsert key: `(title, company, location)`.
    pub fn natural_key(&self) -> NaturalKey {
        (
            self.title.clone(),
            self.company.clone(),
            self.location.clone(),
        )
    }
}

/// Collapse records that share a natural key.
///
/// The first occurrence keeps its position; the last occurrence's values win.
pub fn dedupe_by_natural_key(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut index: HashMap<NaturalKey, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<JobRecord> = Vec::with_capacity(records.len());

    for record in records {
        match index.get(&record.natural_key()) {
            Some(&pos) => out[pos] = record,
            None => {
                index.insert(record.natural_key(), out.len());
                out.push(record);
            }
        }
    }
    out
}

/// Resolved search parameters for one harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub job_title: String,
    pub location: String,
}

impl SearchQuery {
    pub fn new(job_title: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            job_title: job_title.into(),
            location: location.into(),
        }
    }
}

/// How a harvest's records are written to the source collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    /// Swap the whole collection for the new record set.
    Replace,
    /// Update on natural-key match, insert otherwise.
    Upsert,
}

impl PersistenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceMode::Replace => "replace",
            PersistenceMode::Upsert => "upsert",
        }
    }
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PersistenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(PersistenceMode::Replace),
            "upsert" => Ok(PersistenceMode::Upsert),
            _ => Err(format!("Unknown persistence mode: {}", s)),
        }
    }
}

/// Row counts reported by a store write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub inserted: u64,
    pub updated: u64,
    /// Upsert rows whose stored values already matched.
    pub unchanged: u64,
    /// Rows removed by a replace.
    pub deleted: u64,
}

/// A completed harvest, as recorded in the run history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestRun {
    pub id: Uuid,
    pub source: SourceKind,
    pub query_title: String,
    pub query_location: String,
    pub persistence_mode: PersistenceMode,
    pub pages_planned: u32,
    pub pages_failed: u32,
    pub record_count: u32,
    pub inserted: u64,
    pub updated: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// DTO for appending a run to the history.
#[derive(Debug, Clone)]
pub struct NewHarvestRun {
    pub source: SourceKind,
    pub query: SearchQuery,
    pub persistence_mode: PersistenceMode,
    pub pages_planned: u32,
    pub pages_failed: u32,
    pub record_count: u32,
    pub summary: WriteSummary,
    pub started_at: DateTime<Utc>,
}
