use chrono::{DateTime, Utc};
use jobscan_core::error::AppError;
use jobscan_core::models::{
    HarvestRun, JobRecord, NewHarvestRun, WriteSummary, dedupe_by_natural_key,
};
use jobscan_core::source::SourceKind;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

const INSERT_LISTINGS: &str = r#"
    INSERT INTO job_listings (
        source, title, company, location, description, link,
        posted_ago, salary, logo_url, apply_status, query_title, query_location
    )
    SELECT $1, t.*
    FROM UNNEST(
        $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], $7::text[],
        $8::text[], $9::text[], $10::text[], $11::text[], $12::text[]
    ) AS t(
        title, company, location, description, link,
        posted_ago, salary, logo_url, apply_status, query_title, query_location
    )
    RETURNING TRUE
"#;

// Rows whose non-key columns are unchanged are skipped by the WHERE guard and
// therefore not returned.
const UPSERT_LISTINGS: &str = r#"
    INSERT INTO job_listings (
        source, title, company, location, description, link,
        posted_ago, salary, logo_url, apply_status, query_title, query_location
    )
    SELECT $1, t.*
    FROM UNNEST(
        $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], $7::text[],
        $8::text[], $9::text[], $10::text[], $11::text[], $12::text[]
    ) AS t(
        title, company, location, description, link,
        posted_ago, salary, logo_url, apply_status, query_title, query_location
    )
    ON CONFLICT ON CONSTRAINT uq_job_listings_natural_key DO UPDATE SET
        description = EXCLUDED.description,
        link = EXCLUDED.link,
        posted_ago = EXCLUDED.posted_ago,
        salary = EXCLUDED.salary,
        logo_url = EXCLUDED.logo_url,
        apply_status = EXCLUDED.apply_status,
        query_title = EXCLUDED.query_title,
        query_location = EXCLUDED.query_location,
        updated_at = NOW()
    WHERE (
        job_listings.description, job_listings.link, job_listings.posted_ago,
        job_listings.salary, job_listings.logo_url, job_listings.apply_status,
        job_listings.query_title, job_listings.query_location
    ) IS DISTINCT FROM (
        EXCLUDED.description, EXCLUDED.link, EXCLUDED.posted_ago,
        EXCLUDED.salary, EXCLUDED.logo_url, EXCLUDED.apply_status,
        EXCLUDED.query_title, EXCLUDED.query_location
    )
    RETURNING (xmax = 0)
"#;

/// Repository for job listings and harvest history in PostgreSQL.
///
/// Each source's listings form one collection keyed by
/// `(source, title, company, location)`. Storage ids and timestamps never
/// leave this module.
#[derive(Clone)]
pub struct JobListingRepository {
    pool: Pool<Postgres>,
}

impl JobListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Swap a source's listings for `records` in one transaction.
    ///
    /// On failure the transaction rolls back and the previous collection
    /// stays intact.
    pub async fn replace_all(
        &self,
        source: SourceKind,
        records: &[JobRecord],
    ) -> Result<WriteSummary, AppError> {
        let records = dedupe_by_natural_key(records.to_vec());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let deleted = sqlx::query("DELETE FROM job_listings WHERE source = $1")
            .bind(source.slug())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?
            .rows_affected();

        let inserted = if records.is_empty() {
            0
        } else {
            bind_listings(INSERT_LISTINGS, source, &records)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?
                .len() as u64
        };

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(%source, deleted, inserted, "Replaced listings");

        Ok(WriteSummary {
            inserted,
            deleted,
            ..WriteSummary::default()
        })
    }

    /// Insert new listings and update existing ones by natural key, as a
    /// single statement.
    pub async fn upsert(
        &self,
        source: SourceKind,
        records: &[JobRecord],
    ) -> Result<WriteSummary, AppError> {
        let records = dedupe_by_natural_key(records.to_vec());
        if records.is_empty() {
            return Ok(WriteSummary::default());
        }

        let touched = bind_listings(UPSERT_LISTINGS, source, &records)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let inserted = touched.iter().filter(|(fresh,)| *fresh).count() as u64;
        let updated = touched.len() as u64 - inserted;

        Ok(WriteSummary {
            inserted,
            updated,
            unchanged: records.len() as u64 - touched.len() as u64,
            deleted: 0,
        })
    }

    /// All listings for a source in insertion order.
    pub async fn find_all(&self, source: SourceKind) -> Result<Vec<JobRecord>, AppError> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT source, title, company, location, description, link,
                   posted_ago, salary, logo_url, apply_status, query_title, query_location
            FROM job_listings
            WHERE source = $1
            ORDER BY id
            "#,
        )
        .bind(source.slug())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }

    /// Append a harvest run. Returns the generated UUID.
    pub async fn record_harvest(&self, run: &NewHarvestRun) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO harvest_runs (
                source, query_title, query_location, persistence_mode,
                pages_planned, pages_failed, record_count, inserted, updated, started_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(run.source.slug())
        .bind(&run.query.job_title)
        .bind(&run.query.location)
        .bind(run.persistence_mode.as_str())
        .bind(run.pages_planned as i32)
        .bind(run.pages_failed as i32)
        .bind(run.record_count as i32)
        .bind(run.summary.inserted as i64)
        .bind(run.summary.updated as i64)
        .bind(run.started_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.0)
    }

    /// Harvest runs for a source, newest first.
    pub async fn harvest_history(
        &self,
        source: SourceKind,
        limit: usize,
    ) -> Result<Vec<HarvestRun>, AppError> {
        let rows = sqlx::query_as::<_, HarvestRunRow>(
            r#"
            SELECT id, source, query_title, query_location, persistence_mode,
                   pages_planned, pages_failed, record_count, inserted, updated,
                   started_at, finished_at
            FROM harvest_runs
            WHERE source = $1
            ORDER BY finished_at DESC
            LIMIT $2
            "#,
        )
        .bind(source.slug())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(HarvestRun::try_from).collect()
    }
}

/// Bind a record batch as one text array per column.
fn bind_listings<'q>(
    sql: &'q str,
    source: SourceKind,
    records: &[JobRecord],
) -> QueryAs<'q, Postgres, (bool,), PgArguments> {
    let column = |get: fn(&JobRecord) -> Option<String>| -> Vec<Option<String>> {
        records.iter().map(get).collect()
    };

    sqlx::query_as(sql)
        .bind(source.slug())
        .bind(column(|r| r.title.clone()))
        .bind(column(|r| r.company.clone()))
        .bind(column(|r| r.location.clone()))
        .bind(column(|r| r.description.clone()))
        .bind(column(|r| r.link.clone()))
        .bind(column(|r| r.posted_ago.clone()))
        .bind(column(|r| r.salary.clone()))
        .bind(column(|r| r.logo_url.clone()))
        .bind(column(|r| r.apply_status.clone()))
        .bind(column(|r| r.query_title.clone()))
        .bind(column(|r| r.query_location.clone()))
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ListingRow {
    source: String,
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    description: Option<String>,
    link: Option<String>,
    posted_ago: Option<String>,
    salary: Option<String>,
    logo_url: Option<String>,
    apply_status: Option<String>,
    query_title: Option<String>,
    query_location: Option<String>,
}

impl TryFrom<ListingRow> for JobRecord {
    type Error = AppError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(JobRecord {
            source: row.source.parse().map_err(AppError::DatabaseError)?,
            title: row.title,
            company: row.company,
            location: row.location,
            description: row.description,
            link: row.link,
            posted_ago: row.posted_ago,
            salary: row.salary,
            logo_url: row.logo_url,
            apply_status: row.apply_status,
            query_title: row.query_title,
            query_location: row.query_location,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HarvestRunRow {
    id: Uuid,
    source: String,
    query_title: String,
    query_location: String,
    persistence_mode: String,
    pages_planned: i32,
    pages_failed: i32,
    record_count: i32,
    inserted: i64,
    updated: i64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl TryFrom<HarvestRunRow> for HarvestRun {
    type Error = AppError;

    fn try_from(row: HarvestRunRow) -> Result<Self, Self::Error> {
        Ok(HarvestRun {
            id: row.id,
            source: row.source.parse().map_err(AppError::DatabaseError)?,
            query_title: row.query_title,
            query_location: row.query_location,
            persistence_mode: row
                .persistence_mode
                .parse()
                .map_err(AppError::DatabaseError)?,
            pages_planned: row.pages_planned as u32,
            pages_failed: row.pages_failed as u32,
            record_count: row.record_count as u32,
            inserted: row.inserted as u64,
            updated: row.updated as u64,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

// -- Trait implementation --

impl jobscan_core::traits::JobStore for JobListingRepository {
    async fn replace_all(
        &self,
        source: SourceKind,
        records: &[JobRecord],
    ) -> Result<WriteSummary, AppError> {
        JobListingRepository::replace_all(self, source, records).await
    }

    async fn upsert(
        &self,
        source: SourceKind,
        records: &[JobRecord],
    ) -> Result<WriteSummary, AppError> {
        JobListingRepository::upsert(self, source, records).await
    }

    async fn find_all(&self, source: SourceKind) -> Result<Vec<JobRecord>, AppError> {
        JobListingRepository::find_all(self, source).await
    }

    async fn record_harvest(&self, run: &NewHarvestRun) -> Result<Uuid, AppError> {
        JobListingRepository::record_harvest(self, run).await
    }

    async fn harvest_history(
        &self,
        source: SourceKind,
        limit: usize,
    ) -> Result<Vec<HarvestRun>, AppError> {
        JobListingRepository::harvest_history(self, source, limit).await
    }
}
