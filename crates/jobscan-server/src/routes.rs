use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use jobscan_core::TracingHarvestReporter;
use jobscan_core::source::SourceKind;

use crate::auth::require_admin_token;
use crate::dto::{
    FetchJobsRequest, FetchJobsResponse, HarvestRunResponse, HealthResponse, HistoryQuery,
    JobListingResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 100;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/{source}/fetch-jobs", post(fetch_jobs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    let public = Router::new()
        .route("/api/{source}/harvests", get(harvest_history))
        .route("/api/{source}/{listing}", get(list_jobs))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(protected).with_state(state)
}

fn parse_source(slug: &str) -> Result<SourceKind, ApiError> {
    slug.parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown job source '{slug}'")))
}

// ---------------------------------------------------------------------------
// Harvest
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/{source}/fetch-jobs",
    params(("source" = String, Path, description = "linkedin, indeed, glassdoor or stepstone")),
    request_body = FetchJobsRequest,
    responses(
        (status = 200, description = "Harvest completed and stored", body = FetchJobsResponse),
        (status = 400, description = "Missing search fields or malformed body", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown source", body = crate::dto::ErrorResponse),
        (status = 500, description = "Harvest failed", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "harvest"
)]
pub async fn fetch_jobs(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let source = parse_source(&source)?;

    // An absent body means "use the defaults".
    let request: FetchJobsRequest = if body.iter().all(u8::is_ascii_whitespace) {
        FetchJobsRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(jobscan_core::AppError::from)?
    };

    let query = source
        .descriptor()
        .resolve_query(request.job_title.as_deref(), request.location.as_deref())?;

    let report = state
        .harvester
        .harvest(source, &query, &TracingHarvestReporter)
        .await?;

    Ok(axum::Json(FetchJobsResponse {
        message: "Job fetching completed".to_string(),
        job_count: report.record_count,
        inserted: report.summary.inserted,
        updated: report.summary.updated,
        pages_failed: report.pages_failed,
    }))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/{source}/{listing}",
    params(
        ("source" = String, Path, description = "linkedin, indeed, glassdoor or stepstone"),
        ("listing" = String, Path, description = "`<source>-jobs`, e.g. `glassdoor-jobs`"),
    ),
    responses(
        (status = 200, description = "Stored listings in storage order", body = Vec<JobListingResponse>),
        (status = 404, description = "Unknown source", body = crate::dto::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::dto::ErrorResponse),
    ),
    tag = "listings"
)]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Path((source, listing)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_source(&source)?;
    if listing != format!("{}-jobs", kind.slug()) {
        return Err(ApiError::NotFound(format!(
            "No route for /api/{source}/{listing}"
        )));
    }

    let records = state.harvester.list(kind).await?;
    let body: Vec<JobListingResponse> = records.into_iter().map(Into::into).collect();
    Ok(axum::Json(body))
}

// ---------------------------------------------------------------------------
// Harvest history
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/{source}/harvests",
    params(
        ("source" = String, Path, description = "linkedin, indeed, glassdoor or stepstone"),
        HistoryQuery,
    ),
    responses(
        (status = 200, description = "Recent harvest runs, newest first", body = Vec<HarvestRunResponse>),
        (status = 404, description = "Unknown source", body = crate::dto::ErrorResponse),
    ),
    tag = "harvest"
)]
pub async fn harvest_history(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let source = parse_source(&source)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let runs = state.harvester.history(source, limit).await?;
    let body: Vec<HarvestRunResponse> = runs.into_iter().map(Into::into).collect();
    Ok(axum::Json(body))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let healthy = state.db.health_check().await.is_ok();

    let (status, response) = if healthy {
        (
            StatusCode::OK,
            HealthResponse {
                status: "healthy",
                database: "ok",
            },
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "unhealthy",
                database: "error",
            },
        )
    };

    (status, axum::Json(response))
}
