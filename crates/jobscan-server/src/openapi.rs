use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "jobscan API",
        version = "0.1.0",
        description = "Job-board harvesting through a scraping proxy, with per-source listing storage."
    ),
    paths(
        crate::routes::fetch_jobs,
        crate::routes::list_jobs,
        crate::routes::harvest_history,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::FetchJobsRequest,
        crate::dto::FetchJobsResponse,
        crate::dto::JobListingResponse,
        crate::dto::HarvestRunResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "harvest", description = "Trigger harvests and inspect run history"),
        (name = "listings", description = "Stored job listings"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the Bearer token security scheme to the OpenAPI document.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "Harvest trigger token. Required only when JOBSCAN_ADMIN_TOKEN is set.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
