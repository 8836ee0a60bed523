use jobscan_client::{ProxyFetcher, SelectorExtractor};
use jobscan_core::{HarvestConfig, HarvestService};
use jobscan_db::{Database, JobListingRepository};

pub type Harvester = HarvestService<ProxyFetcher, SelectorExtractor, JobListingRepository>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub harvester: Harvester,
    /// Bearer token for harvest triggers (None = open).
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(
        db: Database,
        fetcher: ProxyFetcher,
        extractor: SelectorExtractor,
        config: HarvestConfig,
        admin_token: Option<String>,
    ) -> Self {
        let harvester = HarvestService::new(fetcher, extractor, db.listing_repo(), config);
        Self {
            db,
            harvester,
            admin_token,
        }
    }
}
