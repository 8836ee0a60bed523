pub mod config;
pub mod error;
pub mod harvest;
pub mod layout;
pub mod limiter;
pub mod memory;
pub mod models;
pub mod report;
pub mod source;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::HarvestConfig;
pub use error::AppError;
pub use harvest::{HarvestReport, HarvestService};
pub use memory::MemoryStore;
pub use models::{
    HarvestRun, JobRecord, NewHarvestRun, PersistenceMode, SearchQuery, WriteSummary,
};
pub use report::{HarvestEvent, HarvestReporter, SilentReporter, TracingHarvestReporter};
pub use source::{PageRequest, SourceDescriptor, SourceKind};
pub use traits::{Extractor, Fetcher, JobStore};
