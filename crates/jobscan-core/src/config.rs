use std::collections::HashMap;
use std::time::Duration;

use crate::error::AppError;
use crate::models::PersistenceMode;
use crate::source::SourceKind;

const DEFAULT_MAX_IN_FLIGHT: usize = 5;
// Above LinkedIn's worst case: 40 pages / 5 in flight x 70s proxy timeout.
const DEFAULT_HARVEST_TIMEOUT: Duration = Duration::from_secs(900);

/// Tuning for the harvest pipeline.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Page tasks allowed to run concurrently within one harvest.
    pub max_in_flight: usize,
    /// Deadline for the whole fetch fan-out. `None` waits indefinitely.
    pub deadline: Option<Duration>,
    /// Per-source persistence mode overrides.
    pub persistence: HashMap<SourceKind, PersistenceMode>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            deadline: Some(DEFAULT_HARVEST_TIMEOUT),
            persistence: HashMap::new(),
        }
    }
}

impl HarvestConfig {
    /// Read configuration from environment variables.
    ///
    /// - `JOBSCAN_MAX_IN_FLIGHT` (optional, defaults to 5, must be >= 1)
    /// - `JOBSCAN_HARVEST_TIMEOUT_SECS` (optional, defaults to 900, 0 disables)
    /// - `JOBSCAN_<SOURCE>_PERSISTENCE` (optional, `replace` or `upsert`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads from an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let max_in_flight = match lookup("JOBSCAN_MAX_IN_FLIGHT") {
            None => DEFAULT_MAX_IN_FLIGHT,
            Some(raw) => {
                let parsed: usize = raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid JOBSCAN_MAX_IN_FLIGHT '{raw}': must be a positive integer"
                    ))
                })?;
                if parsed == 0 {
                    return Err(AppError::ConfigError(
                        "JOBSCAN_MAX_IN_FLIGHT must be at least 1".into(),
                    ));
                }
                parsed
            }
        };

        let deadline = match lookup("JOBSCAN_HARVEST_TIMEOUT_SECS") {
            None => Some(DEFAULT_HARVEST_TIMEOUT),
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid JOBSCAN_HARVEST_TIMEOUT_SECS '{raw}': must be a non-negative integer"
                    ))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        let mut persistence = HashMap::new();
        for kind in SourceKind::ALL {
            let key = format!("JOBSCAN_{}_PERSISTENCE", kind.slug().to_uppercase());
            if let Some(raw) = lookup(&key) {
                let mode = raw
                    .trim()
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(format!("{key}: {e}")))?;
                persistence.insert(kind, mode);
            }
        }

        Ok(Self {
            max_in_flight,
            deadline,
            persistence,
        })
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_persistence(mut self, source: SourceKind, mode: PersistenceMode) -> Self {
        self.persistence.insert(source, mode);
        self
    }

    /// Effective persistence mode: override if configured, else the source default.
    pub fn persistence_for(&self, source: SourceKind) -> PersistenceMode {
        self.persistence
            .get(&source)
            .copied()
            .unwrap_or(source.descriptor().persistence)
    }
}
