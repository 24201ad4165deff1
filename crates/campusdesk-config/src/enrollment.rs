//! Enrollment engine configuration.
//!
//! # Environment Variables
//!
//! - `ENROLLMENT_MAX_ATTEMPTS`: attempts per enrollment before a capacity race is reported (default: 3)
//! - `DEFAULT_SECTION_CAPACITY`: section size used when an organization sets none (default: 30)
//! - `RECONCILE_SWEEP_INTERVAL_SECS`: period of the background reconciliation sweep, `0` disables it (default: 300)
//! - `PASSWORD_HASH_COST`: bcrypt cost for generated student credentials (default: 12)
//! - `DEFAULT_PLACEMENT_POLICY`: `first_fit` or `load_balanced` (default: `first_fit`)
//! - `ORPHAN_GRACE_SECS`: age a student row must reach before the sweep repairs or removes it when no section lists it (default: 300)

use std::time::Duration;

use campusdesk_models::sections::{MAX_SECTION_CAPACITY, MIN_SECTION_CAPACITY};
use campusdesk_models::PlacementPolicy;
use tracing::warn;

use crate::env_or;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_SECTION_CAPACITY: i32 = 30;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_PASSWORD_HASH_COST: u32 = 12;
pub const DEFAULT_ORPHAN_GRACE_SECS: u64 = 300;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrollmentConfig {
    /// Total attempts (not retries) for one enrollment under contention.
    pub max_attempts: u32,
    pub default_section_capacity: i32,
    /// `None` disables the periodic sweep.
    pub sweep_interval: Option<Duration>,
    pub password_hash_cost: u32,
    pub default_policy: PlacementPolicy,
    /// Students younger than this may still be mid-enrollment; the sweep
    /// leaves them alone.
    pub orphan_grace: Duration,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            default_section_capacity: DEFAULT_SECTION_CAPACITY,
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)),
            password_hash_cost: DEFAULT_PASSWORD_HASH_COST,
            default_policy: PlacementPolicy::FirstFit,
            orphan_grace: Duration::from_secs(DEFAULT_ORPHAN_GRACE_SECS),
        }
    }
}

impl EnrollmentConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let sweep_secs: u64 = env_or("RECONCILE_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);

        let default_policy = match std::env::var("DEFAULT_PLACEMENT_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Unknown DEFAULT_PLACEMENT_POLICY, falling back to first_fit");
                PlacementPolicy::FirstFit
            }),
            Err(_) => PlacementPolicy::FirstFit,
        };

        Self {
            max_attempts: env_or("ENROLLMENT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1),
            default_section_capacity: env_or("DEFAULT_SECTION_CAPACITY", DEFAULT_SECTION_CAPACITY)
                .clamp(MIN_SECTION_CAPACITY, MAX_SECTION_CAPACITY),
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            password_hash_cost: env_or("PASSWORD_HASH_COST", DEFAULT_PASSWORD_HASH_COST),
            default_policy,
            orphan_grace: Duration::from_secs(env_or("ORPHAN_GRACE_SECS", DEFAULT_ORPHAN_GRACE_SECS)),
        }
    }

    /// Cheap hashing for tests and local seeding.
    pub fn with_password_hash_cost(mut self, cost: u32) -> Self {
        self.password_hash_cost = cost;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}
