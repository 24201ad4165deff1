//! # Campusdesk Enrollment
//!
//! Places students into capacity-bounded sections, moves them between
//! sections and keeps the cached occupancy counters consistent.
//!
//! - [`capacity`]: the capacity invariant check
//! - [`placement`]: section selection under a [`PlacementPolicy`](campusdesk_models::PlacementPolicy)
//! - [`coordinator`]: enrollment with conditional write, retry and compensation; withdrawal
//! - [`transfer`]: capacity-checked moves between sections
//! - [`sections`]: section creation, capacity changes, teacher assignment, deletion
//! - [`reconciler`]: counter recomputation and the full sweep
//! - [`store`]: the persistence boundary, with [`memory::InMemoryStore`] for tests
//!
//! # Example
//!
//! ```ignore
//! use campusdesk_enrollment::{EnrollmentEngine, EnrollmentRequest, OrganizationScope};
//!
//! let engine = EnrollmentEngine::new(store, notifier, EnrollmentConfig::from_env());
//! let enrollment = engine
//!     .enrollments
//!     .enroll(OrganizationScope::Only(org_id), request)
//!     .await?;
//! ```

use std::sync::Arc;

use campusdesk_config::EnrollmentConfig;

pub mod capacity;
pub mod coordinator;
pub mod error;
pub mod memory;
pub mod notifier;
pub mod placement;
pub mod reconciler;
pub mod scope;
pub mod sections;
pub mod store;
pub mod transfer;

pub use coordinator::{Enrollment, EnrollmentCoordinator, EnrollmentRequest};
pub use error::{EnrollmentError, StoreError};
pub use memory::InMemoryStore;
pub use notifier::{CredentialsIssued, LogNotifier, Notifier};
pub use reconciler::StatsReconciler;
pub use scope::OrganizationScope;
pub use sections::SectionAdmin;
pub use store::{AppendOutcome, CapacityUpdate, EnrollmentStore, SectionRemoval};
pub use transfer::{Transfer, TransferCoordinator};

/// All engine services over one shared store.
#[derive(Clone)]
pub struct EnrollmentEngine {
    pub enrollments: EnrollmentCoordinator,
    pub transfers: TransferCoordinator,
    pub sections: SectionAdmin,
    pub reconciler: StatsReconciler,
}

impl EnrollmentEngine {
    pub fn new(
        store: Arc<dyn EnrollmentStore>,
        notifier: Arc<dyn Notifier>,
        config: EnrollmentConfig,
    ) -> Self {
        let reconciler =
            StatsReconciler::new(Arc::clone(&store)).with_orphan_grace(config.orphan_grace);
        Self {
            enrollments: EnrollmentCoordinator::new(
                Arc::clone(&store),
                reconciler.clone(),
                notifier,
                config.clone(),
            ),
            transfers: TransferCoordinator::new(Arc::clone(&store), reconciler.clone()),
            sections: SectionAdmin::new(store, reconciler.clone(), config),
            reconciler,
        }
    }
}
