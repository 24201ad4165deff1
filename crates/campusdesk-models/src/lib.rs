//! # Campusdesk Models
//!
//! Domain models and DTOs shared by the engine, the store and the HTTP layer.
//!
//! # Modules
//!
//! - [`ids`]: strongly-typed UUID wrappers
//! - [`organizations`]: tenants and their cached counters
//! - [`classes`]: grade-level groupings
//! - [`sections`]: capacity-bounded sections and section DTOs
//! - [`users`]: users and student views
//! - [`enrollment`]: placement policy, enrollment/transfer DTOs, reports

pub mod classes;
pub mod enrollment;
pub mod ids;
pub mod organizations;
pub mod sections;
pub mod users;

pub use classes::Class;
pub use enrollment::{
    CapacitySummary, EnrollStudentDto, EnrollmentResponse, ParsePolicyError, PlacementPolicy,
    ReconcileReport, ReconcileResponse, StudentDraft, TransferResponse, TransferStudentDto,
    WithdrawalResponse,
};
pub use ids::{ClassId, OrganizationId, SectionId, UserId};
pub use organizations::{Organization, OrganizationCounters};
pub use sections::{
    AssignTeacherDto, CreateSectionDto, NewSection, Section, SectionOccupancy, SectionView,
    UpdateSectionCapacityDto,
};
pub use users::{NewStudent, StudentView, User};
