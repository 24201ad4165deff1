use campusdesk_core::{AppError, Role};
use campusdesk_models::ids::{SectionId, UserId};
use campusdesk_models::sections::SectionOccupancy;
use serde_json::json;
use thiserror::Error;

/// Failures reported by an [`EnrollmentStore`](crate::EnrollmentStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("no section has room for {requested} more student(s)")]
    NoCapacity {
        requested: i32,
        occupancy: Vec<SectionOccupancy>,
    },

    #[error("section placement was contended for {attempts} attempts, retry the request")]
    CapacityRace { attempts: u32 },

    #[error("{0}")]
    CrossOrganizationViolation(String),

    #[error("student is already in section {}", .occupancy.name)]
    AlreadyInSection { occupancy: SectionOccupancy },

    #[error("user {user_id} has role {actual}, expected {expected}")]
    InvalidRoleAssignment {
        user_id: UserId,
        expected: Role,
        actual: Role,
    },

    #[error("cached count for section {section_id} was {cached}, membership holds {actual}")]
    StatsDriftDetected {
        section_id: SectionId,
        cached: i32,
        actual: i32,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("section {section_id} still has {members} student(s)")]
    SectionNotEmpty { section_id: SectionId, members: i32 },

    #[error("failed to prepare credentials: {0}")]
    Credentials(String),

    #[error(transparent)]
    Store(StoreError),
}

impl EnrollmentError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Only contention is worth retrying; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CapacityRace { .. })
    }

    /// Label used on the outcome metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NoCapacity { .. } => "no_capacity",
            Self::CapacityRace { .. } => "capacity_race",
            Self::CrossOrganizationViolation(_) => "cross_organization",
            Self::AlreadyInSection { .. } => "already_in_section",
            Self::InvalidRoleAssignment { .. } => "invalid_role",
            Self::StatsDriftDetected { .. } => "stats_drift",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::SectionNotEmpty { .. } => "section_not_empty",
            Self::Credentials(_) => "credentials",
            Self::Store(_) => "store",
        }
    }
}

impl From<StoreError> for EnrollmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::Conflict(message),
            other => Self::Store(other),
        }
    }
}

impl From<EnrollmentError> for AppError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::NotFound { .. } => AppError::not_found(err),
            EnrollmentError::NoCapacity { ref occupancy, requested } => {
                let details = json!({ "requested": requested, "sections": occupancy });
                AppError::conflict(err).with_details(details)
            }
            EnrollmentError::AlreadyInSection { ref occupancy } => {
                let details = json!({ "section": occupancy });
                AppError::conflict(err).with_details(details)
            }
            EnrollmentError::CapacityRace { attempts } => AppError::service_unavailable(err)
                .with_details(json!({ "retryable": true, "attempts": attempts })),
            EnrollmentError::CrossOrganizationViolation(message) => AppError::forbidden(message),
            EnrollmentError::InvalidRoleAssignment { .. } | EnrollmentError::Validation(_) => {
                AppError::unprocessable(err)
            }
            EnrollmentError::Conflict(_) => AppError::conflict(err),
            EnrollmentError::SectionNotEmpty { members, .. } => {
                AppError::conflict(err).with_details(json!({ "members": members }))
            }
            EnrollmentError::StatsDriftDetected { .. }
            | EnrollmentError::Credentials(_)
            | EnrollmentError::Store(_) => AppError::internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupancy(name: &str, max: i32, current: i32) -> SectionOccupancy {
        SectionOccupancy {
            section_id: SectionId::new(),
            name: name.to_string(),
            max_students: max,
            current_student_count: current,
            available_seats: max - current,
            teacher_id: None,
        }
    }

    #[test]
    fn test_no_capacity_is_conflict_with_occupancy() {
        let err = EnrollmentError::NoCapacity {
            requested: 1,
            occupancy: vec![occupancy("A", 2, 2), occupancy("B", 2, 2)],
        };
        let app: AppError = err.into();
        assert_eq!(app.status.as_u16(), 409);
        let details = app.details.unwrap();
        assert_eq!(details["sections"].as_array().unwrap().len(), 2);
        assert_eq!(details["sections"][0]["available_seats"], 0);
    }

    #[test]
    fn test_capacity_race_is_retryable() {
        let err = EnrollmentError::CapacityRace { attempts: 3 };
        assert!(err.is_retryable());
        let app: AppError = err.into();
        assert_eq!(app.status.as_u16(), 503);
        assert_eq!(app.details.unwrap()["retryable"], true);
    }

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(EnrollmentError, u16)> = vec![
            (EnrollmentError::not_found("class", "x"), 404),
            (EnrollmentError::CrossOrganizationViolation("nope".into()), 403),
            (EnrollmentError::Validation("bad".into()), 422),
            (
                EnrollmentError::InvalidRoleAssignment {
                    user_id: UserId::new(),
                    expected: Role::Teacher,
                    actual: Role::Student,
                },
                422,
            ),
            (EnrollmentError::Conflict("dup".into()), 409),
            (
                EnrollmentError::AlreadyInSection {
                    occupancy: occupancy("A", 30, 1),
                },
                409,
            ),
            (EnrollmentError::Store(StoreError::Database("down".into())), 500),
        ];
        for (err, status) in cases {
            assert!(!err.is_retryable());
            let app: AppError = err.into();
            assert_eq!(app.status.as_u16(), status);
        }
    }

    #[test]
    fn test_store_conflict_becomes_conflict() {
        let err: EnrollmentError = StoreError::Conflict("email taken".into()).into();
        assert!(matches!(err, EnrollmentError::Conflict(_)));
        assert_eq!(err.kind(), "conflict");
    }
}
