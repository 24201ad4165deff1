//! Enrollment, transfer and reconciliation DTOs.

use crate::ids::{ClassId, OrganizationId, SectionId, UserId};
use crate::sections::{SectionOccupancy, SectionView};
use crate::users::StudentView;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

/// How a section is chosen among those with room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// First section in name order with room.
    #[default]
    FirstFit,
    /// Section with the most available seats, ties broken by name.
    LoadBalanced,
}

impl PlacementPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            PlacementPolicy::FirstFit => "first_fit",
            PlacementPolicy::LoadBalanced => "load_balanced",
        }
    }
}

impl fmt::Display for PlacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(pub String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown placement policy: {}", self.0)
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for PlacementPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_fit" => Ok(PlacementPolicy::FirstFit),
            "load_balanced" => Ok(PlacementPolicy::LoadBalanced),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Student fields supplied by the caller; the engine fills in organization,
/// section and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Initial password. A random one is generated when absent.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EnrollStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    /// Falls back to the server's configured default.
    pub policy: Option<PlacementPolicy>,
    /// Section name tried first when it has room.
    pub preferred_section: Option<String>,
}

impl EnrollStudentDto {
    pub fn draft(&self) -> StudentDraft {
        StudentDraft {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentResponse {
    pub student: StudentView,
    pub section: SectionView,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TransferStudentDto {
    pub target_section_id: SectionId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub student_id: UserId,
    pub from_section_id: SectionId,
    pub section: SectionView,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalResponse {
    pub student_id: UserId,
    pub section_id: Option<SectionId>,
}

/// Per-class occupancy report built from membership sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CapacitySummary {
    pub class_id: ClassId,
    pub grade: String,
    pub name: String,
    pub total_capacity: i64,
    pub total_enrolled: i64,
    pub total_available: i64,
    pub sections: Vec<SectionOccupancy>,
}

impl CapacitySummary {
    pub fn new(class_id: ClassId, grade: String, name: String, sections: Vec<SectionOccupancy>) -> Self {
        let total_capacity = sections.iter().map(|s| i64::from(s.max_students)).sum();
        let total_enrolled = sections.iter().map(|s| i64::from(s.current_student_count)).sum();
        let total_available = sections.iter().map(|s| i64::from(s.available_seats)).sum();
        Self {
            class_id,
            grade,
            name,
            total_capacity,
            total_enrolled,
            total_available,
            sections,
        }
    }
}

/// Outcome of a reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReconcileReport {
    pub organizations: u64,
    pub classes: u64,
    pub sections: u64,
    /// Cached counters that disagreed with membership and were rewritten.
    pub drift_detected: u64,
    /// Membership entries removed because the student no longer belongs there.
    pub members_pruned: u64,
    /// Students whose section reference or membership was put back in line.
    pub students_repaired: u64,
    /// Student rows left behind by enrollments that failed before placement.
    pub orphans_removed: u64,
}

impl ReconcileReport {
    pub fn merge(&mut self, other: ReconcileReport) {
        self.organizations += other.organizations;
        self.classes += other.classes;
        self.sections += other.sections;
        self.drift_detected += other.drift_detected;
        self.members_pruned += other.members_pruned;
        self.students_repaired += other.students_repaired;
        self.orphans_removed += other.orphans_removed;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    pub organization_id: OrganizationId,
    pub report: ReconcileReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("first_fit".parse::<PlacementPolicy>().unwrap(), PlacementPolicy::FirstFit);
        assert_eq!(
            "Load-Balanced".parse::<PlacementPolicy>().unwrap(),
            PlacementPolicy::LoadBalanced
        );
        assert!("random".parse::<PlacementPolicy>().is_err());
    }

    #[test]
    fn test_policy_serde() {
        let policy: PlacementPolicy = serde_json::from_str(r#""load_balanced""#).unwrap();
        assert_eq!(policy, PlacementPolicy::LoadBalanced);
        assert_eq!(serde_json::to_string(&PlacementPolicy::FirstFit).unwrap(), r#""first_fit""#);
    }

    #[test]
    fn test_enroll_dto_validation() {
        let dto = EnrollStudentDto {
            first_name: "Tunde".into(),
            last_name: "Bello".into(),
            email: "not-an-email".into(),
            password: None,
            policy: None,
            preferred_section: None,
        };
        assert!(dto.validate().is_err());

        let dto = EnrollStudentDto {
            first_name: " Tunde ".into(),
            email: "Tunde@Example.com".into(),
            ..dto
        };
        assert!(dto.validate().is_ok());
        let draft = dto.draft();
        assert_eq!(draft.first_name, "Tunde");
        assert_eq!(draft.email, "tunde@example.com");
    }

    #[test]
    fn test_short_password_rejected() {
        let dto = EnrollStudentDto {
            first_name: "Tunde".into(),
            last_name: "Bello".into(),
            email: "tunde@example.com".into(),
            password: Some("short".into()),
            policy: None,
            preferred_section: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_summary_totals() {
        let sections = vec![
            SectionOccupancy {
                section_id: SectionId::new(),
                name: "A".into(),
                max_students: 2,
                current_student_count: 2,
                available_seats: 0,
                teacher_id: None,
            },
            SectionOccupancy {
                section_id: SectionId::new(),
                name: "B".into(),
                max_students: 30,
                current_student_count: 5,
                available_seats: 25,
                teacher_id: None,
            },
        ];
        let summary = CapacitySummary::new(ClassId::new(), "JSS1".into(), "Gold".into(), sections);
        assert_eq!(summary.total_capacity, 32);
        assert_eq!(summary.total_enrolled, 7);
        assert_eq!(summary.total_available, 25);
    }
}
