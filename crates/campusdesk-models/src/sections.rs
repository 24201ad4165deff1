//! Section models and DTOs.
//!
//! A section carries two views of its occupancy:
//!
//! - `member_count`: the size of the membership set at read time (source of truth)
//! - `current_student_count` / `available_seats`: cached counters republished by
//!   the stats reconciler, possibly stale between a write and its reconciliation

use crate::ids::{ClassId, OrganizationId, SectionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

pub const MIN_SECTION_CAPACITY: i32 = 1;
pub const MAX_SECTION_CAPACITY: i32 = 50;
pub const DEFAULT_SECTION_CAPACITY: i32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Section {
    pub id: SectionId,
    pub class_id: ClassId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub max_students: i32,
    pub teacher_id: Option<UserId>,
    pub member_count: i32,
    pub current_student_count: i32,
    pub available_seats: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Section {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn live_available_seats(&self) -> i32 {
        (self.max_students - self.member_count).max(0)
    }

    pub fn occupancy(&self) -> SectionOccupancy {
        SectionOccupancy {
            section_id: self.id,
            name: self.name.clone(),
            max_students: self.max_students,
            current_student_count: self.member_count,
            available_seats: self.live_available_seats(),
            teacher_id: self.teacher_id,
        }
    }
}

/// Occupancy computed from the membership set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SectionOccupancy {
    pub section_id: SectionId,
    pub name: String,
    pub max_students: i32,
    pub current_student_count: i32,
    pub available_seats: i32,
    pub teacher_id: Option<UserId>,
}

/// Section as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SectionView {
    pub id: SectionId,
    pub class_id: ClassId,
    pub name: String,
    pub max_students: i32,
    pub current_student_count: i32,
    pub available_seats: i32,
    pub teacher_id: Option<UserId>,
}

impl From<&Section> for SectionView {
    fn from(section: &Section) -> Self {
        Self {
            id: section.id,
            class_id: section.class_id,
            name: section.name.clone(),
            max_students: section.max_students,
            current_student_count: section.member_count,
            available_seats: section.live_available_seats(),
            teacher_id: section.teacher_id,
        }
    }
}

/// Fields for a new, empty section.
#[derive(Debug, Clone)]
pub struct NewSection {
    pub class_id: ClassId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub max_students: i32,
}

/// Section names are a single uppercase ASCII letter.
pub fn is_valid_section_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase())
}

pub fn validate_section_name(name: &str) -> Result<(), ValidationError> {
    if is_valid_section_name(name) {
        Ok(())
    } else {
        let mut err = ValidationError::new("section_name");
        err.message = Some("name must be a single uppercase letter".into());
        Err(err)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSectionDto {
    #[validate(custom(function = "validate_section_name"))]
    pub name: String,
    /// Defaults to the organization's default section capacity.
    #[validate(range(min = 1, max = 50))]
    pub max_students: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSectionCapacityDto {
    #[validate(range(min = 1, max = 50))]
    pub max_students: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignTeacherDto {
    /// `null` clears the current teacher.
    pub teacher_id: Option<UserId>,
}
