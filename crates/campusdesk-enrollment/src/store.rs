//! Persistence boundary of the engine.
//!
//! The engine never mutates membership or counters except through these
//! operations. The only membership-growing write is
//! [`EnrollmentStore::conditional_append_member`], which must check the
//! capacity invariant atomically at write time.

use async_trait::async_trait;
use campusdesk_models::classes::Class;
use campusdesk_models::ids::{ClassId, OrganizationId, SectionId, UserId};
use campusdesk_models::organizations::{Organization, OrganizationCounters};
use campusdesk_models::sections::{NewSection, Section};
use campusdesk_models::users::{NewStudent, User};

use crate::error::StoreError;

/// Result of a capacity-checked membership append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Membership had reached the limit at write time.
    Full { size: i32, max_students: i32 },
    AlreadyMember,
    /// Section was deleted or never existed.
    SectionUnavailable,
}

impl AppendOutcome {
    pub fn is_appended(self) -> bool {
        matches!(self, AppendOutcome::Appended)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacityUpdate {
    Applied(Section),
    /// The new limit would be below the current membership.
    BelowOccupancy { members: i32 },
    SectionUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionRemoval {
    Deleted,
    NotEmpty { members: i32 },
    SectionUnavailable,
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn get_organization(&self, id: OrganizationId)
    -> Result<Option<Organization>, StoreError>;

    async fn list_organizations(&self) -> Result<Vec<Organization>, StoreError>;

    async fn get_class(&self, id: ClassId) -> Result<Option<Class>, StoreError>;

    async fn list_classes(&self, organization_id: OrganizationId)
    -> Result<Vec<Class>, StoreError>;

    /// The class with its active sections in name order, each carrying its
    /// live `member_count`.
    async fn get_class_with_sections(
        &self,
        id: ClassId,
    ) -> Result<Option<(Class, Vec<Section>)>, StoreError>;

    /// Active (not soft-deleted) section by id.
    async fn get_section(&self, id: SectionId) -> Result<Option<Section>, StoreError>;

    async fn section_members(&self, id: SectionId) -> Result<Vec<UserId>, StoreError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn count_teachers(&self, organization_id: OrganizationId) -> Result<i64, StoreError>;

    /// Active students of the organization, oldest first.
    async fn list_students(&self, organization_id: OrganizationId) -> Result<Vec<User>, StoreError>;

    /// Adds `student_id` to the section's membership set only if the set holds
    /// fewer than `min(stored max_students, max_size)` members and does not
    /// already contain the student.
    async fn conditional_append_member(
        &self,
        section_id: SectionId,
        student_id: UserId,
        max_size: i32,
    ) -> Result<AppendOutcome, StoreError>;

    /// Returns whether the student was a member.
    async fn remove_member(
        &self,
        section_id: SectionId,
        student_id: UserId,
    ) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create_student(&self, student: NewStudent) -> Result<User, StoreError>;

    /// Hard delete, used only to discard a student whose attachment failed.
    async fn delete_student(&self, id: UserId) -> Result<(), StoreError>;

    /// Marks the student withdrawn and clears their section reference.
    /// Returns `false` when the student was already withdrawn or unknown.
    async fn soft_delete_student(&self, id: UserId) -> Result<bool, StoreError>;

    async fn set_student_section(
        &self,
        student_id: UserId,
        section_id: SectionId,
    ) -> Result<(), StoreError>;

    async fn set_section_counters(
        &self,
        id: SectionId,
        current_student_count: i32,
        available_seats: i32,
    ) -> Result<(), StoreError>;

    async fn set_class_counter(&self, id: ClassId, total_students: i64) -> Result<(), StoreError>;

    async fn set_org_counters(
        &self,
        id: OrganizationId,
        counters: OrganizationCounters,
    ) -> Result<(), StoreError>;

    /// Fails with [`StoreError::Conflict`] when the class already has an
    /// active section with that name. Counters start at `{0, max_students}`.
    async fn create_section(&self, section: NewSection) -> Result<Section, StoreError>;

    /// Applied only if the current membership fits under the new limit.
    async fn set_section_capacity(
        &self,
        id: SectionId,
        max_students: i32,
    ) -> Result<CapacityUpdate, StoreError>;

    async fn set_section_teacher(
        &self,
        id: SectionId,
        teacher_id: Option<UserId>,
    ) -> Result<bool, StoreError>;

    /// Soft delete applied only while the membership set is empty.
    async fn soft_delete_section_if_empty(&self, id: SectionId)
    -> Result<SectionRemoval, StoreError>;
}
