//! Section administration limited to what touches capacity and placement.

use std::sync::Arc;

use campusdesk_config::EnrollmentConfig;
use campusdesk_core::Role;
use campusdesk_models::ids::{ClassId, SectionId, UserId};
use campusdesk_models::sections::{
    MAX_SECTION_CAPACITY, MIN_SECTION_CAPACITY, NewSection, Section, is_valid_section_name,
};
use tracing::{info, instrument};

use crate::error::EnrollmentError;
use crate::reconciler::StatsReconciler;
use crate::scope::OrganizationScope;
use crate::store::{CapacityUpdate, EnrollmentStore, SectionRemoval};

#[derive(Clone)]
pub struct SectionAdmin {
    store: Arc<dyn EnrollmentStore>,
    reconciler: StatsReconciler,
    config: EnrollmentConfig,
}

fn validate_capacity(max_students: i32) -> Result<(), EnrollmentError> {
    if (MIN_SECTION_CAPACITY..=MAX_SECTION_CAPACITY).contains(&max_students) {
        Ok(())
    } else {
        Err(EnrollmentError::Validation(format!(
            "max_students must be between {MIN_SECTION_CAPACITY} and {MAX_SECTION_CAPACITY}"
        )))
    }
}

impl SectionAdmin {
    pub fn new(
        store: Arc<dyn EnrollmentStore>,
        reconciler: StatsReconciler,
        config: EnrollmentConfig,
    ) -> Self {
        Self {
            store,
            reconciler,
            config,
        }
    }

    /// Creates an empty section. Without an explicit limit the organization's
    /// default capacity applies, then the configured default.
    #[instrument(skip(self, scope))]
    pub async fn create_section(
        &self,
        scope: OrganizationScope,
        class_id: ClassId,
        name: &str,
        max_students: Option<i32>,
    ) -> Result<Section, EnrollmentError> {
        let class = self
            .store
            .get_class(class_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("class", class_id))?;
        scope.check(class.organization_id)?;

        if !is_valid_section_name(name) {
            return Err(EnrollmentError::Validation(
                "section name must be a single uppercase letter".to_string(),
            ));
        }

        let max_students = match max_students {
            Some(max) => max,
            None => self
                .store
                .get_organization(class.organization_id)
                .await?
                .and_then(|org| org.default_section_capacity)
                .unwrap_or(self.config.default_section_capacity),
        };
        validate_capacity(max_students)?;

        let section = self
            .store
            .create_section(NewSection {
                class_id: class.id,
                organization_id: class.organization_id,
                name: name.to_string(),
                max_students,
            })
            .await?;

        info!(section_id = %section.id, name, max_students, "Section created");
        Ok(section)
    }

    /// Changes the limit. Rejected when the section already holds more
    /// students than the new limit.
    #[instrument(skip(self, scope))]
    pub async fn set_capacity(
        &self,
        scope: OrganizationScope,
        section_id: SectionId,
        max_students: i32,
    ) -> Result<Section, EnrollmentError> {
        validate_capacity(max_students)?;
        let section = self.load_section(scope, section_id).await?;

        match self.store.set_section_capacity(section.id, max_students).await? {
            CapacityUpdate::Applied(_) => {}
            CapacityUpdate::BelowOccupancy { members } => {
                return Err(EnrollmentError::Validation(format!(
                    "section {} has {members} students, more than the requested limit of {max_students}",
                    section.name
                )));
            }
            CapacityUpdate::SectionUnavailable => {
                return Err(EnrollmentError::not_found("section", section_id));
            }
        }

        self.reconciler.reconcile_after_write(section_id).await;
        self.fresh(section_id).await
    }

    /// Sets or clears the section's teacher.
    #[instrument(skip(self, scope))]
    pub async fn assign_teacher(
        &self,
        scope: OrganizationScope,
        section_id: SectionId,
        teacher_id: Option<UserId>,
    ) -> Result<Section, EnrollmentError> {
        let section = self.load_section(scope, section_id).await?;

        if let Some(teacher_id) = teacher_id {
            let teacher = self
                .store
                .get_user(teacher_id)
                .await?
                .filter(|u| u.is_active())
                .ok_or_else(|| EnrollmentError::not_found("user", teacher_id))?;
            if teacher.role != Role::Teacher {
                return Err(EnrollmentError::InvalidRoleAssignment {
                    user_id: teacher_id,
                    expected: Role::Teacher,
                    actual: teacher.role,
                });
            }
            if teacher.organization_id != Some(section.organization_id) {
                return Err(EnrollmentError::CrossOrganizationViolation(
                    "teacher belongs to another organization".to_string(),
                ));
            }
        }

        if !self.store.set_section_teacher(section_id, teacher_id).await? {
            return Err(EnrollmentError::not_found("section", section_id));
        }
        self.fresh(section_id).await
    }

    /// Soft-deletes an empty section.
    #[instrument(skip(self, scope))]
    pub async fn delete_section(
        &self,
        scope: OrganizationScope,
        section_id: SectionId,
    ) -> Result<(), EnrollmentError> {
        let section = self.load_section(scope, section_id).await?;

        match self.store.soft_delete_section_if_empty(section_id).await? {
            SectionRemoval::Deleted => {}
            SectionRemoval::NotEmpty { members } => {
                return Err(EnrollmentError::SectionNotEmpty {
                    section_id,
                    members,
                });
            }
            SectionRemoval::SectionUnavailable => {
                return Err(EnrollmentError::not_found("section", section_id));
            }
        }

        self.reconciler
            .reconcile_class_after_write(section.class_id)
            .await;
        info!(%section_id, "Section deleted");
        Ok(())
    }

    async fn load_section(
        &self,
        scope: OrganizationScope,
        section_id: SectionId,
    ) -> Result<Section, EnrollmentError> {
        let section = self
            .store
            .get_section(section_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("section", section_id))?;
        scope.check(section.organization_id)?;
        Ok(section)
    }

    async fn fresh(&self, section_id: SectionId) -> Result<Section, EnrollmentError> {
        self.store
            .get_section(section_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("section", section_id))
    }
}
