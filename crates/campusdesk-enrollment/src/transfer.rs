//! Moving an enrolled student between sections.

use std::sync::Arc;

use campusdesk_models::ids::{SectionId, UserId};
use campusdesk_models::sections::Section;
use campusdesk_models::users::User;
use tracing::{error, info, instrument, warn};

use crate::capacity::can_accommodate;
use crate::error::EnrollmentError;
use crate::reconciler::StatsReconciler;
use crate::scope::OrganizationScope;
use crate::store::{AppendOutcome, EnrollmentStore};

#[derive(Debug, Clone)]
pub struct Transfer {
    pub student: User,
    pub from_section_id: SectionId,
    pub section: Section,
}

#[derive(Clone)]
pub struct TransferCoordinator {
    store: Arc<dyn EnrollmentStore>,
    reconciler: StatsReconciler,
}

impl TransferCoordinator {
    pub fn new(store: Arc<dyn EnrollmentStore>, reconciler: StatsReconciler) -> Self {
        Self { store, reconciler }
    }

    /// Moves the student into `target_section_id`.
    ///
    /// The capacity-checked append to the target comes first, then the
    /// student's section reference moves, and only then the source entry is
    /// removed. A failure at any step leaves the student listed by the section
    /// their reference names. A failed source removal leaves a duplicate that
    /// the sweep prunes.
    #[instrument(skip(self, scope))]
    pub async fn transfer(
        &self,
        scope: OrganizationScope,
        student_id: UserId,
        target_section_id: SectionId,
    ) -> Result<Transfer, EnrollmentError> {
        let result = self.try_transfer(scope, student_id, target_section_id).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::counter!("transfers_total", "outcome" => outcome).increment(1);
        result
    }

    async fn try_transfer(
        &self,
        scope: OrganizationScope,
        student_id: UserId,
        target_section_id: SectionId,
    ) -> Result<Transfer, EnrollmentError> {
        let mut student = self
            .store
            .get_user(student_id)
            .await?
            .filter(User::is_active_student)
            .ok_or_else(|| EnrollmentError::not_found("student", student_id))?;
        let organization_id = student
            .organization_id
            .ok_or_else(|| EnrollmentError::not_found("student", student_id))?;
        scope.check(organization_id)?;

        let source_id = student.section_id.ok_or_else(|| {
            EnrollmentError::Validation("student is not enrolled in a section".to_string())
        })?;

        let target = self
            .store
            .get_section(target_section_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("section", target_section_id))?;

        if target.id == source_id {
            return Err(EnrollmentError::AlreadyInSection {
                occupancy: target.occupancy(),
            });
        }
        if target.organization_id != organization_id {
            return Err(EnrollmentError::CrossOrganizationViolation(
                "target section belongs to another organization".to_string(),
            ));
        }
        if !can_accommodate(&target, 1) {
            return Err(EnrollmentError::NoCapacity {
                requested: 1,
                occupancy: vec![target.occupancy()],
            });
        }

        let outcome = self
            .store
            .conditional_append_member(target.id, student_id, target.max_students)
            .await?;

        match outcome {
            // A leftover entry from an earlier interrupted transfer already
            // places the student in the target.
            AppendOutcome::Appended | AppendOutcome::AlreadyMember => {}
            AppendOutcome::Full { .. } => {
                let occupancy = match self.store.get_section(target.id).await? {
                    Some(fresh) => fresh.occupancy(),
                    None => target.occupancy(),
                };
                return Err(EnrollmentError::NoCapacity {
                    requested: 1,
                    occupancy: vec![occupancy],
                });
            }
            AppendOutcome::SectionUnavailable => {
                return Err(EnrollmentError::not_found("section", target.id));
            }
        }

        if let Err(e) = self.store.set_student_section(student_id, target.id).await {
            self.withdraw_target_entry(student_id, target.id, outcome).await;
            return Err(e.into());
        }

        if let Err(e) = self.store.remove_member(source_id, student_id).await {
            warn!(%source_id, %student_id, error = %e, "Source membership left for the sweep");
        }

        self.reconciler.reconcile_after_write(source_id).await;
        self.reconciler.reconcile_after_write(target.id).await;

        let section = match self.store.get_section(target.id).await {
            Ok(Some(fresh)) => fresh,
            _ => target,
        };
        student.section_id = Some(section.id);

        info!(%student_id, from = %source_id, to = %section.id, "Student transferred");
        Ok(Transfer {
            student,
            from_section_id: source_id,
            section,
        })
    }

    /// Undoes the target append when the reference could not follow it.
    /// Leaves a pre-existing entry alone.
    async fn withdraw_target_entry(&self, student_id: UserId, target_id: SectionId, outcome: AppendOutcome) {
        if !outcome.is_appended() {
            return;
        }
        if let Err(e) = self.store.remove_member(target_id, student_id).await {
            error!(%student_id, %target_id, error = %e, "Target membership left for the sweep after aborted transfer");
        }
    }
}
