//! Enrollment and withdrawal.

use std::sync::Arc;

use campusdesk_config::EnrollmentConfig;
use campusdesk_core::{generate_password, hash_password_with_cost};
use campusdesk_models::enrollment::{
    CapacitySummary, PlacementPolicy, StudentDraft, WithdrawalResponse,
};
use campusdesk_models::ids::{ClassId, UserId};
use campusdesk_models::sections::Section;
use campusdesk_models::users::{NewStudent, User};
use tracing::{debug, error, info, instrument, warn};

use crate::error::EnrollmentError;
use crate::notifier::{CredentialsIssued, Notifier, dispatch};
use crate::placement::select_section;
use crate::reconciler::StatsReconciler;
use crate::scope::OrganizationScope;
use crate::store::{AppendOutcome, EnrollmentStore};

#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub class_id: ClassId,
    pub draft: StudentDraft,
    pub policy: PlacementPolicy,
    /// Tried first when it has room.
    pub preferred_section: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Enrollment {
    pub student: User,
    pub section: Section,
}

#[derive(Clone)]
pub struct EnrollmentCoordinator {
    store: Arc<dyn EnrollmentStore>,
    reconciler: StatsReconciler,
    notifier: Arc<dyn Notifier>,
    config: EnrollmentConfig,
}

impl EnrollmentCoordinator {
    pub fn new(
        store: Arc<dyn EnrollmentStore>,
        reconciler: StatsReconciler,
        notifier: Arc<dyn Notifier>,
        config: EnrollmentConfig,
    ) -> Self {
        Self {
            store,
            reconciler,
            notifier,
            config,
        }
    }

    /// Creates a student and places them in a section of the class.
    ///
    /// Each attempt selects a section, creates the student referencing it and
    /// appends them under the capacity check. A rejected append discards the
    /// student and retries against fresh state; after `max_attempts` the
    /// request fails with [`EnrollmentError::CapacityRace`].
    #[instrument(skip(self, scope, request), fields(class_id = %request.class_id, policy = %request.policy))]
    pub async fn enroll(
        &self,
        scope: OrganizationScope,
        request: EnrollmentRequest,
    ) -> Result<Enrollment, EnrollmentError> {
        let result = self.try_enroll(scope, request).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::counter!("enrollments_total", "outcome" => outcome).increment(1);
        result
    }

    async fn try_enroll(
        &self,
        scope: OrganizationScope,
        request: EnrollmentRequest,
    ) -> Result<Enrollment, EnrollmentError> {
        let (class, mut sections) = self
            .store
            .get_class_with_sections(request.class_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("class", request.class_id))?;
        scope.check(class.organization_id)?;

        let password = request
            .draft
            .password
            .clone()
            .unwrap_or_else(generate_password);
        let password_hash = self.hash_password(password.clone()).await?;

        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                sections = self
                    .store
                    .get_class_with_sections(class.id)
                    .await?
                    .map(|(_, sections)| sections)
                    .ok_or_else(|| EnrollmentError::not_found("class", class.id))?;
            }

            let Some(section) = select_section(
                &sections,
                1,
                request.policy,
                request.preferred_section.as_deref(),
            )
            .cloned() else {
                return Err(EnrollmentError::NoCapacity {
                    requested: 1,
                    occupancy: sections.iter().map(Section::occupancy).collect(),
                });
            };

            let student = self
                .store
                .create_student(NewStudent {
                    organization_id: class.organization_id,
                    section_id: section.id,
                    first_name: request.draft.first_name.clone(),
                    last_name: request.draft.last_name.clone(),
                    email: request.draft.email.clone(),
                    password_hash: password_hash.clone(),
                })
                .await?;

            let outcome = match self
                .store
                .conditional_append_member(section.id, student.id, section.max_students)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The append error is the one worth reporting.
                    self.discard_student(student.id).await.ok();
                    return Err(e.into());
                }
            };

            if !outcome.is_appended() {
                self.discard_student(student.id).await?;
                metrics::counter!("capacity_race_retries_total").increment(1);
                debug!(attempt, section = %section.name, ?outcome, "Section changed before write, retrying");
                continue;
            }

            self.reconciler.reconcile_after_write(section.id).await;
            let section = match self.store.get_section(section.id).await {
                Ok(Some(fresh)) => fresh,
                Ok(None) => section,
                Err(e) => {
                    warn!(section_id = %section.id, error = %e, "Failed to reload section after enrollment");
                    section
                }
            };

            dispatch(
                Arc::clone(&self.notifier),
                CredentialsIssued {
                    student_id: student.id,
                    organization_id: class.organization_id,
                    email: student.email.clone(),
                    student_name: student.full_name(),
                    class_name: class.name.clone(),
                    grade: class.grade.clone(),
                    section_id: section.id,
                    section_name: section.name.clone(),
                    initial_password: password,
                },
            );

            info!(student_id = %student.id, section = %section.name, attempt, "Student enrolled");
            return Ok(Enrollment { student, section });
        }

        warn!(attempts = max_attempts, "Enrollment gave up under contention");
        Err(EnrollmentError::CapacityRace {
            attempts: max_attempts,
        })
    }

    /// Soft-deletes the student and removes them from their section.
    #[instrument(skip(self, scope))]
    pub async fn withdraw(
        &self,
        scope: OrganizationScope,
        student_id: UserId,
    ) -> Result<WithdrawalResponse, EnrollmentError> {
        let student = self
            .store
            .get_user(student_id)
            .await?
            .filter(User::is_active_student)
            .ok_or_else(|| EnrollmentError::not_found("student", student_id))?;
        let organization_id = student
            .organization_id
            .ok_or_else(|| EnrollmentError::not_found("student", student_id))?;
        scope.check(organization_id)?;

        if !self.store.soft_delete_student(student_id).await? {
            return Err(EnrollmentError::not_found("student", student_id));
        }

        if let Some(section_id) = student.section_id {
            if let Err(e) = self.store.remove_member(section_id, student_id).await {
                warn!(%section_id, %student_id, error = %e, "Withdrawn student left in membership for the sweep");
            }
            self.reconciler.reconcile_after_write(section_id).await;
        }

        metrics::counter!("withdrawals_total").increment(1);
        info!(%student_id, "Student withdrawn");
        Ok(WithdrawalResponse {
            student_id,
            section_id: student.section_id,
        })
    }

    /// Occupancy of every active section in the class, from membership sets.
    #[instrument(skip(self, scope))]
    pub async fn capacity_summary(
        &self,
        scope: OrganizationScope,
        class_id: ClassId,
    ) -> Result<CapacitySummary, EnrollmentError> {
        let (class, sections) = self
            .store
            .get_class_with_sections(class_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("class", class_id))?;
        scope.check(class.organization_id)?;

        Ok(CapacitySummary::new(
            class.id,
            class.grade,
            class.name,
            sections.iter().map(Section::occupancy).collect(),
        ))
    }

    async fn discard_student(&self, student_id: UserId) -> Result<(), EnrollmentError> {
        self.store.delete_student(student_id).await.map_err(|e| {
            error!(%student_id, error = %e, "Failed to discard unattached student, leaving it for the sweep");
            EnrollmentError::from(e)
        })
    }

    async fn hash_password(&self, password: String) -> Result<String, EnrollmentError> {
        let cost = self.config.password_hash_cost;
        tokio::task::spawn_blocking(move || hash_password_with_cost(&password, cost))
            .await
            .map_err(|e| EnrollmentError::Credentials(e.to_string()))?
            .map_err(|e| EnrollmentError::Credentials(e.to_string()))
    }
}
