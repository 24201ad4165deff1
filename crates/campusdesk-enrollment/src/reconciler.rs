//! Stats reconciliation.
//!
//! Cached counters live at three levels: section (`current_student_count`,
//! `available_seats`), class (`total_students`) and organization
//! (`total_students`, `total_teachers`, `total_classes`). This module is the
//! only writer of those counters. Every pass recomputes them from membership
//! sets, so running it twice without intervening writes changes nothing.
//!
//! The organization pass also repairs students whose section reference and
//! membership disagree, which is how an interrupted enrollment or transfer
//! converges.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use campusdesk_models::enrollment::ReconcileReport;
use campusdesk_config::enrollment::DEFAULT_ORPHAN_GRACE_SECS;
use campusdesk_models::ids::{ClassId, OrganizationId, SectionId, UserId};
use campusdesk_models::organizations::OrganizationCounters;
use campusdesk_models::sections::Section;
use campusdesk_models::users::User;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::error::EnrollmentError;
use crate::store::EnrollmentStore;

#[derive(Clone)]
pub struct StatsReconciler {
    store: Arc<dyn EnrollmentStore>,
    orphan_grace: Duration,
}

/// What the student pass did to one student.
enum StudentRepair {
    Untouched,
    Repointed,
    Rejoined,
    Removed,
}

impl StatsReconciler {
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        Self {
            store,
            orphan_grace: Duration::from_secs(DEFAULT_ORPHAN_GRACE_SECS),
        }
    }

    /// Students updated more recently than `grace` are skipped by the
    /// student pass.
    pub fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }

    /// Recomputes the section's counters, then its class, then its organization.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, section_id: SectionId) -> Result<(), EnrollmentError> {
        let section = self
            .store
            .get_section(section_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("section", section_id))?;

        self.publish_section(&section, false).await?;
        self.reconcile_class(section.class_id).await
    }

    /// Recomputes the class total and the organization totals above it.
    #[instrument(skip(self))]
    pub async fn reconcile_class(&self, class_id: ClassId) -> Result<(), EnrollmentError> {
        let (class, sections) = self
            .store
            .get_class_with_sections(class_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("class", class_id))?;

        let total: i64 = sections.iter().map(|s| i64::from(s.member_count)).sum();
        if total != class.total_students {
            self.store.set_class_counter(class.id, total).await?;
        }

        self.publish_organization(class.organization_id).await?;
        Ok(())
    }

    /// Reconciliation triggered by a completed write. Failures are logged and
    /// left for the next trigger or the periodic sweep.
    pub async fn reconcile_after_write(&self, section_id: SectionId) {
        if let Err(e) = self.reconcile(section_id).await {
            metrics::counter!("reconciliation_failures_total").increment(1);
            warn!(%section_id, error = %e, "Counter reconciliation failed, deferring to sweep");
        }
    }

    pub async fn reconcile_class_after_write(&self, class_id: ClassId) {
        if let Err(e) = self.reconcile_class(class_id).await {
            metrics::counter!("reconciliation_failures_total").increment(1);
            warn!(%class_id, error = %e, "Class counter reconciliation failed, deferring to sweep");
        }
    }

    /// Full pass over one organization.
    ///
    /// Membership entries left behind by interrupted transfers or withdrawals
    /// are pruned first. Students are then checked against membership, and
    /// finally every counter is republished. Cached section counters that
    /// disagree with membership are reported as drift.
    #[instrument(skip(self))]
    pub async fn reconcile_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<ReconcileReport, EnrollmentError> {
        self.store
            .get_organization(organization_id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("organization", organization_id))?;

        let mut report = ReconcileReport::default();
        let classes = self.store.list_classes(organization_id).await?;

        let mut listed: HashMap<UserId, Vec<SectionId>> = HashMap::new();
        for class in &classes {
            let Some((_, sections)) = self.store.get_class_with_sections(class.id).await? else {
                continue;
            };
            for section in sections {
                report.members_pruned += self.prune_section(&section).await?;
                for student_id in self.store.section_members(section.id).await? {
                    listed.entry(student_id).or_default().push(section.id);
                }
            }
        }

        for student in self.store.list_students(organization_id).await? {
            let sections = listed.get(&student.id).map(Vec::as_slice).unwrap_or_default();
            match self.repair_student(&student, sections).await? {
                StudentRepair::Untouched => {}
                StudentRepair::Repointed | StudentRepair::Rejoined => report.students_repaired += 1,
                StudentRepair::Removed => report.orphans_removed += 1,
            }
        }

        for class in &classes {
            let Some((class, sections)) = self.store.get_class_with_sections(class.id).await? else {
                continue;
            };

            let mut class_total = 0i64;
            for section in sections {
                if self.publish_section(&section, true).await? {
                    report.drift_detected += 1;
                }
                class_total += i64::from(section.member_count);
                report.sections += 1;
            }

            if class_total != class.total_students {
                self.store.set_class_counter(class.id, class_total).await?;
            }
            report.classes += 1;
        }

        self.publish_organization(organization_id).await?;
        report.organizations = 1;

        metrics::counter!("reconciliations_total", "scope" => "organization").increment(1);
        info!(
            %organization_id,
            sections = report.sections,
            drift = report.drift_detected,
            pruned = report.members_pruned,
            repaired = report.students_repaired,
            orphans = report.orphans_removed,
            "Organization reconciled"
        );
        Ok(report)
    }

    /// Full pass over every organization. A failing organization is logged
    /// and skipped so the rest still converge.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<ReconcileReport, EnrollmentError> {
        let mut report = ReconcileReport::default();
        for org in self.store.list_organizations().await? {
            match self.reconcile_organization(org.id).await {
                Ok(org_report) => report.merge(org_report),
                Err(e) => {
                    warn!(organization_id = %org.id, error = %e, "Skipping organization in sweep")
                }
            }
        }
        Ok(report)
    }

    /// Writes the section counters if they differ from membership. Returns
    /// whether they differed.
    async fn publish_section(
        &self,
        section: &Section,
        report_drift: bool,
    ) -> Result<bool, EnrollmentError> {
        let current = section.member_count;
        let available = section.live_available_seats();

        if section.current_student_count == current && section.available_seats == available {
            return Ok(false);
        }

        if report_drift {
            let drift = EnrollmentError::StatsDriftDetected {
                section_id: section.id,
                cached: section.current_student_count,
                actual: current,
            };
            metrics::counter!("stats_drift_detected_total").increment(1);
            warn!(error = %drift, "Healing counter drift");
        }

        self.store
            .set_section_counters(section.id, current, available)
            .await?;
        debug!(section_id = %section.id, current, available, "Section counters published");
        Ok(true)
    }

    async fn publish_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<OrganizationCounters, EnrollmentError> {
        let classes = self.store.list_classes(organization_id).await?;
        let counters = OrganizationCounters {
            total_students: classes.iter().map(|c| c.total_students).sum(),
            total_teachers: self.store.count_teachers(organization_id).await?,
            total_classes: classes.len() as i64,
        };
        self.store.set_org_counters(organization_id, counters).await?;
        Ok(counters)
    }

    /// Removes members whose student record no longer places them here.
    ///
    /// A member is kept when its student names this section, or names another
    /// section that does not list it yet (a transfer in flight).
    async fn prune_section(&self, section: &Section) -> Result<u64, EnrollmentError> {
        let mut pruned = 0;
        for student_id in self.store.section_members(section.id).await? {
            let keep = match self.store.get_user(student_id).await? {
                Some(user) if user.is_active_student() => match user.section_id {
                    Some(id) if id == section.id => true,
                    Some(other) => !self
                        .store
                        .section_members(other)
                        .await?
                        .contains(&student_id),
                    None => false,
                },
                _ => false,
            };

            if !keep && self.store.remove_member(section.id, student_id).await? {
                pruned += 1;
                metrics::counter!("reconcile_members_pruned_total").increment(1);
                info!(section_id = %section.id, %student_id, "Pruned stale section member");
            }
        }
        Ok(pruned)
    }

    /// Brings one active student in line with the sections that list them.
    ///
    /// A student listed by the section they name is left alone. Otherwise,
    /// once the student has been quiet for the grace window, the reference
    /// follows the first listing section, or with no listing at all the
    /// student either rejoins the named section or, if the row never moved
    /// since creation, is removed as the leftover of a failed enrollment.
    async fn repair_student(
        &self,
        student: &User,
        listed_in: &[SectionId],
    ) -> Result<StudentRepair, EnrollmentError> {
        if student.section_id.is_some_and(|id| listed_in.contains(&id)) {
            return Ok(StudentRepair::Untouched);
        }
        if !self.past_grace(student) {
            return Ok(StudentRepair::Untouched);
        }
        // The listing snapshot may be stale; re-read before writing.
        let Some(student) = self
            .store
            .get_user(student.id)
            .await?
            .filter(User::is_active_student)
        else {
            return Ok(StudentRepair::Untouched);
        };
        if let Some(named) = student.section_id {
            if self.store.section_members(named).await?.contains(&student.id) {
                return Ok(StudentRepair::Untouched);
            }
        }

        if let Some((&keep, extra)) = listed_in.split_first() {
            self.store.set_student_section(student.id, keep).await?;
            for &section_id in extra {
                self.store.remove_member(section_id, student.id).await?;
            }
            metrics::counter!("reconcile_students_repaired_total").increment(1);
            info!(student_id = %student.id, section_id = %keep, "Repointed student to the section listing them");
            return Ok(StudentRepair::Repointed);
        }

        if student.updated_at == student.created_at {
            self.store.delete_student(student.id).await?;
            metrics::counter!("reconcile_orphans_removed_total").increment(1);
            info!(student_id = %student.id, "Removed student left behind by a failed enrollment");
            return Ok(StudentRepair::Removed);
        }

        let section = match student.section_id {
            Some(id) => self.store.get_section(id).await?,
            None => None,
        };
        if let Some(section) = section {
            let outcome = self
                .store
                .conditional_append_member(section.id, student.id, section.max_students)
                .await?;
            if outcome.is_appended() {
                metrics::counter!("reconcile_students_repaired_total").increment(1);
                info!(student_id = %student.id, section_id = %section.id, "Restored missing membership");
                return Ok(StudentRepair::Rejoined);
            }
        }

        warn!(
            student_id = %student.id,
            section_id = ?student.section_id,
            "Student is in no section and cannot rejoin the one they name"
        );
        Ok(StudentRepair::Untouched)
    }

    fn past_grace(&self, student: &User) -> bool {
        (Utc::now() - student.updated_at)
            .to_std()
            .is_ok_and(|age| age >= self.orphan_grace)
    }
}
