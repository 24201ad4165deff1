//! Student seeding through the enrollment engine.

use campusdesk_enrollment::{EnrollmentEngine, EnrollmentError, EnrollmentRequest, OrganizationScope};
use campusdesk_models::enrollment::{PlacementPolicy, StudentDraft};
use campusdesk_models::ids::ClassId;
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use std::time::Instant;

use super::models::SEED_PASSWORD;

/// Outcome counts of a student seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StudentSeedReport {
    pub enrolled: usize,
    /// Students turned away because every section of their class was full.
    pub rejected: usize,
}

/// Generates student drafts for one class
pub fn generate_students(class_idx: usize, count: usize, run_tag: &str) -> Vec<StudentDraft> {
    (0..count)
        .into_par_iter()
        .map(|i| {
            let first_name: String = FirstName().fake();
            let last_name: String = LastName().fake();
            let email = format!(
                "{}.{}+student{}-{}@example.com",
                first_name.to_lowercase(),
                last_name.to_lowercase(),
                class_idx * 10_000 + i,
                run_tag
            );
            StudentDraft {
                first_name,
                last_name,
                email,
                password: Some(SEED_PASSWORD.to_string()),
            }
        })
        .collect()
}

/// Enrolls generated students into each class with load-balanced placement.
/// Rejections for lack of capacity are counted, any other error aborts.
pub async fn seed_students(
    engine: &EnrollmentEngine,
    class_ids: &[ClassId],
    per_class: usize,
    run_tag: &str,
) -> Result<StudentSeedReport, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "🎓 Enrolling {} students across {} classes...",
        class_ids.len() * per_class,
        class_ids.len()
    );

    let mut report = StudentSeedReport::default();
    for (class_idx, &class_id) in class_ids.iter().enumerate() {
        for draft in generate_students(class_idx, per_class, run_tag) {
            let request = EnrollmentRequest {
                class_id,
                draft,
                policy: PlacementPolicy::LoadBalanced,
                preferred_section: None,
            };
            match engine.enrollments.enroll(OrganizationScope::Any, request).await {
                Ok(_) => report.enrolled += 1,
                Err(EnrollmentError::NoCapacity { .. }) => report.rejected += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    println!(
        "   ✓ Enrolled {} students ({} rejected, classes full) in {:?}",
        report.enrolled,
        report.rejected,
        start_time.elapsed()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_students_carry_seed_password() {
        let drafts = generate_students(3, 10, "run1");
        assert_eq!(drafts.len(), 10);
        assert!(drafts
            .iter()
            .all(|d| d.password.as_deref() == Some(SEED_PASSWORD)));
        assert!(drafts.iter().all(|d| d.email.ends_with("-run1@example.com")));
    }
}
