//! Database seeding.
//!
//! Organizations, classes and teachers are bulk-inserted. Sections are
//! created and students enrolled through the [`EnrollmentEngine`], and a
//! final reconciliation pass publishes every counter.

pub mod models;
pub mod organizations;
pub mod staff;
pub mod students;

use std::sync::Arc;
use std::time::Instant;

use campusdesk_config::EnrollmentConfig;
use campusdesk_core::hash_password_with_cost;
use campusdesk_db::PgEnrollmentStore;
use campusdesk_enrollment::{EnrollmentEngine, LogNotifier, OrganizationScope};
use campusdesk_models::ids::{OrganizationId, SectionId};
use sqlx::PgPool;
use uuid::Uuid;

pub use models::{ClassLayout, SEED_PASSWORD, SeedConfig};
pub use students::StudentSeedReport;

/// bcrypt cost for seeded credentials.
const SEED_HASH_COST: u32 = 4;

/// Builds an engine over the Postgres store for seeding and maintenance
/// commands. Credential notifications are only logged.
pub fn engine(db: &PgPool) -> EnrollmentEngine {
    EnrollmentEngine::new(
        Arc::new(PgEnrollmentStore::new(db.clone())),
        Arc::new(LogNotifier),
        EnrollmentConfig::from_env().with_password_hash_cost(SEED_HASH_COST),
    )
}

fn section_name(index: usize) -> String {
    char::from(b'A' + (index % 26) as u8).to_string()
}

/// Seeds everything described by `config`.
pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let layout = &config.layout;
    let run_tag = Uuid::new_v4().simple().to_string()[..8].to_string();
    let engine = engine(db);

    println!("🌱 Starting database seeding...\n");

    let organization_ids =
        organizations::seed_organizations(db, config.organizations, layout.section_capacity)
            .await?;
    let classes =
        organizations::seed_classes(db, &organization_ids, layout.classes_per_organization)
            .await?;

    println!(
        "🧩 Creating {} sections...",
        classes.len() * layout.sections_per_class.min(26)
    );
    let mut sections: Vec<(SectionId, OrganizationId)> = Vec::new();
    for &(class_id, organization_id) in &classes {
        for i in 0..layout.sections_per_class.min(26) {
            let section = engine
                .sections
                .create_section(
                    OrganizationScope::Any,
                    class_id,
                    &section_name(i),
                    Some(layout.section_capacity),
                )
                .await?;
            sections.push((section.id, organization_id));
        }
    }

    let password_hash = hash_password_with_cost(SEED_PASSWORD, SEED_HASH_COST)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;
    let teachers = staff::seed_teachers(
        db,
        &organization_ids,
        config.teachers_per_organization,
        &password_hash,
        &run_tag,
    )
    .await?;
    staff::assign_teachers(&engine, &sections, &teachers).await?;

    let class_ids: Vec<_> = classes.iter().map(|(class_id, _)| *class_id).collect();
    students::seed_students(&engine, &class_ids, layout.students_per_class, &run_tag).await?;

    let report = engine.reconciler.reconcile_all().await?;
    println!(
        "🔁 Reconciled {} organizations ({} drifted counters healed)",
        report.organizations, report.drift_detected
    );

    println!("\n✅ Seeding completed in {:?}", start_time.elapsed());
    println!("   Seeded accounts use the password: {}", SEED_PASSWORD);
    Ok(())
}

/// Removes all seeded data.
pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    organizations::clear_organizations(db).await?;
    println!("\n✅ Seeded data cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_names_are_letters() {
        assert_eq!(section_name(0), "A");
        assert_eq!(section_name(2), "C");
        assert_eq!(section_name(25), "Z");
    }
}
