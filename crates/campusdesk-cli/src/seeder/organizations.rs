//! Organization and class seeding.

use campusdesk_models::ids::{ClassId, OrganizationId};
use fake::Fake;
use fake::faker::address::en::CityName;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;

use super::models::{ClassSeed, OrganizationSeed};

const GRADES: [&str; 6] = ["JSS1", "JSS2", "JSS3", "SSS1", "SSS2", "SSS3"];
const CLASS_NAMES: [&str; 6] = ["Gold", "Silver", "Bronze", "Ruby", "Emerald", "Sapphire"];
const BATCH_SIZE: usize = 500;

/// Generates organization data in parallel using Rayon
pub fn generate_organizations(count: usize, default_section_capacity: i32) -> Vec<OrganizationSeed> {
    (0..count)
        .into_par_iter()
        .map(|i| {
            let city: String = CityName().fake();
            OrganizationSeed {
                name: format!("{} Academy {}", city, i + 1),
                default_section_capacity: Some(default_section_capacity),
            }
        })
        .collect()
}

/// Generates classes for every organization. Grades cycle first, so the
/// first six classes of an organization cover every grade.
pub fn generate_classes(organization_ids: &[OrganizationId], per_organization: usize) -> Vec<ClassSeed> {
    organization_ids
        .par_iter()
        .flat_map(|&organization_id| {
            (0..per_organization)
                .map(|i| {
                    let round = i / GRADES.len();
                    let palette = CLASS_NAMES[round % CLASS_NAMES.len()];
                    let name = if round < CLASS_NAMES.len() {
                        palette.to_string()
                    } else {
                        format!("{} {}", palette, round / CLASS_NAMES.len() + 1)
                    };
                    ClassSeed {
                        organization_id,
                        grade: GRADES[i % GRADES.len()].to_string(),
                        name,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Seeds organizations into the database
pub async fn seed_organizations(
    db: &PgPool,
    count: usize,
    default_section_capacity: i32,
) -> Result<Vec<OrganizationId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} organizations...", count);

    let organizations = generate_organizations(count, default_section_capacity);

    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(organizations.len());
    for chunk in organizations.chunks(BATCH_SIZE) {
        ids.extend(insert_organizations_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} organizations in {:?}",
        ids.len(),
        start_time.elapsed()
    );
    Ok(ids)
}

async fn insert_organizations_chunk(
    tx: &mut Transaction<'_, Postgres>,
    organizations: &[OrganizationSeed],
) -> Result<Vec<OrganizationId>, Box<dyn std::error::Error>> {
    if organizations.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO organizations (name, default_section_capacity) ");
    builder.push_values(organizations, |mut row, org| {
        row.push_bind(&org.name).push_bind(org.default_section_capacity);
    });
    builder.push(" RETURNING id");

    let ids = builder
        .build_query_scalar::<OrganizationId>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

/// Seeds classes for the given organizations
pub async fn seed_classes(
    db: &PgPool,
    organization_ids: &[OrganizationId],
    per_organization: usize,
) -> Result<Vec<(ClassId, OrganizationId)>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let classes = generate_classes(organization_ids, per_organization);
    println!("📚 Seeding {} classes...", classes.len());

    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(classes.len());
    for chunk in classes.chunks(BATCH_SIZE) {
        ids.extend(insert_classes_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;

    println!(
        "   ✓ Inserted {} classes in {:?}",
        ids.len(),
        start_time.elapsed()
    );
    Ok(ids)
}

async fn insert_classes_chunk(
    tx: &mut Transaction<'_, Postgres>,
    classes: &[ClassSeed],
) -> Result<Vec<(ClassId, OrganizationId)>, Box<dyn std::error::Error>> {
    if classes.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO classes (organization_id, grade, name) ");
    builder.push_values(classes, |mut row, class| {
        row.push_bind(class.organization_id)
            .push_bind(&class.grade)
            .push_bind(&class.name);
    });
    builder.push(" RETURNING id, organization_id");

    let ids = builder
        .build_query_as::<(ClassId, OrganizationId)>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

/// Removes every organization. Classes, sections, memberships and
/// organization users go with them; system administrators stay.
pub async fn clear_organizations(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing organizations...");

    let result = sqlx::query("DELETE FROM organizations")
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} organizations in {:?}",
        result,
        start_time.elapsed()
    );
    Ok(result)
}
