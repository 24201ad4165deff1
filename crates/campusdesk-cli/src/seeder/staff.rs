//! Teacher seeding and section assignment.

use campusdesk_core::Role;
use campusdesk_enrollment::{EnrollmentEngine, OrganizationScope};
use campusdesk_models::ids::{OrganizationId, SectionId, UserId};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::time::Instant;

use super::models::TeacherSeed;

/// Generates teachers for every organization
pub fn generate_teachers(
    organization_ids: &[OrganizationId],
    per_organization: usize,
    password_hash: &str,
    run_tag: &str,
) -> Vec<TeacherSeed> {
    organization_ids
        .par_iter()
        .enumerate()
        .flat_map(|(org_idx, &organization_id)| {
            (0..per_organization)
                .map(|i| {
                    let first_name: String = FirstName().fake();
                    let last_name: String = LastName().fake();
                    let email = format!(
                        "{}.{}+teacher{}-{}@example.com",
                        first_name.to_lowercase(),
                        last_name.to_lowercase(),
                        org_idx * 1000 + i,
                        run_tag
                    );
                    TeacherSeed {
                        organization_id,
                        first_name,
                        last_name,
                        email,
                        password_hash: password_hash.to_string(),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Seeds teachers and returns them grouped by organization
pub async fn seed_teachers(
    db: &PgPool,
    organization_ids: &[OrganizationId],
    per_organization: usize,
    password_hash: &str,
    run_tag: &str,
) -> Result<HashMap<OrganizationId, Vec<UserId>>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let teachers = generate_teachers(organization_ids, per_organization, password_hash, run_tag);
    println!("👥 Seeding {} teachers...", teachers.len());

    let mut by_organization: HashMap<OrganizationId, Vec<UserId>> = HashMap::new();
    let mut tx = db.begin().await?;
    for chunk in teachers.chunks(500) {
        if chunk.is_empty() {
            continue;
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO users (organization_id, first_name, last_name, email, role, password_hash) ",
        );
        builder.push_values(chunk, |mut row, teacher| {
            row.push_bind(teacher.organization_id)
                .push_bind(&teacher.first_name)
                .push_bind(&teacher.last_name)
                .push_bind(&teacher.email)
                .push_bind(Role::Teacher.as_str())
                .push_bind(&teacher.password_hash);
        });
        builder.push(" RETURNING id, organization_id");

        let rows = builder
            .build_query_as::<(UserId, OrganizationId)>()
            .fetch_all(&mut *tx)
            .await?;
        for (user_id, organization_id) in rows {
            by_organization.entry(organization_id).or_default().push(user_id);
        }
    }
    tx.commit().await?;

    println!("   ✓ Inserted teachers in {:?}", start_time.elapsed());
    Ok(by_organization)
}

/// Assigns teachers to sections round-robin within each organization
pub async fn assign_teachers(
    engine: &EnrollmentEngine,
    sections: &[(SectionId, OrganizationId)],
    teachers: &HashMap<OrganizationId, Vec<UserId>>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut next: HashMap<OrganizationId, usize> = HashMap::new();
    let mut assigned = 0;

    for &(section_id, organization_id) in sections {
        let Some(pool) = teachers.get(&organization_id).filter(|t| !t.is_empty()) else {
            continue;
        };
        let cursor = next.entry(organization_id).or_default();
        let teacher_id = pool[*cursor % pool.len()];
        *cursor += 1;

        engine
            .sections
            .assign_teacher(OrganizationScope::Any, section_id, Some(teacher_id))
            .await?;
        assigned += 1;
    }

    println!("   ✓ Assigned teachers to {} sections", assigned);
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_teacher_emails_are_unique() {
        let orgs = [OrganizationId::new(), OrganizationId::new()];
        let teachers = generate_teachers(&orgs, 20, "hash", "run1");
        assert_eq!(teachers.len(), 40);
        let emails: HashSet<_> = teachers.iter().map(|t| t.email.as_str()).collect();
        assert_eq!(emails.len(), 40);
    }
}
