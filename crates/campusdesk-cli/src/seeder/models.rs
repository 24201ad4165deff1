//! Seed data and seeding configuration.

use campusdesk_models::ids::OrganizationId;

/// Seed data for creating an organization.
pub struct OrganizationSeed {
    pub name: String,
    pub default_section_capacity: Option<i32>,
}

/// Seed data for creating a class.
pub struct ClassSeed {
    pub organization_id: OrganizationId,
    pub grade: String,
    pub name: String,
}

/// Seed data for creating a teacher.
pub struct TeacherSeed {
    pub organization_id: OrganizationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Sections and students per class.
#[derive(Clone)]
pub struct ClassLayout {
    pub classes_per_organization: usize,
    pub sections_per_class: usize,
    pub section_capacity: i32,
    pub students_per_class: usize,
}

impl Default for ClassLayout {
    fn default() -> Self {
        Self {
            classes_per_organization: 6,
            sections_per_class: 3,
            section_capacity: 30,
            students_per_class: 75,
        }
    }
}

/// Full seeding configuration.
#[derive(Clone)]
pub struct SeedConfig {
    pub organizations: usize,
    pub teachers_per_organization: usize,
    pub layout: ClassLayout,
}

impl SeedConfig {
    pub fn new(organizations: usize) -> Self {
        Self {
            organizations,
            teachers_per_organization: 5,
            layout: ClassLayout::default(),
        }
    }

    pub fn with_teachers(mut self, teachers_per_organization: usize) -> Self {
        self.teachers_per_organization = teachers_per_organization;
        self
    }

    pub fn with_layout(mut self, layout: ClassLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// Password shared by every seeded account.
pub const SEED_PASSWORD: &str = "password123";
