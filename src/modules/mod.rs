pub mod enrollments;
pub mod organizations;
pub mod sections;
