//! User models.
//!
//! Administrators, teachers and students share one table; the closed
//! [`Role`] decides what a row is.

use crate::ids::{OrganizationId, SectionId, UserId};
use campusdesk_core::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Set for students while they are enrolled.
    pub section_id: Option<SectionId>,
    #[serde(skip)]
    pub password_hash: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_active_student(&self) -> bool {
        self.role == Role::Student && self.is_active()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Insert payload for a student row. The section is required: a student is
/// never created without one.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub organization_id: OrganizationId,
    pub section_id: SectionId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StudentView {
    pub id: UserId,
    pub organization_id: OrganizationId,
    pub section_id: Option<SectionId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl StudentView {
    /// `None` for users without an organization, which students always have.
    pub fn from_user(user: &User) -> Option<Self> {
        Some(Self {
            id: user.id,
            organization_id: user.organization_id?,
            section_id: user.section_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            organization_id: Some(OrganizationId::new()),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            email: "ada@example.com".into(),
            role: Role::Student,
            section_id: Some(SectionId::new()),
            password_hash: "hash".into(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let json = serde_json::to_value(student()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "student");
    }

    #[test]
    fn test_withdrawn_student_is_inactive() {
        let mut user = student();
        assert!(user.is_active_student());
        user.deleted_at = Some(Utc::now());
        assert!(!user.is_active_student());
    }

    #[test]
    fn test_view_requires_organization() {
        let mut user = student();
        assert!(StudentView::from_user(&user).is_some());
        user.organization_id = None;
        assert!(StudentView::from_user(&user).is_none());
    }
}
