//! System roles and the capability table.
//!
//! Authorization is decided once, at the HTTP boundary, by asking the caller's
//! [`Role`] whether it [`allows`](Role::allows) a [`Capability`]. Everything
//! downstream receives an already-authorized caller and never compares role
//! strings itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdmin,
    Admin,
    Teacher,
    Student,
}

/// Operations gated at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    EnrollStudents,
    TransferStudents,
    WithdrawStudents,
    ViewCapacity,
    ManageSections,
    RunReconciliation,
}

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::EnrollStudents,
    Capability::TransferStudents,
    Capability::WithdrawStudents,
    Capability::ViewCapacity,
    Capability::ManageSections,
    Capability::RunReconciliation,
];

const CAPABILITY_TABLE: &[(Role, &[Capability])] = &[
    (Role::SystemAdmin, ADMIN_CAPABILITIES),
    (Role::Admin, ADMIN_CAPABILITIES),
    (Role::Teacher, &[Capability::ViewCapacity]),
    (Role::Student, &[]),
];

impl Role {
    pub const ALL: [Role; 4] = [Role::SystemAdmin, Role::Admin, Role::Teacher, Role::Student];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SystemAdmin => "system_admin",
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn capabilities(self) -> &'static [Capability] {
        CAPABILITY_TABLE
            .iter()
            .find(|(role, _)| *role == self)
            .map(|(_, caps)| *caps)
            .unwrap_or(&[])
    }

    pub fn allows(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// System admins act across organizations; every other role is pinned to one.
    pub fn is_organization_scoped(self) -> bool {
        self != Role::SystemAdmin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}

/// Lets the `role` text column decode straight into [`Role`].
impl TryFrom<String> for Role {
    type Error = ParseRoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admins_hold_every_capability() {
        for cap in ADMIN_CAPABILITIES {
            assert!(Role::SystemAdmin.allows(*cap));
            assert!(Role::Admin.allows(*cap));
        }
    }

    #[test]
    fn test_teacher_can_only_view_capacity() {
        assert!(Role::Teacher.allows(Capability::ViewCapacity));
        assert!(!Role::Teacher.allows(Capability::EnrollStudents));
        assert!(!Role::Teacher.allows(Capability::ManageSections));
    }

    #[test]
    fn test_student_has_no_capabilities() {
        assert!(Role::Student.capabilities().is_empty());
    }

    #[test]
    fn test_role_string_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("principal".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_uses_snake_case() {
        let json = serde_json::to_string(&Role::SystemAdmin).unwrap();
        assert_eq!(json, r#""system_admin""#);
    }

    #[test]
    fn test_only_system_admin_is_unscoped() {
        assert!(!Role::SystemAdmin.is_organization_scoped());
        assert!(Role::Admin.is_organization_scoped());
    }
}
