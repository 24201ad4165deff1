//! Organization scope of an authorized caller.

use campusdesk_models::ids::OrganizationId;

use crate::error::EnrollmentError;

/// Which organizations a caller may act in. Built once at the HTTP boundary
/// from the verified role and passed into every engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationScope {
    Any,
    Only(OrganizationId),
}

impl OrganizationScope {
    pub fn permits(self, organization_id: OrganizationId) -> bool {
        match self {
            OrganizationScope::Any => true,
            OrganizationScope::Only(id) => id == organization_id,
        }
    }

    pub fn check(self, organization_id: OrganizationId) -> Result<(), EnrollmentError> {
        if self.permits(organization_id) {
            Ok(())
        } else {
            Err(EnrollmentError::CrossOrganizationViolation(
                "resource belongs to another organization".to_string(),
            ))
        }
    }
}
