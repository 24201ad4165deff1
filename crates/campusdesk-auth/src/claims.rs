//! Access token claims.

use campusdesk_core::Role;
use campusdesk_models::ids::{OrganizationId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by every access token.
///
/// The identity layer issues these; the API only verifies them and reads the
/// caller's role and organization. `organization_id` is `None` only for
/// system administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}
