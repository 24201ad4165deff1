use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use campusdesk_auth::{Claims, verify_token};
use campusdesk_core::{AppError, Capability, Role};
use campusdesk_enrollment::OrganizationScope;
use campusdesk_models::ids::{OrganizationId, UserId};

use crate::state::AppState;

/// Extractor that validates the bearer token and provides the caller's claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> UserId {
        self.0.sub
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    /// `None` for system administrators.
    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.0.organization_id
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role().allows(capability) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Access denied. Role {} lacks capability {:?}",
                self.role(),
                capability
            )))
        }
    }

    /// Organizations the caller may act on. An organization-scoped role
    /// without an organization in its token can act on none.
    pub fn scope(&self) -> Result<OrganizationScope, AppError> {
        if !self.role().is_organization_scoped() {
            return Ok(OrganizationScope::Any);
        }
        self.organization_id()
            .map(OrganizationScope::Only)
            .ok_or_else(|| AppError::forbidden("Token is not bound to an organization"))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}
