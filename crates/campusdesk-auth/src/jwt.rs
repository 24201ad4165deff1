//! JWT encoding and verification.
//!
//! Token issuance (login, refresh) lives in the identity service. The API
//! verifies tokens; [`create_access_token`] exists for integration tests.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use campusdesk_config::JwtConfig;
use campusdesk_core::{AppError, Role};
use campusdesk_models::ids::{OrganizationId, UserId};

use crate::claims::Claims;

/// Creates an access token for `user_id` acting as `role` inside `organization_id`.
///
/// # Errors
///
/// Returns an internal error if encoding fails.
pub fn create_access_token(
    user_id: UserId,
    email: &str,
    role: Role,
    organization_id: Option<OrganizationId>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry as usize;

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        organization_id,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create token: {e}")))
}

/// Verifies signature and expiry and returns the embedded claims.
///
/// # Errors
///
/// Returns 401 for a bad signature, an expired token, or a malformed payload.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}
