//! Capability-gated extractors.
//!
//! Each extractor authenticates the caller, checks the role's capability
//! table once and hands the handler the caller together with the
//! organization scope it may act on.

/// Defines an extractor that admits only callers whose role allows the
/// given capability.
#[macro_export]
macro_rules! require_capability {
    ($name:ident, $capability:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = campusdesk_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user = <$crate::middleware::auth::AuthUser as axum::extract::FromRequestParts<
                    $crate::state::AppState,
                >>::from_request_parts(parts, state)
                .await?;
                auth_user.require($capability)?;
                Ok($name(auth_user))
            }
        }

        impl $name {
            pub fn scope(
                &self,
            ) -> Result<campusdesk_enrollment::OrganizationScope, campusdesk_core::AppError> {
                self.0.scope()
            }

            pub fn user(&self) -> &$crate::middleware::auth::AuthUser {
                &self.0
            }
        }
    };
}

require_capability!(RequireEnrollStudents, campusdesk_core::Capability::EnrollStudents);
require_capability!(RequireTransferStudents, campusdesk_core::Capability::TransferStudents);
require_capability!(RequireWithdrawStudents, campusdesk_core::Capability::WithdrawStudents);
require_capability!(RequireViewCapacity, campusdesk_core::Capability::ViewCapacity);
require_capability!(RequireManageSections, campusdesk_core::Capability::ManageSections);
require_capability!(RequireRunReconciliation, campusdesk_core::Capability::RunReconciliation);
