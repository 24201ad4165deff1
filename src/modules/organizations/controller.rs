use axum::{
    Json,
    extract::{Path, State},
};
use campusdesk_core::AppError;
use campusdesk_models::enrollment::ReconcileResponse;
use campusdesk_models::ids::OrganizationId;
use tracing::instrument;
use uuid::Uuid;

use crate::docs::ErrorResponse;
use crate::middleware::role::RequireRunReconciliation;
use crate::state::AppState;

/// Runs the same pass as the periodic sweep, for one organization.
#[utoipa::path(
    post,
    path = "/api/organizations/{organization_id}/reconcile",
    params(
        ("organization_id" = Uuid, Path, description = "Organization ID")
    ),
    responses(
        (status = 200, description = "Counters recomputed from membership", body = ReconcileResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn reconcile_organization(
    State(state): State<AppState>,
    caller: RequireRunReconciliation,
    Path(organization_id): Path<OrganizationId>,
) -> Result<Json<ReconcileResponse>, AppError> {
    caller.scope()?.check(organization_id)?;

    let report = state
        .engine
        .reconciler
        .reconcile_organization(organization_id)
        .await?;

    Ok(Json(ReconcileResponse {
        organization_id,
        report,
    }))
}
