use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::reconcile_organization;

pub fn init_organizations_router() -> Router<AppState> {
    Router::new().route("/{organization_id}/reconcile", post(reconcile_organization))
}
