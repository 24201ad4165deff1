use axum::{
    Router,
    routing::{delete, patch, post, put},
};

use crate::state::AppState;

use super::controller::{
    assign_section_teacher, create_section, delete_section, update_section_capacity,
};

/// Mounted under `/classes` next to the enrollment routes.
pub fn init_class_sections_router() -> Router<AppState> {
    Router::new().route("/{class_id}/sections", post(create_section))
}

pub fn init_sections_router() -> Router<AppState> {
    Router::new()
        .route("/{section_id}/capacity", patch(update_section_capacity))
        .route("/{section_id}/teacher", put(assign_section_teacher))
        .route("/{section_id}", delete(delete_section))
}
