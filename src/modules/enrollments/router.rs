use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{enroll_student, get_class_capacity, transfer_student, withdraw_student};

pub fn init_classes_router() -> Router<AppState> {
    Router::new()
        .route("/{class_id}/enrollments", post(enroll_student))
        .route("/{class_id}/capacity", get(get_class_capacity))
}

pub fn init_students_router() -> Router<AppState> {
    Router::new()
        .route("/{student_id}/transfer", post(transfer_student))
        .route("/{student_id}/enrollment", delete(withdraw_student))
}
