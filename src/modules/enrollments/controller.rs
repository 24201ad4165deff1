use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use campusdesk_core::AppError;
use campusdesk_enrollment::{Enrollment, EnrollmentRequest};
use campusdesk_models::enrollment::{
    CapacitySummary, EnrollStudentDto, EnrollmentResponse, TransferResponse, TransferStudentDto,
    WithdrawalResponse,
};
use campusdesk_models::ids::{ClassId, UserId};
use campusdesk_models::sections::SectionView;
use campusdesk_models::users::StudentView;
use tracing::instrument;
use uuid::Uuid;

use crate::docs::ErrorResponse;
use crate::middleware::role::{
    RequireEnrollStudents, RequireTransferStudents, RequireViewCapacity, RequireWithdrawStudents,
};
use crate::state::AppState;
use crate::validator::ValidatedJson;

fn enrollment_response(enrollment: Enrollment) -> Result<EnrollmentResponse, AppError> {
    let student = StudentView::from_user(&enrollment.student)
        .ok_or_else(|| AppError::internal(anyhow!("Enrolled student has no organization")))?;
    Ok(EnrollmentResponse {
        student,
        section: SectionView::from(&enrollment.section),
    })
}

#[utoipa::path(
    post,
    path = "/api/classes/{class_id}/enrollments",
    params(
        ("class_id" = Uuid, Path, description = "Class ID")
    ),
    request_body = EnrollStudentDto,
    responses(
        (status = 201, description = "Student created and placed in a section", body = EnrollmentResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
        (status = 409, description = "No section has room, or the email is taken", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 503, description = "Placement contended, retry", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn enroll_student(
    State(state): State<AppState>,
    caller: RequireEnrollStudents,
    Path(class_id): Path<ClassId>,
    ValidatedJson(dto): ValidatedJson<EnrollStudentDto>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), AppError> {
    let scope = caller.scope()?;
    let request = EnrollmentRequest {
        class_id,
        draft: dto.draft(),
        policy: dto.policy.unwrap_or(state.enrollment_config.default_policy),
        preferred_section: dto.preferred_section.clone(),
    };

    let enrollment = state.engine.enrollments.enroll(scope, request).await?;

    Ok((StatusCode::CREATED, Json(enrollment_response(enrollment)?)))
}

#[utoipa::path(
    get,
    path = "/api/classes/{class_id}/capacity",
    params(
        ("class_id" = Uuid, Path, description = "Class ID")
    ),
    responses(
        (status = 200, description = "Per-section occupancy of the class", body = CapacitySummary),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_class_capacity(
    State(state): State<AppState>,
    caller: RequireViewCapacity,
    Path(class_id): Path<ClassId>,
) -> Result<Json<CapacitySummary>, AppError> {
    let summary = state
        .engine
        .enrollments
        .capacity_summary(caller.scope()?, class_id)
        .await?;

    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/students/{student_id}/transfer",
    params(
        ("student_id" = Uuid, Path, description = "Student ID")
    ),
    request_body = TransferStudentDto,
    responses(
        (status = 200, description = "Student moved to the target section", body = TransferResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden or cross-organization move", body = ErrorResponse),
        (status = 404, description = "Student or section not found", body = ErrorResponse),
        (status = 409, description = "Target section full, or student already there", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn transfer_student(
    State(state): State<AppState>,
    caller: RequireTransferStudents,
    Path(student_id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<TransferStudentDto>,
) -> Result<Json<TransferResponse>, AppError> {
    let transfer = state
        .engine
        .transfers
        .transfer(caller.scope()?, student_id, dto.target_section_id)
        .await?;

    Ok(Json(TransferResponse {
        student_id: transfer.student.id,
        from_section_id: transfer.from_section_id,
        section: SectionView::from(&transfer.section),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/students/{student_id}/enrollment",
    params(
        ("student_id" = Uuid, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student withdrawn", body = WithdrawalResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn withdraw_student(
    State(state): State<AppState>,
    caller: RequireWithdrawStudents,
    Path(student_id): Path<UserId>,
) -> Result<Json<WithdrawalResponse>, AppError> {
    let withdrawal = state
        .engine
        .enrollments
        .withdraw(caller.scope()?, student_id)
        .await?;

    Ok(Json(withdrawal))
}
