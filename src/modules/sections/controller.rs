use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use campusdesk_core::AppError;
use campusdesk_models::ids::{ClassId, SectionId};
use campusdesk_models::sections::{
    AssignTeacherDto, CreateSectionDto, SectionView, UpdateSectionCapacityDto,
};
use tracing::instrument;
use uuid::Uuid;

use crate::docs::ErrorResponse;
use crate::middleware::role::RequireManageSections;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/classes/{class_id}/sections",
    params(
        ("class_id" = Uuid, Path, description = "Class ID")
    ),
    request_body = CreateSectionDto,
    responses(
        (status = 201, description = "Section created", body = SectionView),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
        (status = 409, description = "Section name already used in the class", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_section(
    State(state): State<AppState>,
    caller: RequireManageSections,
    Path(class_id): Path<ClassId>,
    ValidatedJson(dto): ValidatedJson<CreateSectionDto>,
) -> Result<(StatusCode, Json<SectionView>), AppError> {
    let section = state
        .engine
        .sections
        .create_section(caller.scope()?, class_id, &dto.name, dto.max_students)
        .await?;

    Ok((StatusCode::CREATED, Json(SectionView::from(&section))))
}

#[utoipa::path(
    patch,
    path = "/api/sections/{section_id}/capacity",
    params(
        ("section_id" = Uuid, Path, description = "Section ID")
    ),
    request_body = UpdateSectionCapacityDto,
    responses(
        (status = 200, description = "Capacity updated", body = SectionView),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 422, description = "Out of range, or below current occupancy", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_section_capacity(
    State(state): State<AppState>,
    caller: RequireManageSections,
    Path(section_id): Path<SectionId>,
    ValidatedJson(dto): ValidatedJson<UpdateSectionCapacityDto>,
) -> Result<Json<SectionView>, AppError> {
    let section = state
        .engine
        .sections
        .set_capacity(caller.scope()?, section_id, dto.max_students)
        .await?;

    Ok(Json(SectionView::from(&section)))
}

#[utoipa::path(
    put,
    path = "/api/sections/{section_id}/teacher",
    params(
        ("section_id" = Uuid, Path, description = "Section ID")
    ),
    request_body = AssignTeacherDto,
    responses(
        (status = 200, description = "Teacher assigned or cleared", body = SectionView),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden or teacher from another organization", body = ErrorResponse),
        (status = 404, description = "Section or teacher not found", body = ErrorResponse),
        (status = 422, description = "User is not a teacher", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn assign_section_teacher(
    State(state): State<AppState>,
    caller: RequireManageSections,
    Path(section_id): Path<SectionId>,
    ValidatedJson(dto): ValidatedJson<AssignTeacherDto>,
) -> Result<Json<SectionView>, AppError> {
    let section = state
        .engine
        .sections
        .assign_teacher(caller.scope()?, section_id, dto.teacher_id)
        .await?;

    Ok(Json(SectionView::from(&section)))
}

#[utoipa::path(
    delete,
    path = "/api/sections/{section_id}",
    params(
        ("section_id" = Uuid, Path, description = "Section ID")
    ),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 409, description = "Section still has students", body = ErrorResponse)
    ),
    tag = "Sections",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_section(
    State(state): State<AppState>,
    caller: RequireManageSections,
    Path(section_id): Path<SectionId>,
) -> Result<StatusCode, AppError> {
    state
        .engine
        .sections
        .delete_section(caller.scope()?, section_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
