use serde::Serialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use campusdesk_models::enrollment::{
    CapacitySummary, EnrollStudentDto, EnrollmentResponse, PlacementPolicy, ReconcileReport,
    ReconcileResponse, TransferResponse, TransferStudentDto, WithdrawalResponse,
};
use campusdesk_models::sections::{
    AssignTeacherDto, CreateSectionDto, SectionOccupancy, SectionView, UpdateSectionCapacityDto,
};
use campusdesk_models::users::StudentView;

/// Body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Present on capacity rejections (current section occupancy) and on
    /// retryable contention failures.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::enrollments::controller::enroll_student,
        crate::modules::enrollments::controller::get_class_capacity,
        crate::modules::enrollments::controller::transfer_student,
        crate::modules::enrollments::controller::withdraw_student,
        crate::modules::sections::controller::create_section,
        crate::modules::sections::controller::update_section_capacity,
        crate::modules::sections::controller::assign_section_teacher,
        crate::modules::sections::controller::delete_section,
        crate::modules::organizations::controller::reconcile_organization,
    ),
    components(
        schemas(
            EnrollStudentDto,
            EnrollmentResponse,
            StudentView,
            PlacementPolicy,
            TransferStudentDto,
            TransferResponse,
            WithdrawalResponse,
            CapacitySummary,
            SectionOccupancy,
            SectionView,
            CreateSectionDto,
            UpdateSectionCapacityDto,
            AssignTeacherDto,
            ReconcileReport,
            ReconcileResponse,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Enrollments", description = "Student placement, transfers, withdrawals and class occupancy"),
        (name = "Sections", description = "Section capacity, teacher assignment and removal"),
        (name = "Organizations", description = "Counter reconciliation")
    ),
    info(
        title = "Campusdesk API",
        version = "0.1.0",
        description = "Enrollment and section capacity service. Every placement is checked against section limits at write time.",
        contact(
            name = "API Support",
            email = "support@campusdesk.dev"
        ),
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/classes/{class_id}/enrollments",
            "/api/classes/{class_id}/capacity",
            "/api/classes/{class_id}/sections",
            "/api/students/{student_id}/transfer",
            "/api/students/{student_id}/enrollment",
            "/api/sections/{section_id}/capacity",
            "/api/sections/{section_id}/teacher",
            "/api/sections/{section_id}",
            "/api/organizations/{organization_id}/reconcile",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
