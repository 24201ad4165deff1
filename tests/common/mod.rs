#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use campusdesk::router::init_router;
use campusdesk::state::AppState;
use campusdesk_auth::create_access_token;
use campusdesk_config::{CorsConfig, EnrollmentConfig, JwtConfig};
use campusdesk_core::Role;
use campusdesk_enrollment::{InMemoryStore, LogNotifier};
use campusdesk_models::classes::Class;
use campusdesk_models::ids::OrganizationId;
use campusdesk_models::organizations::Organization;
use campusdesk_models::sections::Section;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry: 3600,
    }
}

/// Router over an in-memory store seeded with one organization and one class.
pub struct TestApp {
    pub router: Router,
    pub memory: InMemoryStore,
    pub org: Organization,
    pub class: Class,
}

impl TestApp {
    pub fn new() -> Self {
        let memory = InMemoryStore::new();
        let config = EnrollmentConfig {
            sweep_interval: None,
            ..EnrollmentConfig::default()
        }
        .with_password_hash_cost(4);

        let state = AppState::new(
            Arc::new(memory.clone()),
            Arc::new(LogNotifier),
            jwt_config(),
            CorsConfig {
                allowed_origins: vec!["http://localhost:5173".to_string()],
            },
            config,
        );

        let org = memory.insert_organization("Greenfield Academy", None);
        let class = memory.insert_class(org.id, "JSS1", "Gold");
        Self {
            router: init_router(state),
            memory,
            org,
            class,
        }
    }

    pub fn section(&self, name: &str, max_students: i32) -> Section {
        self.memory.insert_section(&self.class, name, max_students)
    }

    /// Token for a fresh user of `role` in this app's organization.
    pub fn token(&self, role: Role) -> String {
        let organization_id = (role != Role::SystemAdmin).then_some(self.org.id);
        token_for(&self.memory, role, organization_id)
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(self.router.clone(), method, uri, token, body).await
    }

    /// Enrolls a student as an admin and returns the response body.
    pub async fn enroll(&self, email: &str) -> (StatusCode, Value) {
        let token = self.token(Role::Admin);
        self.send(
            "POST",
            &format!("/api/classes/{}/enrollments", self.class.id),
            Some(&token),
            Some(serde_json::json!({
                "first_name": "Chidi",
                "last_name": "Okafor",
                "email": email,
            })),
        )
        .await
    }
}

pub fn token_for(
    memory: &InMemoryStore,
    role: Role,
    organization_id: Option<OrganizationId>,
) -> String {
    let user = memory.insert_user(organization_id, role, "Test", "User");
    create_access_token(user.id, &user.email, role, organization_id, &jwt_config()).unwrap()
}

pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
