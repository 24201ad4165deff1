mod common;

use axum::http::StatusCode;
use campusdesk_core::Role;
use common::{TestApp, token_for};

#[tokio::test]
async fn test_admin_reconciles_own_organization() {
    let app = TestApp::new();
    app.section("A", 5);
    app.section("B", 5);
    app.enroll("one@example.com").await;
    let token = app.token(Role::Admin);

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/organizations/{}/reconcile", app.org.id),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization_id"], app.org.id.to_string());
    assert_eq!(body["report"]["organizations"], 1);
    assert_eq!(body["report"]["classes"], 1);
    assert_eq!(body["report"]["sections"], 2);
    assert_eq!(body["report"]["members_pruned"], 0);
}

#[tokio::test]
async fn test_reconcile_scope() {
    let app = TestApp::new();
    let other = app.memory.insert_organization("Riverside College", None);
    let uri = format!("/api/organizations/{}/reconcile", app.org.id);

    let outsider = token_for(&app.memory, Role::Admin, Some(other.id));
    let (status, _) = app.send("POST", &uri, Some(&outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let teacher = app.token(Role::Teacher);
    let (status, _) = app.send("POST", &uri, Some(&teacher), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let system_admin = app.token(Role::SystemAdmin);
    let (status, _) = app.send("POST", &uri, Some(&system_admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/organizations/{}/reconcile", uuid::Uuid::new_v4()),
            Some(&system_admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = TestApp::new();

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/organizations/{}/reconcile", app.org.id),
            Some("not-a-jwt"),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
