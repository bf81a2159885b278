mod common;

use academy_client::api::{NotificationApi, SessionApi};
use academy_client::error::ErrorKind;
use academy_client::models::session::Role;
use academy_client::views::AuthFlow;

#[tokio::test]
async fn calls_without_a_session_are_unauthorized() {
    let server = common::start_server().await;
    let client = common::test_client(server.addr, true);

    let err = client.ctx.api.student_courses().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.message, "Not authenticated");
    assert!(err.is_unauthorized());

    let err = client.ctx.api.verify().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn server_error_envelope_message_is_kept() {
    let server = common::start_server().await;
    let client = common::test_client(server.addr, true);
    server.backend.fail("GET /api/admin/stats");

    let err = client.ctx.api.admin_stats().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Rejected);
    assert_eq!(err.message, "Server exploded");
    assert_eq!(err.status.map(|s| s.as_u16()), Some(500));
    assert_eq!(err.user_message("Failed to load stats"), "Server exploded");
}

#[tokio::test]
async fn student_lookup_maps_not_found() {
    let server = common::start_server().await;
    let client = common::test_client(server.addr, true);
    AuthFlow::new(client.ctx.clone())
        .login(Role::Student, common::STUDENT_EMAIL, common::STUDENT_PASSWORD)
        .await
        .unwrap();

    let err = client.ctx.api.student("stu_nobody").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Rejected);
    assert_eq!(err.message, "Student not found");

    let student = client.ctx.api.student(common::STUDENT_ID).await.unwrap();
    assert_eq!(student.name, "Ada");
    assert_eq!(student.enrolled_courses.len(), 2);
}

#[tokio::test]
async fn notification_history_round_trip() {
    let server = common::start_server().await;
    let client = common::test_client(server.addr, true);
    server.backend.add_notification(serde_json::json!({
        "_id": "n1",
        "message": "You were enrolled in Algebra",
        "type": "COURSE_ASSIGNED",
        "createdAt": "2026-02-01T08:30:00Z",
        "payload": { "courses": [{ "_id": "c_alg", "title": "Algebra" }] },
    }));

    let history = client.ctx.api.fetch_notifications(common::STUDENT_ID).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, "n1");
    assert!(!history[0].read);
    assert_eq!(history[0].payload.courses[0].id, "c_alg");
    assert!(server
        .backend
        .calls()
        .contains(&"GET /api/notifications".to_string()));

    client.ctx.api.mark_all_read(common::STUDENT_ID).await.unwrap();
    assert_eq!(server.backend.notifications()[0]["read"], serde_json::json!(true));
}
