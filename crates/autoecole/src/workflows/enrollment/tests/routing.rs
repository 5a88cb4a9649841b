use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::enrollment::router::{self, CompleteExamBody};
use crate::workflows::enrollment::{enrollment_router, CourseType};

async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serializes")))
        .expect("request builds")
}

#[tokio::test]
async fn enroll_route_creates_a_pending_enrollment() {
    let context = build_context();
    let router = enrollment_router(context.platform.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/enrollments",
            &json!({
                "student_id": context.student_id.0,
                "school_id": context.school_id.0,
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("pending_documents")));
    assert!(payload.get("id").is_some());
}

#[tokio::test]
async fn enroll_route_reports_duplicates_as_conflict() {
    let context = build_context();
    context
        .platform
        .enrollment
        .enroll(context.student_id, context.school_id)
        .expect("first enrollment succeeds");

    let router = enrollment_router(context.platform.clone());
    let response = router
        .oneshot(post_json(
            "/api/v1/enrollments",
            &json!({
                "student_id": context.student_id.0,
                "school_id": context.school_id.0,
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert!(payload.get("error").is_some());
}

#[tokio::test]
async fn approve_route_rejects_an_incomplete_document_set() {
    let context = build_context();
    let enrollment = context
        .platform
        .enrollment
        .enroll(context.student_id, context.school_id)
        .expect("enrollment succeeds");

    let router = enrollment_router(context.platform.clone());
    let response = router
        .oneshot(
            Request::post(format!("/api/v1/enrollments/{}/approve", enrollment.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("documents"));
}

#[tokio::test]
async fn approve_route_handles_unknown_enrollments() {
    let context = build_context();
    let router = enrollment_router(context.platform.clone());

    let response = router
        .oneshot(
            Request::post(format!(
                "/api/v1/enrollments/{}/approve",
                uuid::Uuid::new_v4()
            ))
            .body(Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn progress_route_returns_the_course_ladder() {
    let context = build_context();
    let enrollment = approved_enrollment(&context);

    let router = enrollment_router(context.platform.clone());
    let response = router
        .oneshot(
            Request::get(format!("/api/v1/enrollments/{}/progress", enrollment.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let courses = payload
        .get("courses")
        .and_then(Value::as_array)
        .expect("courses array");
    assert_eq!(courses.len(), 3);
    assert_eq!(courses[0].get("course_type"), Some(&json!("theory")));
    assert_eq!(courses[0].get("status"), Some(&json!("available")));
    assert_eq!(courses[1].get("status"), Some(&json!("locked")));
    assert!(payload.get("certificate").is_none());
}

#[tokio::test]
async fn session_routes_book_and_complete_a_slot() {
    let context = build_context();
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    let router = enrollment_router(context.platform.clone());
    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/courses/{}/sessions", theory.id),
            &json!({
                "teacher_id": uuid::Uuid::new_v4(),
                "scheduled_at": "2026-09-01T09:00:00Z",
                "duration_minutes": 60,
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let session = read_json_body(response).await;
    let session_id = session
        .get("id")
        .and_then(Value::as_str)
        .expect("session id");

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/complete"),
            &json!({ "notes": "smooth start" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let completed = read_json_body(response).await;
    assert_eq!(completed.get("status"), Some(&json!("completed")));
    assert_eq!(completed.get("notes"), Some(&json!("smooth start")));
}

#[tokio::test]
async fn complete_exam_handler_returns_the_graded_outcome() {
    let context = build_context();
    let examiner = seed_examiner(&context);
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);
    complete_all_sessions(&context, theory.id, theory.total_sessions).expect("sessions complete");

    let exam = context
        .platform
        .scheduling
        .schedule_exam(crate::workflows::enrollment::ExamRequest {
            course_id: theory.id,
            preferred_dates: vec![chrono::Utc::now() + chrono::Duration::days(3)],
            location: "Alger".to_string(),
        })
        .expect("exam booked");

    let response = router::complete_exam_handler(
        State(context.platform.clone()),
        Path(exam.id.0),
        axum::Json(CompleteExamBody {
            examiner_id: examiner.0,
            score: 82.5,
            notes: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("passed"), Some(&json!(true)));
    assert_eq!(payload.get("score"), Some(&json!(82.5)));
}

#[tokio::test]
async fn verify_route_reports_a_valid_certificate() {
    let context = build_context();
    let examiner = seed_examiner(&context);
    let enrollment = approved_enrollment(&context);

    for course_type in [CourseType::Theory, CourseType::Park, CourseType::Road] {
        let course = course_of(&context, &enrollment, course_type);
        complete_all_sessions(&context, course.id, course.total_sessions)
            .expect("sessions complete");
        sit_exam(&context, course.id, examiner, 85.0).expect("exam passes");
    }

    let certificate = context
        .platform
        .enrollment
        .progress(enrollment.id)
        .expect("progress loads")
        .certificate
        .expect("certificate issued");

    let router = enrollment_router(context.platform.clone());
    let response = router
        .oneshot(
            Request::get(format!("/api/v1/certificates/{}/verify", certificate.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("valid"), Some(&json!(true)));
    assert_eq!(
        payload
            .get("certificate")
            .and_then(|c| c.get("certificate_number"))
            .and_then(Value::as_str)
            .map(|number| number.starts_with("DZ-ALG-")),
        Some(true)
    );
}

#[tokio::test]
async fn verify_route_handles_unknown_certificates() {
    let context = build_context();
    let router = enrollment_router(context.platform.clone());

    let response = router
        .oneshot(
            Request::get(format!(
                "/api/v1/certificates/{}/verify",
                uuid::Uuid::new_v4()
            ))
            .body(Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
