use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::domain::{
    CertificateId, CourseId, EnrollmentId, ExamId, ExaminerId, SchoolId, SessionId, StudentId,
    TeacherId,
};
use super::error::{WorkflowError, WorkflowErrorKind};
use super::platform::EnrollmentPlatform;
use super::scheduling::{ExamRequest, SessionRequest};

/// Router builder exposing the enrollment workflow over HTTP. Auth and role
/// checks belong to middleware layered outside this crate.
pub fn enrollment_router(platform: EnrollmentPlatform) -> Router {
    Router::new()
        .route("/api/v1/enrollments", post(enroll_handler))
        .route(
            "/api/v1/enrollments/:enrollment_id/approve",
            post(approve_handler),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/reject",
            post(reject_handler),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/documents/refresh",
            post(refresh_documents_handler),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/progress",
            get(progress_handler),
        )
        .route(
            "/api/v1/courses/:course_id/sessions",
            post(schedule_session_handler),
        )
        .route(
            "/api/v1/sessions/:session_id/complete",
            post(complete_session_handler),
        )
        .route(
            "/api/v1/courses/:course_id/exams",
            post(schedule_exam_handler),
        )
        .route(
            "/api/v1/exams/:exam_id/complete",
            post(complete_exam_handler),
        )
        .route(
            "/api/v1/certificates/:certificate_id/verify",
            get(verify_certificate_handler),
        )
        .with_state(platform)
}

fn error_response(err: WorkflowError) -> Response {
    let status = match err.kind() {
        WorkflowErrorKind::Validation => StatusCode::BAD_REQUEST,
        WorkflowErrorKind::NotFound => StatusCode::NOT_FOUND,
        WorkflowErrorKind::Precondition => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowErrorKind::Conflict => StatusCode::CONFLICT,
        WorkflowErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollRequestBody {
    pub student_id: Uuid,
    pub school_id: Uuid,
}

pub(crate) async fn enroll_handler(
    State(platform): State<EnrollmentPlatform>,
    Json(body): Json<EnrollRequestBody>,
) -> Response {
    match platform
        .enrollment
        .enroll(StudentId(body.student_id), SchoolId(body.school_id))
    {
        Ok(enrollment) => (StatusCode::CREATED, Json(enrollment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approve_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(enrollment_id): Path<Uuid>,
) -> Response {
    match platform.enrollment.approve(EnrollmentId(enrollment_id)) {
        Ok(enrollment) => (StatusCode::OK, Json(enrollment)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequestBody {
    pub reason: String,
}

pub(crate) async fn reject_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(enrollment_id): Path<Uuid>,
    Json(body): Json<RejectRequestBody>,
) -> Response {
    match platform
        .enrollment
        .reject(EnrollmentId(enrollment_id), &body.reason)
    {
        Ok(enrollment) => (StatusCode::OK, Json(enrollment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn refresh_documents_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(enrollment_id): Path<Uuid>,
) -> Response {
    match platform
        .enrollment
        .refresh_document_status(EnrollmentId(enrollment_id))
    {
        Ok(enrollment) => (StatusCode::OK, Json(enrollment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn progress_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(enrollment_id): Path<Uuid>,
) -> Response {
    match platform.enrollment.progress(EnrollmentId(enrollment_id)) {
        Ok(progress) => (StatusCode::OK, Json(progress)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleSessionBody {
    pub teacher_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
}

pub(crate) async fn schedule_session_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(course_id): Path<Uuid>,
    Json(body): Json<ScheduleSessionBody>,
) -> Response {
    let request = SessionRequest {
        course_id: CourseId(course_id),
        teacher_id: TeacherId(body.teacher_id),
        scheduled_at: body.scheduled_at,
        duration_minutes: body.duration_minutes,
    };
    match platform.scheduling.schedule_session(request) {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompleteSessionBody {
    #[serde(default)]
    pub notes: Option<String>,
}

pub(crate) async fn complete_session_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<CompleteSessionBody>,
) -> Response {
    match platform
        .scheduling
        .complete_session(SessionId(session_id), body.notes)
    {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleExamBody {
    pub preferred_dates: Vec<DateTime<Utc>>,
    pub location: String,
}

pub(crate) async fn schedule_exam_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(course_id): Path<Uuid>,
    Json(body): Json<ScheduleExamBody>,
) -> Response {
    let request = ExamRequest {
        course_id: CourseId(course_id),
        preferred_dates: body.preferred_dates,
        location: body.location,
    };
    match platform.scheduling.schedule_exam(request) {
        Ok(exam) => (StatusCode::CREATED, Json(exam)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteExamBody {
    pub examiner_id: Uuid,
    pub score: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

pub(crate) async fn complete_exam_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(exam_id): Path<Uuid>,
    Json(body): Json<CompleteExamBody>,
) -> Response {
    match platform.scheduling.complete_exam(
        ExamId(exam_id),
        ExaminerId(body.examiner_id),
        body.score,
        body.notes,
    ) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn verify_certificate_handler(
    State(platform): State<EnrollmentPlatform>,
    Path(certificate_id): Path<Uuid>,
) -> Response {
    match platform.certificates.verify(CertificateId(certificate_id)) {
        Ok(certificate) => {
            let expired = certificate.expiry_date < Utc::now();
            (
                StatusCode::OK,
                Json(json!({
                    "valid": !expired,
                    "certificate": certificate,
                })),
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}
