use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::documents::DocumentGate;
use super::domain::{
    Certificate, Course, Enrollment, EnrollmentId, EnrollmentStatus, SchoolId, StudentId, UserRole,
};
use super::error::WorkflowError;
use super::progression::ProgressionEngine;
use super::repository::{
    dispatch, CertificateRepository, CourseRepository, EnrollmentRepository, Notification,
    NotificationKind, NotificationPublisher, RepositoryError, SchoolDirectory,
};

/// Snapshot of an enrollment and its course ladder for dashboards and the
/// progress endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentProgress {
    pub enrollment: Enrollment,
    pub courses: Vec<Course>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
}

/// Front door of the enrollment workflow: registration, the document gate,
/// and the manager's approve/reject decision.
pub struct EnrollmentService {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseRepository>,
    certificates: Arc<dyn CertificateRepository>,
    schools: Arc<dyn SchoolDirectory>,
    notifier: Arc<dyn NotificationPublisher>,
    gate: DocumentGate,
    engine: Arc<ProgressionEngine>,
}

impl EnrollmentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        courses: Arc<dyn CourseRepository>,
        certificates: Arc<dyn CertificateRepository>,
        schools: Arc<dyn SchoolDirectory>,
        notifier: Arc<dyn NotificationPublisher>,
        gate: DocumentGate,
        engine: Arc<ProgressionEngine>,
    ) -> Self {
        Self {
            enrollments,
            courses,
            certificates,
            schools,
            notifier,
            gate,
            engine,
        }
    }

    /// Register a student at a school. The store rejects a second
    /// non-terminal enrollment for the same pair, so two concurrent requests
    /// produce exactly one record.
    pub fn enroll(
        &self,
        student_id: StudentId,
        school_id: SchoolId,
    ) -> Result<Enrollment, WorkflowError> {
        self.schools
            .fetch(school_id)?
            .ok_or(WorkflowError::NotFound("school"))?;

        let enrollment = Enrollment::new(student_id, school_id, Utc::now());
        match self.enrollments.insert(enrollment) {
            Ok(enrollment) => {
                info!(enrollment_id = %enrollment.id, %student_id, %school_id, "enrollment created");
                Ok(enrollment)
            }
            Err(RepositoryError::Conflict) => Err(WorkflowError::AlreadyEnrolled),
            Err(err) => Err(err.into()),
        }
    }

    /// Move `pending_documents` to `pending_approval` once the document gate
    /// passes. Safe to call repeatedly; reports what is still missing.
    pub fn refresh_document_status(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, WorkflowError> {
        let enrollment = self
            .enrollments
            .fetch(enrollment_id)?
            .ok_or(WorkflowError::NotFound("enrollment"))?;

        if enrollment.status != EnrollmentStatus::PendingDocuments {
            return Ok(enrollment);
        }

        let missing = self
            .gate
            .missing_documents(enrollment.student_id, UserRole::Student)?;
        if !missing.is_empty() {
            return Err(WorkflowError::DocumentsIncomplete { missing });
        }

        match self.enrollments.transition(
            enrollment_id,
            EnrollmentStatus::PendingDocuments,
            EnrollmentStatus::PendingApproval,
            None,
        ) {
            Ok(enrollment) => Ok(enrollment),
            // A concurrent refresh or approval moved it first; re-read.
            Err(RepositoryError::Conflict) => self
                .enrollments
                .fetch(enrollment_id)?
                .ok_or(WorkflowError::NotFound("enrollment")),
            Err(err) => Err(err.into()),
        }
    }

    /// Approve a pending enrollment: document gate, compare-and-swap status
    /// transition, course initialization, student notification. Concurrent
    /// approvals resolve to exactly one transition and one course set.
    pub fn approve(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, WorkflowError> {
        let enrollment = self
            .enrollments
            .fetch(enrollment_id)?
            .ok_or(WorkflowError::NotFound("enrollment"))?;

        match enrollment.status {
            EnrollmentStatus::PendingDocuments | EnrollmentStatus::PendingApproval => {}
            status => return Err(WorkflowError::EnrollmentNotPending { status }),
        }

        let missing = self
            .gate
            .missing_documents(enrollment.student_id, UserRole::Student)?;
        if !missing.is_empty() {
            return Err(WorkflowError::DocumentsIncomplete { missing });
        }

        let approved = match self.enrollments.transition(
            enrollment_id,
            enrollment.status,
            EnrollmentStatus::Approved,
            Some(Utc::now()),
        ) {
            Ok(enrollment) => enrollment,
            Err(RepositoryError::Conflict) => {
                // Lost the race; surface the current state to the caller.
                let current = self
                    .enrollments
                    .fetch(enrollment_id)?
                    .ok_or(WorkflowError::NotFound("enrollment"))?;
                return Err(WorkflowError::EnrollmentNotPending {
                    status: current.status,
                });
            }
            Err(err) => return Err(err.into()),
        };

        match self.engine.initialize_courses(enrollment_id) {
            Ok(_) => {}
            // Courses can already exist when a previous approval crashed
            // between the transition and the notification; idempotent.
            Err(WorkflowError::AlreadyInitialized) => {}
            Err(err) => return Err(err),
        }

        info!(%enrollment_id, "enrollment approved");

        let school_name = self
            .schools
            .fetch(approved.school_id)?
            .map(|school| school.name)
            .unwrap_or_default();
        let mut metadata = BTreeMap::new();
        metadata.insert("enrollment_id".to_string(), enrollment_id.to_string());
        metadata.insert("school_name".to_string(), school_name.clone());
        dispatch(
            self.notifier.as_ref(),
            Notification {
                user_id: approved.student_id,
                kind: NotificationKind::EnrollmentApproved,
                title: "Enrollment Approved!".to_string(),
                message: format!(
                    "Your enrollment at {school_name} has been approved. You can now start your courses!"
                ),
                metadata,
            },
        );

        Ok(approved)
    }

    /// Reject a pending enrollment with a reason.
    pub fn reject(
        &self,
        enrollment_id: EnrollmentId,
        reason: &str,
    ) -> Result<Enrollment, WorkflowError> {
        let enrollment = self
            .enrollments
            .fetch(enrollment_id)?
            .ok_or(WorkflowError::NotFound("enrollment"))?;

        match enrollment.status {
            EnrollmentStatus::PendingDocuments | EnrollmentStatus::PendingApproval => {}
            status => return Err(WorkflowError::EnrollmentNotPending { status }),
        }

        let rejected = match self.enrollments.transition(
            enrollment_id,
            enrollment.status,
            EnrollmentStatus::Rejected,
            None,
        ) {
            Ok(enrollment) => enrollment,
            Err(RepositoryError::Conflict) => {
                let current = self
                    .enrollments
                    .fetch(enrollment_id)?
                    .ok_or(WorkflowError::NotFound("enrollment"))?;
                return Err(WorkflowError::EnrollmentNotPending {
                    status: current.status,
                });
            }
            Err(err) => return Err(err.into()),
        };

        info!(%enrollment_id, "enrollment rejected");

        let school_name = self
            .schools
            .fetch(rejected.school_id)?
            .map(|school| school.name)
            .unwrap_or_default();
        let mut metadata = BTreeMap::new();
        metadata.insert("enrollment_id".to_string(), enrollment_id.to_string());
        metadata.insert("reason".to_string(), reason.to_string());
        dispatch(
            self.notifier.as_ref(),
            Notification {
                user_id: rejected.student_id,
                kind: NotificationKind::EnrollmentRejected,
                title: "Enrollment Rejected".to_string(),
                message: format!(
                    "Your enrollment at {school_name} was rejected. Reason: {reason}"
                ),
                metadata,
            },
        );

        Ok(rejected)
    }

    /// Current enrollment, course ladder, and certificate, for dashboards.
    pub fn progress(&self, enrollment_id: EnrollmentId) -> Result<EnrollmentProgress, WorkflowError> {
        let enrollment = self
            .enrollments
            .fetch(enrollment_id)?
            .ok_or(WorkflowError::NotFound("enrollment"))?;
        let mut courses = self.courses.for_enrollment(enrollment_id)?;
        courses.sort_by_key(|course| self.engine.config().position(course.course_type));
        let certificate = self.certificates.for_enrollment(enrollment_id)?;

        Ok(EnrollmentProgress {
            enrollment,
            courses,
            certificate,
        })
    }
}
