use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use super::domain::{
    Certificate, CertificateId, CertificateStatus, EnrollmentId, EnrollmentStatus, ExamStatus,
};
use super::error::WorkflowError;
use super::repository::{
    dispatch, CertificateRepository, CourseRepository, EnrollmentRepository, Notification,
    NotificationKind, NotificationPublisher, RepositoryError, StudentDirectory,
};

/// Issues the terminal certificate once every course exam under an
/// enrollment is passed.
///
/// Idempotency rests on the certificate store's per-enrollment uniqueness,
/// not on the pre-flight existence check; two concurrent eligible callers
/// both reach `insert` and exactly one wins.
pub struct CertificateIssuer {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseRepository>,
    certificates: Arc<dyn CertificateRepository>,
    students: Arc<dyn StudentDirectory>,
    notifier: Arc<dyn NotificationPublisher>,
    validity_days: i64,
}

impl CertificateIssuer {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        courses: Arc<dyn CourseRepository>,
        certificates: Arc<dyn CertificateRepository>,
        students: Arc<dyn StudentDirectory>,
        notifier: Arc<dyn NotificationPublisher>,
        validity_days: i64,
    ) -> Self {
        Self {
            enrollments,
            courses,
            certificates,
            students,
            notifier,
            validity_days,
        }
    }

    /// Issue a certificate when every course exam is passed and none exists
    /// yet for the enrollment. Not eligible, or already issued, is a no-op
    /// returning `None`, never an error.
    pub fn issue_if_eligible(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, WorkflowError> {
        let courses = self.courses.for_enrollment(enrollment_id)?;
        if courses.is_empty() || courses.iter().any(|c| c.exam_status != ExamStatus::Passed) {
            return Ok(None);
        }

        if self.certificates.for_enrollment(enrollment_id)?.is_some() {
            return Ok(None);
        }

        let enrollment = self
            .enrollments
            .fetch(enrollment_id)?
            .ok_or(WorkflowError::NotFound("enrollment"))?;
        let student = self
            .students
            .fetch(enrollment.student_id)?
            .ok_or(WorkflowError::NotFound("student"))?;

        let now = Utc::now();
        let id = CertificateId::generate();
        let certificate = Certificate {
            id,
            student_id: enrollment.student_id,
            enrollment_id,
            certificate_number: certificate_number(&student.state, now.timestamp(), id),
            issue_date: now,
            expiry_date: now + Duration::days(self.validity_days),
            status: CertificateStatus::Generated,
        };

        let certificate = match self.certificates.insert(certificate) {
            Ok(certificate) => certificate,
            // Lost the race to a concurrent issuer; the work is already done.
            Err(RepositoryError::Conflict) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        // The enrollment reaches its terminal state alongside issuance. A
        // concurrent caller may have done it already; that is fine.
        match self.enrollments.transition(
            enrollment_id,
            EnrollmentStatus::Approved,
            EnrollmentStatus::Completed,
            enrollment.approved_at,
        ) {
            Ok(_) | Err(RepositoryError::Conflict) => {}
            Err(err) => return Err(err.into()),
        }

        info!(%enrollment_id, number = %certificate.certificate_number, "certificate issued");

        let mut metadata = BTreeMap::new();
        metadata.insert("certificate_id".to_string(), certificate.id.to_string());
        metadata.insert(
            "certificate_number".to_string(),
            certificate.certificate_number.clone(),
        );
        dispatch(
            self.notifier.as_ref(),
            Notification {
                user_id: enrollment.student_id,
                kind: NotificationKind::CertificateReady,
                title: "Certificate Ready!".to_string(),
                message: "Congratulations! Your driving certificate is ready for download."
                    .to_string(),
                metadata,
            },
        );

        Ok(Some(certificate))
    }

    /// Public verification lookup backing `GET /certificates/{id}/verify`.
    pub fn verify(&self, id: CertificateId) -> Result<Certificate, WorkflowError> {
        self.certificates
            .fetch(id)?
            .ok_or(WorkflowError::NotFound("certificate"))
    }
}

/// Certificate numbers combine the issuing state, a coarse timestamp, and a
/// certificate-id prefix. The prefix keeps numbers unique when two
/// certificates are issued within the same second.
fn certificate_number(state: &str, timestamp: i64, id: CertificateId) -> String {
    let prefix: String = state
        .chars()
        .filter(|c| c.is_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let short = id.0.simple().to_string();
    format!("DZ-{}-{}-{}", prefix, timestamp, &short[..8])
}
