use std::sync::Arc;

use super::certificate::CertificateIssuer;
use super::documents::DocumentGate;
use super::progression::{ProgressionConfig, ProgressionEngine};
use super::repository::{
    CertificateRepository, CourseRepository, DocumentRepository, EnrollmentRepository,
    ExamRepository, ExaminerRepository, NotificationPublisher, SchoolDirectory, SessionRepository,
    StudentDirectory,
};
use super::scheduling::SchedulingService;
use super::service::EnrollmentService;

/// The storage seams the workflow depends on, bundled so call sites wire one
/// value instead of nine.
#[derive(Clone)]
pub struct PlatformStores {
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub exams: Arc<dyn ExamRepository>,
    pub certificates: Arc<dyn CertificateRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub examiners: Arc<dyn ExaminerRepository>,
    pub students: Arc<dyn StudentDirectory>,
    pub schools: Arc<dyn SchoolDirectory>,
}

/// Fully wired workflow facade: the enrollment service, the scheduling
/// service, and the certificate issuer sharing one progression engine.
#[derive(Clone)]
pub struct EnrollmentPlatform {
    pub enrollment: Arc<EnrollmentService>,
    pub scheduling: Arc<SchedulingService>,
    pub certificates: Arc<CertificateIssuer>,
    pub engine: Arc<ProgressionEngine>,
}

impl EnrollmentPlatform {
    pub fn new(
        stores: PlatformStores,
        notifier: Arc<dyn NotificationPublisher>,
        config: ProgressionConfig,
    ) -> Self {
        let certificates = Arc::new(CertificateIssuer::new(
            stores.enrollments.clone(),
            stores.courses.clone(),
            stores.certificates.clone(),
            stores.students.clone(),
            notifier.clone(),
            config.certificate_validity_days,
        ));

        let engine = Arc::new(ProgressionEngine::new(
            stores.enrollments.clone(),
            stores.courses.clone(),
            stores.exams.clone(),
            notifier.clone(),
            certificates.clone(),
            config,
        ));

        let scheduling = Arc::new(SchedulingService::new(
            stores.enrollments.clone(),
            stores.courses.clone(),
            stores.sessions.clone(),
            stores.exams.clone(),
            stores.examiners.clone(),
            stores.schools.clone(),
            notifier.clone(),
            engine.clone(),
        ));

        let enrollment = Arc::new(EnrollmentService::new(
            stores.enrollments.clone(),
            stores.courses.clone(),
            stores.certificates.clone(),
            stores.schools.clone(),
            notifier,
            DocumentGate::new(stores.documents),
            engine.clone(),
        ));

        Self {
            enrollment,
            scheduling,
            certificates,
            engine,
        }
    }
}
