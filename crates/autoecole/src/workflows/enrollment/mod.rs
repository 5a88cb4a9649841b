//! The enrollment workflow: a student registers at a school, clears the
//! document gate, gets approved, and works through the fixed course ladder
//! (theory, park, road) where each exam pass unlocks the next stage and the
//! final pass produces a certificate.

pub mod certificate;
pub mod documents;
pub mod domain;
pub mod error;
pub mod memory;
pub mod platform;
pub mod progression;
pub mod repository;
pub mod router;
pub mod scheduling;
pub mod service;

#[cfg(test)]
mod tests;

pub use certificate::CertificateIssuer;
pub use documents::DocumentGate;
pub use domain::{
    Certificate, CertificateId, CertificateStatus, Course, CourseId, CourseStatus, CourseType,
    DocumentType, Enrollment, EnrollmentId, EnrollmentStatus, Exam, ExamId, ExamStatus, Examiner,
    ExaminerId, PracticeSession, School, SchoolId, SessionId, SessionStatus, StudentId,
    StudentProfile, TeacherId, UserRole,
};
pub use error::{WorkflowError, WorkflowErrorKind};
pub use platform::{EnrollmentPlatform, PlatformStores};
pub use progression::{ExamOutcome, ProgressionConfig, ProgressionEngine, StageConfig};
pub use repository::{
    CertificateRepository, CourseRepository, DocumentRepository, EnrollmentRepository,
    ExamRepository, ExaminerRepository, Notification, NotificationKind, NotificationPublisher,
    NotifyError, RepositoryError, SchoolDirectory, SessionRepository, StudentDirectory,
};
pub use router::enrollment_router;
pub use scheduling::{ExamRequest, SchedulingService, SessionRequest};
pub use service::{EnrollmentProgress, EnrollmentService};
