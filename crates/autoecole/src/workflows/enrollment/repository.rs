use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Certificate, CertificateId, Course, CourseId, CourseType, DocumentType, Enrollment,
    EnrollmentId, EnrollmentStatus, Exam, ExamId, ExamStatus, Examiner, PracticeSession, School,
    SchoolId, SessionId, SessionStatus, StudentId, StudentProfile,
};

/// Error enumeration for storage failures.
///
/// `Conflict` is how stores report uniqueness and compare-and-swap losses;
/// the workflow layer translates it into the appropriate business rejection
/// (duplicate enrollment, already graded, already issued, ...) instead of
/// treating it as a fault.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Enrollment storage. The store, not the caller, owns the invariant that a
/// (student, school) pair has at most one non-terminal enrollment.
pub trait EnrollmentRepository: Send + Sync {
    /// Insert a new enrollment. Fails with `Conflict` when a non-terminal
    /// enrollment already exists for the same student and school.
    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError>;

    fn fetch(&self, id: EnrollmentId) -> Result<Option<Enrollment>, RepositoryError>;

    /// Compare-and-swap on status. Fails with `Conflict` when the stored
    /// status differs from `from`, so concurrent approvals race to exactly
    /// one winner.
    fn transition(
        &self,
        id: EnrollmentId,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
        approved_at: Option<DateTime<Utc>>,
    ) -> Result<Enrollment, RepositoryError>;
}

/// Course storage for the progression engine.
pub trait CourseRepository: Send + Sync {
    /// Atomically create the full course set for an enrollment. Fails with
    /// `Conflict` when any course already exists for it, which is the
    /// engine's idempotency guard against double initialization.
    fn insert_set(&self, courses: Vec<Course>) -> Result<Vec<Course>, RepositoryError>;

    fn fetch(&self, id: CourseId) -> Result<Option<Course>, RepositoryError>;

    /// All courses for an enrollment, ordered by the fixed type sequence.
    fn for_enrollment(&self, enrollment_id: EnrollmentId) -> Result<Vec<Course>, RepositoryError>;

    /// Advance the completed-session counter by one, atomically. Fails with
    /// `Conflict` when the counter is already at `total_sessions`.
    fn record_session(&self, id: CourseId) -> Result<Course, RepositoryError>;

    /// Persist a full course record (status/exam fields). Last write wins;
    /// callers keep these writes idempotent.
    fn update(&self, course: Course) -> Result<(), RepositoryError>;
}

/// Practice-session storage.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: PracticeSession) -> Result<PracticeSession, RepositoryError>;

    fn fetch(&self, id: SessionId) -> Result<Option<PracticeSession>, RepositoryError>;

    /// Compare-and-swap on status; `Conflict` when the stored status differs
    /// from `from`. Used by both completion and the expiry sweep so each
    /// session leaves `scheduled` exactly once.
    fn transition(
        &self,
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        notes: Option<String>,
    ) -> Result<PracticeSession, RepositoryError>;

    /// Sessions still `scheduled` whose slot ended at or before `cutoff`.
    fn stale_scheduled(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PracticeSession>, RepositoryError>;
}

/// Exam storage. Grading is one-shot at the store level.
pub trait ExamRepository: Send + Sync {
    fn insert(&self, exam: Exam) -> Result<Exam, RepositoryError>;

    fn fetch(&self, id: ExamId) -> Result<Option<Exam>, RepositoryError>;

    /// Record the terminal outcome, compare-and-swap from `available`.
    /// Fails with `Conflict` when the exam was already graded.
    fn grade(
        &self,
        id: ExamId,
        outcome: ExamStatus,
        score: f64,
        notes: Option<String>,
    ) -> Result<Exam, RepositoryError>;
}

/// Certificate storage; uniqueness per enrollment is the issuance guard.
pub trait CertificateRepository: Send + Sync {
    /// Fails with `Conflict` when a certificate already exists for the
    /// enrollment, regardless of the caller's prior existence checks.
    fn insert(&self, certificate: Certificate) -> Result<Certificate, RepositoryError>;

    fn fetch(&self, id: CertificateId) -> Result<Option<Certificate>, RepositoryError>;

    fn for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, RepositoryError>;
}

/// Read access to verified documents for the completeness gate.
pub trait DocumentRepository: Send + Sync {
    /// Document types with at least one verified record for the user.
    fn verified_types(&self, user_id: StudentId) -> Result<BTreeSet<DocumentType>, RepositoryError>;
}

/// Read access to the external-examiner roster.
pub trait ExaminerRepository: Send + Sync {
    /// Available examiners whose specialization covers `exam_type` and whose
    /// coverage includes `state`. Order is the roster's insertion order; the
    /// caller takes the first match.
    fn find_available(
        &self,
        exam_type: CourseType,
        state: &str,
    ) -> Result<Vec<Examiner>, RepositoryError>;
}

/// Student directory lookups (name and wilaya for notifications and
/// certificate numbering).
pub trait StudentDirectory: Send + Sync {
    fn fetch(&self, id: StudentId) -> Result<Option<StudentProfile>, RepositoryError>;
}

/// School directory lookups.
pub trait SchoolDirectory: Send + Sync {
    fn fetch(&self, id: SchoolId) -> Result<Option<School>, RepositoryError>;
}

/// Notification kinds emitted by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EnrollmentApproved,
    EnrollmentRejected,
    ExamScheduled,
    CourseCompleted,
    CertificateReady,
}

/// Fire-and-forget notification payload. Metadata stays a free-form map
/// because it is opaque pass-through for the delivery channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: StudentId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
}

/// Delivery failure. Callers log these and move on; a lost notification must
/// never roll back the state transition that produced it.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Outbound notification hook (e-mail/SMS/push adapters sit behind this).
pub trait NotificationPublisher: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Publish a notification, logging and swallowing delivery failures so the
/// owning state transition always stands.
pub(crate) fn dispatch(publisher: &dyn NotificationPublisher, notification: Notification) {
    let kind = notification.kind;
    if let Err(err) = publisher.notify(notification) {
        tracing::warn!(?kind, error = %err, "notification delivery failed");
    }
}
