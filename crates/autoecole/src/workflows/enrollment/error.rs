use super::domain::{CourseStatus, DocumentType, EnrollmentStatus, ExamStatus, SessionStatus};
use super::repository::RepositoryError;

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowErrorKind {
    /// Bad input; the caller should not retry unchanged.
    Validation,
    /// An id did not resolve to a record.
    NotFound,
    /// A business rule rejected the operation; not a system fault.
    Precondition,
    /// Uniqueness said the work was already done.
    Conflict,
    /// The store itself failed.
    Internal,
}

/// Errors surfaced by the enrollment workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("student already has an active enrollment at this school")]
    AlreadyEnrolled,

    #[error("courses already initialized for this enrollment")]
    AlreadyInitialized,

    #[error("required documents missing or unverified: {missing:?}")]
    DocumentsIncomplete { missing: Vec<DocumentType> },

    #[error("enrollment is {status:?}, expected a pending status")]
    EnrollmentNotPending { status: EnrollmentStatus },

    #[error("course is {status:?} and not open for sessions")]
    CourseNotOpen { status: CourseStatus },

    #[error("course already reached its required session count")]
    SessionOverflow,

    #[error("session is {status:?}, expected scheduled")]
    SessionNotOpen { status: SessionStatus },

    #[error("course exam is {status:?}, not available for scheduling")]
    ExamNotSchedulable { status: ExamStatus },

    #[error("exam already graded")]
    AlreadyGraded,

    #[error("no available examiner matches this exam type and location")]
    NoExaminerAvailable,

    #[error("exam is assigned to a different examiner")]
    ExaminerMismatch,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError {
    pub fn kind(&self) -> WorkflowErrorKind {
        match self {
            WorkflowError::Validation(_) => WorkflowErrorKind::Validation,
            WorkflowError::NotFound(_) | WorkflowError::Repository(RepositoryError::NotFound) => {
                WorkflowErrorKind::NotFound
            }
            WorkflowError::AlreadyEnrolled | WorkflowError::AlreadyInitialized => {
                WorkflowErrorKind::Conflict
            }
            WorkflowError::DocumentsIncomplete { .. }
            | WorkflowError::EnrollmentNotPending { .. }
            | WorkflowError::CourseNotOpen { .. }
            | WorkflowError::SessionOverflow
            | WorkflowError::SessionNotOpen { .. }
            | WorkflowError::ExamNotSchedulable { .. }
            | WorkflowError::AlreadyGraded
            | WorkflowError::NoExaminerAvailable
            | WorkflowError::ExaminerMismatch => WorkflowErrorKind::Precondition,
            WorkflowError::Repository(RepositoryError::Conflict) => WorkflowErrorKind::Conflict,
            WorkflowError::Repository(RepositoryError::Unavailable(_)) => {
                WorkflowErrorKind::Internal
            }
        }
    }
}
