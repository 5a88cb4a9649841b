use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Identifier for a student's enrollment at one school.
    EnrollmentId
);
entity_id!(CourseId);
entity_id!(SessionId);
entity_id!(ExamId);
entity_id!(CertificateId);
entity_id!(StudentId);
entity_id!(SchoolId);
entity_id!(TeacherId);
entity_id!(ExaminerId);

/// Platform roles relevant to the enrollment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Guest,
    Student,
    Teacher,
    Manager,
    ExternalExpert,
}

/// Identity and medical documents the platform collects per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    ProfilePhoto,
    IdCard,
    MedicalCertificate,
    DrivingLicense,
    TeachingLicense,
}

/// Documents that must exist and be verified before a user of the given role
/// can clear the document gate.
pub fn required_documents(role: UserRole) -> &'static [DocumentType] {
    match role {
        UserRole::Guest => &[],
        UserRole::Student => &[
            DocumentType::ProfilePhoto,
            DocumentType::IdCard,
            DocumentType::MedicalCertificate,
        ],
        UserRole::Teacher | UserRole::ExternalExpert => &[
            DocumentType::ProfilePhoto,
            DocumentType::IdCard,
            DocumentType::DrivingLicense,
            DocumentType::TeachingLicense,
        ],
        UserRole::Manager => &[DocumentType::ProfilePhoto, DocumentType::IdCard],
    }
}

/// The three fixed course stages, in their mandatory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseType {
    Theory,
    Park,
    Road,
}

impl CourseType {
    /// The full sequence in progression order. Theory gates park, park gates road.
    pub const fn sequence() -> &'static [CourseType] {
        &[CourseType::Theory, CourseType::Park, CourseType::Road]
    }

    pub const fn label(self) -> &'static str {
        match self {
            CourseType::Theory => "theory",
            CourseType::Park => "park",
            CourseType::Road => "road",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    PendingDocuments,
    PendingApproval,
    Approved,
    Rejected,
    Completed,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::PendingDocuments => "pending_documents",
            EnrollmentStatus::PendingApproval => "pending_approval",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
            EnrollmentStatus::Completed => "completed",
        }
    }

    /// Rejected and completed enrollments are terminal; everything else still
    /// counts against the one-active-enrollment-per-school rule.
    pub const fn is_terminal(self) -> bool {
        matches!(self, EnrollmentStatus::Rejected | EnrollmentStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Locked,
    Available,
    InProgress,
    Completed,
    Failed,
}

impl CourseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CourseStatus::Locked => "locked",
            CourseStatus::Available => "available",
            CourseStatus::InProgress => "in_progress",
            CourseStatus::Completed => "completed",
            CourseStatus::Failed => "failed",
        }
    }

    /// Whether a student can book practice sessions against the course.
    pub const fn is_open(self) -> bool {
        matches!(self, CourseStatus::Available | CourseStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    NotAvailable,
    Available,
    Passed,
    Failed,
}

impl ExamStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ExamStatus::NotAvailable => "not_available",
            ExamStatus::Available => "available",
            ExamStatus::Passed => "passed",
            ExamStatus::Failed => "failed",
        }
    }

    /// Grading is one-shot: passed and failed are terminal.
    pub const fn is_graded(self) -> bool {
        matches!(self, ExamStatus::Passed | ExamStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::NoShow => "no_show",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Generated,
    Issued,
}

impl CertificateStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CertificateStatus::Generated => "generated",
            CertificateStatus::Issued => "issued",
        }
    }
}

/// A student's registration at one driving school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub school_id: SchoolId,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(student_id: StudentId, school_id: SchoolId, now: DateTime<Utc>) -> Self {
        Self {
            id: EnrollmentId::generate(),
            student_id,
            school_id,
            status: EnrollmentStatus::PendingDocuments,
            created_at: now,
            approved_at: None,
        }
    }
}

/// One stage (theory/park/road) within an enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub enrollment_id: EnrollmentId,
    pub course_type: CourseType,
    pub status: CourseStatus,
    pub completed_sessions: u32,
    pub total_sessions: u32,
    pub exam_status: ExamStatus,
    pub exam_score: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// A single scheduled practice lesson contributing to a course's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSession {
    pub id: SessionId,
    pub course_id: CourseId,
    pub teacher_id: TeacherId,
    pub student_id: StudentId,
    pub session_type: CourseType,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: SessionStatus,
    pub notes: Option<String>,
}

impl PracticeSession {
    /// When the booked slot ends.
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// A proctored assessment gating progression to the next course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub course_id: CourseId,
    pub student_id: StudentId,
    pub examiner_id: ExaminerId,
    pub exam_type: CourseType,
    pub scheduled_at: DateTime<Utc>,
    pub status: ExamStatus,
    pub score: Option<f64>,
    pub notes: Option<String>,
}

/// The terminal artifact issued once every course exam is passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub student_id: StudentId,
    pub enrollment_id: EnrollmentId,
    pub certificate_number: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: CertificateStatus,
}

/// An examiner not affiliated with the school, assigned to grade exams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examiner {
    pub id: ExaminerId,
    pub full_name: String,
    pub specializations: Vec<CourseType>,
    pub available_states: Vec<String>,
    pub is_available: bool,
}

/// Directory entry for a student; the wilaya feeds certificate numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub full_name: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub state: String,
}

/// A verified identity/medical document on file for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedDocument {
    pub user_id: StudentId,
    pub document_type: DocumentType,
    pub is_verified: bool,
    pub uploaded_at: DateTime<Utc>,
}
