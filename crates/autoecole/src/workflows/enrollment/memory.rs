//! In-memory implementations of the storage traits.
//!
//! These back the API service, the CLI demo, and the test suites. Each store
//! keeps its records behind one mutex, so the uniqueness and
//! compare-and-swap contracts hold under concurrent callers the same way a
//! unique index would.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::{
    Certificate, CertificateId, Course, CourseId, CourseType, DocumentType, Enrollment,
    EnrollmentId, EnrollmentStatus, Exam, ExamId, ExamStatus, Examiner, PracticeSession, School,
    SchoolId, SessionId, SessionStatus, StudentId, StudentProfile, VerifiedDocument,
};
use super::repository::{
    CertificateRepository, CourseRepository, DocumentRepository, EnrollmentRepository,
    ExamRepository, ExaminerRepository, Notification, NotificationPublisher, NotifyError,
    RepositoryError, SchoolDirectory, SessionRepository, StudentDirectory,
};

#[derive(Default, Clone)]
pub struct InMemoryEnrollmentStore {
    records: Arc<Mutex<HashMap<EnrollmentId, Enrollment>>>,
}

impl EnrollmentRepository for InMemoryEnrollmentStore {
    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError> {
        let mut guard = self.records.lock().expect("enrollment store poisoned");
        let duplicate = guard.values().any(|existing| {
            existing.student_id == enrollment.student_id
                && existing.school_id == enrollment.school_id
                && !existing.status.is_terminal()
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(enrollment.id, enrollment.clone());
        Ok(enrollment)
    }

    fn fetch(&self, id: EnrollmentId) -> Result<Option<Enrollment>, RepositoryError> {
        let guard = self.records.lock().expect("enrollment store poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn transition(
        &self,
        id: EnrollmentId,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
        approved_at: Option<DateTime<Utc>>,
    ) -> Result<Enrollment, RepositoryError> {
        let mut guard = self.records.lock().expect("enrollment store poisoned");
        let record = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.status != from {
            return Err(RepositoryError::Conflict);
        }
        record.status = to;
        if approved_at.is_some() {
            record.approved_at = approved_at;
        }
        Ok(record.clone())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCourseStore {
    records: Arc<Mutex<HashMap<CourseId, Course>>>,
}

impl CourseRepository for InMemoryCourseStore {
    fn insert_set(&self, courses: Vec<Course>) -> Result<Vec<Course>, RepositoryError> {
        let mut guard = self.records.lock().expect("course store poisoned");
        let occupied = courses.iter().any(|course| {
            guard
                .values()
                .any(|existing| existing.enrollment_id == course.enrollment_id)
        });
        if occupied {
            return Err(RepositoryError::Conflict);
        }
        for course in &courses {
            guard.insert(course.id, course.clone());
        }
        Ok(courses)
    }

    fn fetch(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        let guard = self.records.lock().expect("course store poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn for_enrollment(&self, enrollment_id: EnrollmentId) -> Result<Vec<Course>, RepositoryError> {
        let guard = self.records.lock().expect("course store poisoned");
        let mut courses: Vec<Course> = guard
            .values()
            .filter(|course| course.enrollment_id == enrollment_id)
            .cloned()
            .collect();
        courses.sort_by_key(|course| course.course_type);
        Ok(courses)
    }

    fn record_session(&self, id: CourseId) -> Result<Course, RepositoryError> {
        let mut guard = self.records.lock().expect("course store poisoned");
        let record = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.completed_sessions >= record.total_sessions {
            return Err(RepositoryError::Conflict);
        }
        record.completed_sessions += 1;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn update(&self, course: Course) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("course store poisoned");
        if !guard.contains_key(&course.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(course.id, course);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    records: Arc<Mutex<HashMap<SessionId, PracticeSession>>>,
}

impl SessionRepository for InMemorySessionStore {
    fn insert(&self, session: PracticeSession) -> Result<PracticeSession, RepositoryError> {
        let mut guard = self.records.lock().expect("session store poisoned");
        guard.insert(session.id, session.clone());
        Ok(session)
    }

    fn fetch(&self, id: SessionId) -> Result<Option<PracticeSession>, RepositoryError> {
        let guard = self.records.lock().expect("session store poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn transition(
        &self,
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        notes: Option<String>,
    ) -> Result<PracticeSession, RepositoryError> {
        let mut guard = self.records.lock().expect("session store poisoned");
        let record = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.status != from {
            return Err(RepositoryError::Conflict);
        }
        record.status = to;
        if notes.is_some() {
            record.notes = notes;
        }
        Ok(record.clone())
    }

    fn stale_scheduled(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PracticeSession>, RepositoryError> {
        let guard = self.records.lock().expect("session store poisoned");
        Ok(guard
            .values()
            .filter(|session| {
                session.status == SessionStatus::Scheduled && session.ends_at() <= cutoff
            })
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryExamStore {
    records: Arc<Mutex<HashMap<ExamId, Exam>>>,
}

impl ExamRepository for InMemoryExamStore {
    fn insert(&self, exam: Exam) -> Result<Exam, RepositoryError> {
        let mut guard = self.records.lock().expect("exam store poisoned");
        guard.insert(exam.id, exam.clone());
        Ok(exam)
    }

    fn fetch(&self, id: ExamId) -> Result<Option<Exam>, RepositoryError> {
        let guard = self.records.lock().expect("exam store poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn grade(
        &self,
        id: ExamId,
        outcome: ExamStatus,
        score: f64,
        notes: Option<String>,
    ) -> Result<Exam, RepositoryError> {
        let mut guard = self.records.lock().expect("exam store poisoned");
        let record = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.status != ExamStatus::Available {
            return Err(RepositoryError::Conflict);
        }
        record.status = outcome;
        record.score = Some(score);
        record.notes = notes;
        Ok(record.clone())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCertificateStore {
    records: Arc<Mutex<HashMap<CertificateId, Certificate>>>,
}

impl CertificateRepository for InMemoryCertificateStore {
    fn insert(&self, certificate: Certificate) -> Result<Certificate, RepositoryError> {
        let mut guard = self.records.lock().expect("certificate store poisoned");
        let duplicate = guard
            .values()
            .any(|existing| existing.enrollment_id == certificate.enrollment_id);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(certificate.id, certificate.clone());
        Ok(certificate)
    }

    fn fetch(&self, id: CertificateId) -> Result<Option<Certificate>, RepositoryError> {
        let guard = self.records.lock().expect("certificate store poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, RepositoryError> {
        let guard = self.records.lock().expect("certificate store poisoned");
        Ok(guard
            .values()
            .find(|certificate| certificate.enrollment_id == enrollment_id)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDocumentStore {
    records: Arc<Mutex<Vec<VerifiedDocument>>>,
}

impl InMemoryDocumentStore {
    /// Seed a verified document for a user.
    pub fn add_verified(&self, user_id: StudentId, document_type: DocumentType) {
        let mut guard = self.records.lock().expect("document store poisoned");
        guard.push(VerifiedDocument {
            user_id,
            document_type,
            is_verified: true,
            uploaded_at: Utc::now(),
        });
    }

    /// Seed an uploaded but unverified document.
    pub fn add_unverified(&self, user_id: StudentId, document_type: DocumentType) {
        let mut guard = self.records.lock().expect("document store poisoned");
        guard.push(VerifiedDocument {
            user_id,
            document_type,
            is_verified: false,
            uploaded_at: Utc::now(),
        });
    }
}

impl DocumentRepository for InMemoryDocumentStore {
    fn verified_types(
        &self,
        user_id: StudentId,
    ) -> Result<BTreeSet<DocumentType>, RepositoryError> {
        let guard = self.records.lock().expect("document store poisoned");
        Ok(guard
            .iter()
            .filter(|doc| doc.user_id == user_id && doc.is_verified)
            .map(|doc| doc.document_type)
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryExaminerRoster {
    records: Arc<Mutex<Vec<Examiner>>>,
}

impl InMemoryExaminerRoster {
    pub fn add(&self, examiner: Examiner) {
        let mut guard = self.records.lock().expect("examiner roster poisoned");
        guard.push(examiner);
    }
}

impl ExaminerRepository for InMemoryExaminerRoster {
    fn find_available(
        &self,
        exam_type: CourseType,
        state: &str,
    ) -> Result<Vec<Examiner>, RepositoryError> {
        let guard = self.records.lock().expect("examiner roster poisoned");
        Ok(guard
            .iter()
            .filter(|examiner| {
                examiner.is_available
                    && examiner.specializations.contains(&exam_type)
                    && examiner
                        .available_states
                        .iter()
                        .any(|covered| covered.eq_ignore_ascii_case(state))
            })
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryStudentDirectory {
    records: Arc<Mutex<HashMap<StudentId, StudentProfile>>>,
}

impl InMemoryStudentDirectory {
    pub fn add(&self, profile: StudentProfile) {
        let mut guard = self.records.lock().expect("student directory poisoned");
        guard.insert(profile.id, profile);
    }
}

impl StudentDirectory for InMemoryStudentDirectory {
    fn fetch(&self, id: StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        let guard = self.records.lock().expect("student directory poisoned");
        Ok(guard.get(&id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySchoolDirectory {
    records: Arc<Mutex<HashMap<SchoolId, School>>>,
}

impl InMemorySchoolDirectory {
    pub fn add(&self, school: School) {
        let mut guard = self.records.lock().expect("school directory poisoned");
        guard.insert(school.id, school);
    }
}

impl SchoolDirectory for InMemorySchoolDirectory {
    fn fetch(&self, id: SchoolId) -> Result<Option<School>, RepositoryError> {
        let guard = self.records.lock().expect("school directory poisoned");
        Ok(guard.get(&id).cloned())
    }
}

/// Captures published notifications so tests and the demo can assert on
/// exactly what the workflow emitted.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier poisoned").clone()
    }
}

impl NotificationPublisher for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut guard = self.events.lock().expect("notifier poisoned");
        guard.push(notification);
        Ok(())
    }
}
