use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use crate::workflows::enrollment::domain::{
    Course, CourseId, DocumentType, Enrollment, Examiner, ExaminerId, School, SchoolId, StudentId,
    StudentProfile, TeacherId,
};
use crate::workflows::enrollment::memory::{
    InMemoryCertificateStore, InMemoryCourseStore, InMemoryDocumentStore, InMemoryEnrollmentStore,
    InMemoryExamStore, InMemoryExaminerRoster, InMemorySchoolDirectory, InMemorySessionStore,
    InMemoryStudentDirectory, RecordingNotifier,
};
use crate::workflows::enrollment::platform::{EnrollmentPlatform, PlatformStores};
use crate::workflows::enrollment::progression::ProgressionConfig;
use crate::workflows::enrollment::repository::{Notification, NotificationPublisher, NotifyError};
use crate::workflows::enrollment::scheduling::{ExamRequest, SessionRequest};
use crate::workflows::enrollment::{CourseType, ExamOutcome, WorkflowError};

/// Notifier that always fails delivery, for asserting that state transitions
/// survive a broken transport.
#[derive(Default, Clone)]
pub(super) struct FailingNotifier {
    attempts: Arc<Mutex<usize>>,
}

impl FailingNotifier {
    pub(super) fn attempts(&self) -> usize {
        *self.attempts.lock().expect("notifier poisoned")
    }
}

impl NotificationPublisher for FailingNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
        *self.attempts.lock().expect("notifier poisoned") += 1;
        Err(NotifyError::Transport("smtp relay down".to_string()))
    }
}

pub(super) struct TestContext {
    pub platform: EnrollmentPlatform,
    pub courses: InMemoryCourseStore,
    pub sessions: InMemorySessionStore,
    pub documents: InMemoryDocumentStore,
    pub examiners: InMemoryExaminerRoster,
    pub notifier: RecordingNotifier,
    pub student_id: StudentId,
    pub school_id: SchoolId,
}

/// Platform over fresh in-memory stores, seeded with one student and one
/// school in Alger. Documents and examiners are seeded per test.
pub(super) fn build_context() -> TestContext {
    let recording = RecordingNotifier::default();
    build_with(Arc::new(recording.clone()), recording)
}

/// Same fixture wired to a notifier whose every delivery fails.
pub(super) fn failing_context() -> (TestContext, FailingNotifier) {
    let failing = FailingNotifier::default();
    let context = build_with(Arc::new(failing.clone()), RecordingNotifier::default());
    (context, failing)
}

fn build_with(notifier: Arc<dyn NotificationPublisher>, recording: RecordingNotifier) -> TestContext {
    let enrollments = InMemoryEnrollmentStore::default();
    let courses = InMemoryCourseStore::default();
    let sessions = InMemorySessionStore::default();
    let exams = InMemoryExamStore::default();
    let certificates = InMemoryCertificateStore::default();
    let documents = InMemoryDocumentStore::default();
    let examiners = InMemoryExaminerRoster::default();
    let students = InMemoryStudentDirectory::default();
    let schools = InMemorySchoolDirectory::default();

    let student_id = StudentId::generate();
    students.add(StudentProfile {
        id: student_id,
        full_name: "Amina Khaldi".to_string(),
        state: "Alger".to_string(),
    });

    let school_id = SchoolId::generate();
    schools.add(School {
        id: school_id,
        name: "Auto-Ecole El Amane".to_string(),
        state: "Alger".to_string(),
    });

    let stores = PlatformStores {
        enrollments: Arc::new(enrollments),
        courses: Arc::new(courses.clone()),
        sessions: Arc::new(sessions.clone()),
        exams: Arc::new(exams),
        certificates: Arc::new(certificates),
        documents: Arc::new(documents.clone()),
        examiners: Arc::new(examiners.clone()),
        students: Arc::new(students),
        schools: Arc::new(schools),
    };

    let platform = EnrollmentPlatform::new(stores, notifier, ProgressionConfig::default());

    TestContext {
        platform,
        courses,
        sessions,
        documents,
        examiners,
        notifier: recording,
        student_id,
        school_id,
    }
}

/// Seed every verified document a student needs to clear the gate.
pub(super) fn verify_student_documents(context: &TestContext) {
    for document_type in [
        DocumentType::ProfilePhoto,
        DocumentType::IdCard,
        DocumentType::MedicalCertificate,
    ] {
        context
            .documents
            .add_verified(context.student_id, document_type);
    }
}

/// Examiner covering every course type in Alger.
pub(super) fn seed_examiner(context: &TestContext) -> ExaminerId {
    let id = ExaminerId::generate();
    context.examiners.add(Examiner {
        id,
        full_name: "Rachid Benaissa".to_string(),
        specializations: vec![CourseType::Theory, CourseType::Park, CourseType::Road],
        available_states: vec!["Alger".to_string()],
        is_available: true,
    });
    id
}

/// Enroll, clear documents, and approve; returns the approved enrollment.
pub(super) fn approved_enrollment(context: &TestContext) -> Enrollment {
    let enrollment = context
        .platform
        .enrollment
        .enroll(context.student_id, context.school_id)
        .expect("enrollment succeeds");
    verify_student_documents(context);
    context
        .platform
        .enrollment
        .approve(enrollment.id)
        .expect("approval succeeds")
}

pub(super) fn course_of(context: &TestContext, enrollment: &Enrollment, ty: CourseType) -> Course {
    context
        .platform
        .enrollment
        .progress(enrollment.id)
        .expect("progress loads")
        .courses
        .into_iter()
        .find(|course| course.course_type == ty)
        .expect("course exists")
}

/// Book and complete enough sessions to finish the course.
pub(super) fn complete_all_sessions(
    context: &TestContext,
    course_id: CourseId,
    total: u32,
) -> Result<(), WorkflowError> {
    for _ in 0..total {
        let session = context
            .platform
            .scheduling
            .schedule_session(SessionRequest {
                course_id,
                teacher_id: TeacherId::generate(),
                scheduled_at: Utc::now() + Duration::days(1),
                duration_minutes: 60,
            })?;
        context
            .platform
            .scheduling
            .complete_session(session.id, None)?;
    }
    Ok(())
}

/// Schedule the course exam and grade it with the given score.
pub(super) fn sit_exam(
    context: &TestContext,
    course_id: CourseId,
    examiner_id: ExaminerId,
    score: f64,
) -> Result<ExamOutcome, WorkflowError> {
    let exam = context.platform.scheduling.schedule_exam(ExamRequest {
        course_id,
        preferred_dates: vec![Utc::now() + Duration::days(3)],
        location: "Alger".to_string(),
    })?;
    context
        .platform
        .scheduling
        .complete_exam(exam.id, examiner_id, score, None)
}
