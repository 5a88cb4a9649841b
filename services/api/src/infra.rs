use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use autoecole::config::AppConfig;
use autoecole::workflows::enrollment::memory::{
    InMemoryCertificateStore, InMemoryCourseStore, InMemoryDocumentStore, InMemoryEnrollmentStore,
    InMemoryExamStore, InMemoryExaminerRoster, InMemorySchoolDirectory, InMemorySessionStore,
    InMemoryStudentDirectory,
};
use autoecole::workflows::enrollment::{
    CourseType, DocumentType, Examiner, ExaminerId, Notification, NotificationPublisher,
    NotifyError, PlatformStores, ProgressionConfig, School, SchoolId, StudentId, StudentProfile,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notification adapter for the service: deliveries land in the structured
/// log until a real e-mail/SMS channel is plugged in.
pub(crate) struct LoggingNotifier;

impl NotificationPublisher for LoggingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            title = %notification.title,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Progression defaults, with the exam passing threshold taken from the
/// environment when set.
pub(crate) fn progression_config(config: &AppConfig) -> ProgressionConfig {
    let mut progression = ProgressionConfig::default();
    if let Some(passing_score) = config.passing_score {
        progression.passing_score = passing_score;
    }
    progression
}

/// Handles to the seeded directory records, for logging and the demo.
pub(crate) struct SeedHandles {
    pub(crate) student_id: StudentId,
    pub(crate) school_id: SchoolId,
    pub(crate) examiner_id: ExaminerId,
}

/// Build the in-memory stores and seed the directories the workflow reads
/// from: student profiles, schools, and the examiner roster. Workflow stores
/// (enrollments, courses, sessions, exams, certificates) start empty.
pub(crate) fn bootstrap_stores() -> (PlatformStores, SeedHandles) {
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
    for document_type in [
        DocumentType::ProfilePhoto,
        DocumentType::IdCard,
        DocumentType::MedicalCertificate,
    ] {
        documents.add_verified(student_id, document_type);
    }

    let second_student = StudentId::generate();
    students.add(StudentProfile {
        id: second_student,
        full_name: "Yacine Merbah".to_string(),
        state: "Oran".to_string(),
    });

    let school_id = SchoolId::generate();
    schools.add(School {
        id: school_id,
        name: "Auto-Ecole El Amane".to_string(),
        state: "Alger".to_string(),
    });
    schools.add(School {
        id: SchoolId::generate(),
        name: "Auto-Ecole Essalem".to_string(),
        state: "Oran".to_string(),
    });

    let examiner_id = ExaminerId::generate();
    examiners.add(Examiner {
        id: examiner_id,
        full_name: "Rachid Benaissa".to_string(),
        specializations: vec![CourseType::Theory, CourseType::Park, CourseType::Road],
        available_states: vec!["Alger".to_string(), "Oran".to_string()],
        is_available: true,
    });

    let stores = PlatformStores {
        enrollments: Arc::new(InMemoryEnrollmentStore::default()),
        courses: Arc::new(InMemoryCourseStore::default()),
        sessions: Arc::new(InMemorySessionStore::default()),
        exams: Arc::new(InMemoryExamStore::default()),
        certificates: Arc::new(InMemoryCertificateStore::default()),
        documents: Arc::new(documents),
        examiners: Arc::new(examiners),
        students: Arc::new(students),
        schools: Arc::new(schools),
    };

    let handles = SeedHandles {
        student_id,
        school_id,
        examiner_id,
    };

    (stores, handles)
}
