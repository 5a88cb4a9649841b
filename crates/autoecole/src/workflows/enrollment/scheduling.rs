use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::domain::{
    CourseId, CourseStatus, Exam, ExamId, ExamStatus, ExaminerId, PracticeSession, SessionId,
    SessionStatus, TeacherId,
};
use super::error::WorkflowError;
use super::progression::{ExamOutcome, ProgressionEngine};
use super::repository::{
    dispatch, CourseRepository, EnrollmentRepository, ExamRepository, ExaminerRepository,
    Notification, NotificationKind, NotificationPublisher, RepositoryError, SchoolDirectory,
    SessionRepository,
};

/// How long after a booked slot ends a still-`scheduled` session is swept to
/// `no_show`.
pub const SESSION_EXPIRY_GRACE_HOURS: i64 = 24;

/// Request payload for booking a practice session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub course_id: CourseId,
    pub teacher_id: TeacherId,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
}

/// Request payload for booking a proctored exam.
#[derive(Debug, Clone)]
pub struct ExamRequest {
    pub course_id: CourseId,
    pub preferred_dates: Vec<DateTime<Utc>>,
    /// Wilaya where the exam takes place; examiners are matched on it.
    pub location: String,
}

/// Books practice sessions and proctored exams, and feeds their completion
/// events into the progression engine.
pub struct SchedulingService {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseRepository>,
    sessions: Arc<dyn SessionRepository>,
    exams: Arc<dyn ExamRepository>,
    examiners: Arc<dyn ExaminerRepository>,
    schools: Arc<dyn SchoolDirectory>,
    notifier: Arc<dyn NotificationPublisher>,
    engine: Arc<ProgressionEngine>,
}

impl SchedulingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        courses: Arc<dyn CourseRepository>,
        sessions: Arc<dyn SessionRepository>,
        exams: Arc<dyn ExamRepository>,
        examiners: Arc<dyn ExaminerRepository>,
        schools: Arc<dyn SchoolDirectory>,
        notifier: Arc<dyn NotificationPublisher>,
        engine: Arc<ProgressionEngine>,
    ) -> Self {
        Self {
            enrollments,
            courses,
            sessions,
            exams,
            examiners,
            schools,
            notifier,
            engine,
        }
    }

    /// Book a practice session against an open course. Scheduling moves an
    /// `available` course to `in_progress`; actual progress only advances on
    /// completion events.
    pub fn schedule_session(
        &self,
        request: SessionRequest,
    ) -> Result<PracticeSession, WorkflowError> {
        if request.duration_minutes == 0 {
            return Err(WorkflowError::Validation(
                "session duration must be positive".to_string(),
            ));
        }

        let mut course = self
            .courses
            .fetch(request.course_id)?
            .ok_or(WorkflowError::NotFound("course"))?;
        if !course.status.is_open() {
            return Err(WorkflowError::CourseNotOpen {
                status: course.status,
            });
        }

        let enrollment = self
            .enrollments
            .fetch(course.enrollment_id)?
            .ok_or(WorkflowError::NotFound("enrollment"))?;

        let session = self.sessions.insert(PracticeSession {
            id: SessionId::generate(),
            course_id: course.id,
            teacher_id: request.teacher_id,
            student_id: enrollment.student_id,
            session_type: course.course_type,
            scheduled_at: request.scheduled_at,
            duration_minutes: request.duration_minutes,
            status: SessionStatus::Scheduled,
            notes: None,
        })?;

        if course.status == CourseStatus::Available {
            course.status = CourseStatus::InProgress;
            course.updated_at = Utc::now();
            self.courses.update(course)?;
        }

        Ok(session)
    }

    /// Mark a session completed and advance the owning course's counter.
    /// Completing a session is the only way the counter moves.
    pub fn complete_session(
        &self,
        session_id: SessionId,
        notes: Option<String>,
    ) -> Result<PracticeSession, WorkflowError> {
        let session = self
            .sessions
            .fetch(session_id)?
            .ok_or(WorkflowError::NotFound("session"))?;

        let completed = match self.sessions.transition(
            session_id,
            SessionStatus::Scheduled,
            SessionStatus::Completed,
            notes,
        ) {
            Ok(session) => session,
            Err(RepositoryError::Conflict) => {
                return Err(WorkflowError::SessionNotOpen {
                    status: session.status,
                })
            }
            Err(err) => return Err(err.into()),
        };

        self.engine.record_session_completion(completed.course_id)?;
        Ok(completed)
    }

    /// Book a proctored exam for a course whose sessions are all done.
    /// Examiner selection is first match on specialization and state; the
    /// first preferred date is booked as offered.
    pub fn schedule_exam(&self, request: ExamRequest) -> Result<Exam, WorkflowError> {
        let scheduled_at = *request.preferred_dates.first().ok_or_else(|| {
            WorkflowError::Validation("at least one preferred date is required".to_string())
        })?;

        let course = self
            .courses
            .fetch(request.course_id)?
            .ok_or(WorkflowError::NotFound("course"))?;
        if course.exam_status != ExamStatus::Available {
            return Err(WorkflowError::ExamNotSchedulable {
                status: course.exam_status,
            });
        }

        let enrollment = self
            .enrollments
            .fetch(course.enrollment_id)?
            .ok_or(WorkflowError::NotFound("enrollment"))?;

        let candidates = self
            .examiners
            .find_available(course.course_type, &request.location)?;
        let examiner = candidates.first().ok_or(WorkflowError::NoExaminerAvailable)?;

        let exam = self.exams.insert(Exam {
            id: ExamId::generate(),
            course_id: course.id,
            student_id: enrollment.student_id,
            examiner_id: examiner.id,
            exam_type: course.course_type,
            scheduled_at,
            status: ExamStatus::Available,
            score: None,
            notes: None,
        })?;

        let school_name = self
            .schools
            .fetch(enrollment.school_id)?
            .map(|school| school.name)
            .unwrap_or_default();
        let mut metadata = BTreeMap::new();
        metadata.insert("exam_id".to_string(), exam.id.to_string());
        metadata.insert(
            "exam_type".to_string(),
            exam.exam_type.label().to_string(),
        );
        dispatch(
            self.notifier.as_ref(),
            Notification {
                user_id: enrollment.student_id,
                kind: NotificationKind::ExamScheduled,
                title: "Exam Scheduled".to_string(),
                message: format!(
                    "Your {} exam with {} is booked for {}. School: {}.",
                    exam.exam_type.label(),
                    examiner.full_name,
                    exam.scheduled_at.format("%Y-%m-%d %H:%M"),
                    school_name
                ),
                metadata,
            },
        );

        Ok(exam)
    }

    /// Record an exam outcome on behalf of the assigned examiner, delegating
    /// the grading rules to the progression engine.
    pub fn complete_exam(
        &self,
        exam_id: ExamId,
        examiner_id: ExaminerId,
        score: f64,
        notes: Option<String>,
    ) -> Result<ExamOutcome, WorkflowError> {
        let exam = self
            .exams
            .fetch(exam_id)?
            .ok_or(WorkflowError::NotFound("exam"))?;
        if exam.examiner_id != examiner_id {
            return Err(WorkflowError::ExaminerMismatch);
        }

        self.engine.record_exam_result(exam_id, score, notes)
    }

    /// Periodic sweep: sessions still `scheduled` whose slot ended more than
    /// the grace period ago become `no_show`. Compare-and-swap transitions
    /// make concurrent sweeps move each record once; returns how many this
    /// invocation moved.
    pub fn expire_stale_sessions(&self, now: DateTime<Utc>) -> Result<usize, WorkflowError> {
        let cutoff = now - Duration::hours(SESSION_EXPIRY_GRACE_HOURS);
        let stale = self.sessions.stale_scheduled(cutoff)?;

        let mut expired = 0;
        for session in stale {
            match self.sessions.transition(
                session.id,
                SessionStatus::Scheduled,
                SessionStatus::NoShow,
                None,
            ) {
                Ok(_) => expired += 1,
                // Another sweep or a late completion got there first.
                Err(RepositoryError::Conflict) => {}
                Err(err) => return Err(err.into()),
            }
        }

        if expired > 0 {
            info!(expired, "stale practice sessions marked no_show");
        }
        Ok(expired)
    }
}
