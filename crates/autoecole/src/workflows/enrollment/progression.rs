use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use super::certificate::CertificateIssuer;
use super::domain::{
    Certificate, Course, CourseId, CourseStatus, CourseType, EnrollmentId, ExamId, ExamStatus,
};
use super::error::WorkflowError;
use super::repository::{
    dispatch, CourseRepository, EnrollmentRepository, ExamRepository, Notification,
    NotificationKind, NotificationPublisher, RepositoryError,
};

/// One stage of the course sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageConfig {
    pub course_type: CourseType,
    pub total_sessions: u32,
}

/// Configuration for the progression engine. The stage list is the single
/// source of truth for ordering, so extending the sequence is data, not code.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionConfig {
    pub stages: Vec<StageConfig>,
    pub passing_score: f64,
    pub certificate_validity_days: i64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            stages: vec![
                StageConfig {
                    course_type: CourseType::Theory,
                    total_sessions: 10,
                },
                StageConfig {
                    course_type: CourseType::Park,
                    total_sessions: 5,
                },
                StageConfig {
                    course_type: CourseType::Road,
                    total_sessions: 15,
                },
            ],
            passing_score: 70.0,
            certificate_validity_days: 5 * 365,
        }
    }
}

impl ProgressionConfig {
    /// Position of a course type within the configured sequence.
    pub fn position(&self, course_type: CourseType) -> Option<usize> {
        self.stages
            .iter()
            .position(|stage| stage.course_type == course_type)
    }
}

/// Result of grading an exam, including any certificate the pass unlocked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamOutcome {
    pub passed: bool,
    pub score: f64,
    pub certificate: Option<Certificate>,
}

/// Drives the sequential course state machine: course creation at approval,
/// availability derivation, session-counter advancement, and exam grading.
pub struct ProgressionEngine {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseRepository>,
    exams: Arc<dyn ExamRepository>,
    notifier: Arc<dyn NotificationPublisher>,
    issuer: Arc<CertificateIssuer>,
    config: ProgressionConfig,
}

impl ProgressionEngine {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        courses: Arc<dyn CourseRepository>,
        exams: Arc<dyn ExamRepository>,
        notifier: Arc<dyn NotificationPublisher>,
        issuer: Arc<CertificateIssuer>,
        config: ProgressionConfig,
    ) -> Self {
        Self {
            enrollments,
            courses,
            exams,
            notifier,
            issuer,
            config,
        }
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// Create one course per configured stage for a freshly approved
    /// enrollment. The first stage starts `available`, the rest `locked`.
    /// Fails with `AlreadyInitialized` when courses already exist.
    pub fn initialize_courses(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<Course>, WorkflowError> {
        let now = Utc::now();
        let courses: Vec<Course> = self
            .config
            .stages
            .iter()
            .enumerate()
            .map(|(position, stage)| Course {
                id: CourseId::generate(),
                enrollment_id,
                course_type: stage.course_type,
                status: if position == 0 {
                    CourseStatus::Available
                } else {
                    CourseStatus::Locked
                },
                completed_sessions: 0,
                total_sessions: stage.total_sessions,
                exam_status: ExamStatus::NotAvailable,
                exam_score: None,
                updated_at: now,
            })
            .collect();

        match self.courses.insert_set(courses) {
            Ok(courses) => Ok(courses),
            Err(RepositoryError::Conflict) => Err(WorkflowError::AlreadyInitialized),
            Err(err) => Err(err.into()),
        }
    }

    /// Re-derive every course's lock state from the stage sequence. The
    /// first course is never locked; each later course is available exactly
    /// while its predecessor's exam is passed. Idempotent and quiet: it
    /// emits no notifications, so it is safe after every exam event.
    pub fn recompute_availability(&self, enrollment_id: EnrollmentId) -> Result<(), WorkflowError> {
        let courses = self.ordered_courses(enrollment_id)?;

        let mut predecessor_passed = true;
        for (position, course) in courses.iter().enumerate() {
            let unlocked = position == 0 || predecessor_passed;
            if unlocked {
                if course.status == CourseStatus::Locked {
                    let mut updated = course.clone();
                    updated.status = CourseStatus::Available;
                    updated.updated_at = Utc::now();
                    self.courses.update(updated)?;
                    debug!(%enrollment_id, course = course.course_type.label(), "course unlocked");
                }
            } else if course.status != CourseStatus::Locked {
                let mut updated = course.clone();
                updated.status = CourseStatus::Locked;
                updated.updated_at = Utc::now();
                self.courses.update(updated)?;
                debug!(%enrollment_id, course = course.course_type.label(), "course re-locked");
            }

            predecessor_passed = course.exam_status == ExamStatus::Passed;
        }

        Ok(())
    }

    /// Advance a course's completed-session counter by one. Reaching the
    /// required total completes the course and unlocks its exam; it does not
    /// unlock the next course, which waits on the exam pass.
    pub fn record_session_completion(&self, course_id: CourseId) -> Result<Course, WorkflowError> {
        // Resolve first so a missing course is NotFound, not overflow.
        self.courses
            .fetch(course_id)?
            .ok_or(WorkflowError::NotFound("course"))?;

        let mut course = match self.courses.record_session(course_id) {
            Ok(course) => course,
            Err(RepositoryError::Conflict) => return Err(WorkflowError::SessionOverflow),
            Err(err) => return Err(err.into()),
        };

        if course.completed_sessions >= course.total_sessions
            && course.exam_status == ExamStatus::NotAvailable
        {
            course.status = CourseStatus::Completed;
            course.exam_status = ExamStatus::Available;
            course.updated_at = Utc::now();
            self.courses.update(course.clone())?;

            if let Some(enrollment) = self.enrollments.fetch(course.enrollment_id)? {
                let mut metadata = BTreeMap::new();
                metadata.insert("course_id".to_string(), course.id.to_string());
                metadata.insert(
                    "course_type".to_string(),
                    course.course_type.label().to_string(),
                );
                dispatch(
                    self.notifier.as_ref(),
                    Notification {
                        user_id: enrollment.student_id,
                        kind: NotificationKind::CourseCompleted,
                        title: "Course Completed!".to_string(),
                        message: format!(
                            "You finished all {} sessions of the {} course. Your exam is now available.",
                            course.total_sessions,
                            course.course_type.label()
                        ),
                        metadata,
                    },
                );
            }
        }

        Ok(course)
    }

    /// Grade an exam. Pass/fail is `score >= passing_score`; a pass
    /// recomputes availability and, when it was the last outstanding exam,
    /// triggers certificate issuance.
    pub fn record_exam_result(
        &self,
        exam_id: ExamId,
        score: f64,
        notes: Option<String>,
    ) -> Result<ExamOutcome, WorkflowError> {
        if !score.is_finite() || score < 0.0 {
            return Err(WorkflowError::Validation(
                "score must be a non-negative number".to_string(),
            ));
        }

        let exam = self
            .exams
            .fetch(exam_id)?
            .ok_or(WorkflowError::NotFound("exam"))?;
        let mut course = self
            .courses
            .fetch(exam.course_id)?
            .ok_or(WorkflowError::NotFound("course"))?;

        match course.exam_status {
            ExamStatus::Available => {}
            status if status.is_graded() => return Err(WorkflowError::AlreadyGraded),
            status => return Err(WorkflowError::ExamNotSchedulable { status }),
        }

        let passed = score >= self.config.passing_score;
        let outcome = if passed {
            ExamStatus::Passed
        } else {
            ExamStatus::Failed
        };

        // The store's compare-and-swap makes grading one-shot even when two
        // graders race past the checks above.
        match self.exams.grade(exam_id, outcome, score, notes) {
            Ok(_) => {}
            Err(RepositoryError::Conflict) => return Err(WorkflowError::AlreadyGraded),
            Err(err) => return Err(err.into()),
        }

        course.exam_status = outcome;
        course.exam_score = Some(score);
        course.updated_at = Utc::now();
        self.courses.update(course.clone())?;

        let mut certificate = None;
        if passed {
            self.recompute_availability(course.enrollment_id)?;
            if self.all_courses_passed(course.enrollment_id)? {
                certificate = self.issuer.issue_if_eligible(course.enrollment_id)?;
            }
        }

        Ok(ExamOutcome {
            passed,
            score,
            certificate,
        })
    }

    /// True when the enrollment has courses and every exam is passed.
    pub fn all_courses_passed(&self, enrollment_id: EnrollmentId) -> Result<bool, WorkflowError> {
        let courses = self.courses.for_enrollment(enrollment_id)?;
        Ok(!courses.is_empty()
            && courses
                .iter()
                .all(|course| course.exam_status == ExamStatus::Passed))
    }

    fn ordered_courses(&self, enrollment_id: EnrollmentId) -> Result<Vec<Course>, WorkflowError> {
        let mut courses = self.courses.for_enrollment(enrollment_id)?;
        courses.sort_by_key(|course| self.config.position(course.course_type));
        Ok(courses)
    }
}
