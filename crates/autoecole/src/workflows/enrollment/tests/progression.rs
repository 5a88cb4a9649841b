use super::common::*;
use crate::workflows::enrollment::{
    CourseStatus, CourseType, ExamStatus, NotificationKind, WorkflowError,
};

#[test]
fn approval_creates_three_courses_with_only_theory_available() {
    let context = build_context();
    let enrollment = approved_enrollment(&context);

    let progress = context
        .platform
        .enrollment
        .progress(enrollment.id)
        .expect("progress loads");

    let types: Vec<CourseType> = progress
        .courses
        .iter()
        .map(|course| course.course_type)
        .collect();
    assert_eq!(
        types,
        vec![CourseType::Theory, CourseType::Park, CourseType::Road]
    );

    let statuses: Vec<CourseStatus> = progress
        .courses
        .iter()
        .map(|course| course.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            CourseStatus::Available,
            CourseStatus::Locked,
            CourseStatus::Locked
        ]
    );

    let totals: Vec<u32> = progress
        .courses
        .iter()
        .map(|course| course.total_sessions)
        .collect();
    assert_eq!(totals, vec![10, 5, 15]);

    assert!(progress
        .courses
        .iter()
        .all(|course| course.exam_status == ExamStatus::NotAvailable));
    assert!(progress.certificate.is_none());
}

#[test]
fn initializing_courses_twice_is_rejected() {
    let context = build_context();
    let enrollment = approved_enrollment(&context);

    let result = context.platform.engine.initialize_courses(enrollment.id);
    assert!(matches!(result, Err(WorkflowError::AlreadyInitialized)));

    let progress = context
        .platform
        .enrollment
        .progress(enrollment.id)
        .expect("progress loads");
    assert_eq!(progress.courses.len(), 3);
}

#[test]
fn finishing_all_sessions_completes_course_and_unlocks_exam_only() {
    let context = build_context();
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    complete_all_sessions(&context, theory.id, theory.total_sessions).expect("sessions complete");

    let theory = course_of(&context, &enrollment, CourseType::Theory);
    assert_eq!(theory.status, CourseStatus::Completed);
    assert_eq!(theory.completed_sessions, theory.total_sessions);
    assert_eq!(theory.exam_status, ExamStatus::Available);

    // Passing the exam, not finishing sessions, unlocks the next stage.
    let park = course_of(&context, &enrollment, CourseType::Park);
    assert_eq!(park.status, CourseStatus::Locked);

    let completed: Vec<_> = context
        .notifier
        .events()
        .into_iter()
        .filter(|event| event.kind == NotificationKind::CourseCompleted)
        .collect();
    assert_eq!(completed.len(), 1);
}

#[test]
fn session_counter_never_exceeds_the_required_total() {
    let context = build_context();
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    for _ in 0..theory.total_sessions {
        context
            .platform
            .engine
            .record_session_completion(theory.id)
            .expect("counter advances");
    }

    let result = context.platform.engine.record_session_completion(theory.id);
    assert!(matches!(result, Err(WorkflowError::SessionOverflow)));

    let theory = course_of(&context, &enrollment, CourseType::Theory);
    assert_eq!(theory.completed_sessions, theory.total_sessions);
}

#[test]
fn passing_the_theory_exam_unlocks_park() {
    let context = build_context();
    let examiner = seed_examiner(&context);
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    complete_all_sessions(&context, theory.id, theory.total_sessions).expect("sessions complete");
    let outcome = sit_exam(&context, theory.id, examiner, 75.0).expect("exam graded");
    assert!(outcome.passed);
    assert_eq!(outcome.score, 75.0);
    assert!(outcome.certificate.is_none());

    let theory = course_of(&context, &enrollment, CourseType::Theory);
    assert_eq!(theory.exam_status, ExamStatus::Passed);
    assert_eq!(theory.exam_score, Some(75.0));

    let park = course_of(&context, &enrollment, CourseType::Park);
    assert_eq!(park.status, CourseStatus::Available);
    let road = course_of(&context, &enrollment, CourseType::Road);
    assert_eq!(road.status, CourseStatus::Locked);
}

#[test]
fn failing_score_keeps_the_next_course_locked() {
    let context = build_context();
    let examiner = seed_examiner(&context);
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    complete_all_sessions(&context, theory.id, theory.total_sessions).expect("sessions complete");
    let outcome = sit_exam(&context, theory.id, examiner, 65.0).expect("exam graded");
    assert!(!outcome.passed);

    let theory = course_of(&context, &enrollment, CourseType::Theory);
    assert_eq!(theory.exam_status, ExamStatus::Failed);
    let park = course_of(&context, &enrollment, CourseType::Park);
    assert_eq!(park.status, CourseStatus::Locked);

    let progress = context
        .platform
        .enrollment
        .progress(enrollment.id)
        .expect("progress loads");
    assert!(progress.certificate.is_none());
}

#[test]
fn boundary_score_exactly_at_threshold_passes() {
    let context = build_context();
    let examiner = seed_examiner(&context);
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    complete_all_sessions(&context, theory.id, theory.total_sessions).expect("sessions complete");
    let outcome = sit_exam(&context, theory.id, examiner, 70.0).expect("exam graded");
    assert!(outcome.passed);
}

#[test]
fn grading_is_one_shot() {
    let context = build_context();
    let examiner = seed_examiner(&context);
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    complete_all_sessions(&context, theory.id, theory.total_sessions).expect("sessions complete");
    sit_exam(&context, theory.id, examiner, 75.0).expect("first grading lands");

    // A second exam cannot even be booked once the course exam is graded.
    let result = sit_exam(&context, theory.id, examiner, 90.0);
    assert!(matches!(
        result,
        Err(WorkflowError::ExamNotSchedulable { .. }) | Err(WorkflowError::AlreadyGraded)
    ));

    let theory = course_of(&context, &enrollment, CourseType::Theory);
    assert_eq!(theory.exam_score, Some(75.0));
}

#[test]
fn negative_and_non_finite_scores_are_rejected() {
    let context = build_context();
    let examiner = seed_examiner(&context);
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    complete_all_sessions(&context, theory.id, theory.total_sessions).expect("sessions complete");

    for score in [-1.0, f64::NAN, f64::INFINITY] {
        let result = sit_exam(&context, theory.id, examiner, score);
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }

    // The rejected attempts booked exams but never graded the course.
    let theory = course_of(&context, &enrollment, CourseType::Theory);
    assert_eq!(theory.exam_status, ExamStatus::Available);
}

#[test]
fn recompute_availability_is_idempotent() {
    let context = build_context();
    let examiner = seed_examiner(&context);
    let enrollment = approved_enrollment(&context);
    let theory = course_of(&context, &enrollment, CourseType::Theory);

    complete_all_sessions(&context, theory.id, theory.total_sessions).expect("sessions complete");
    sit_exam(&context, theory.id, examiner, 80.0).expect("exam graded");

    let before = context
        .platform
        .enrollment
        .progress(enrollment.id)
        .expect("progress loads");
    let events_before = context.notifier.events().len();

    context
        .platform
        .engine
        .recompute_availability(enrollment.id)
        .expect("recompute runs");
    context
        .platform
        .engine
        .recompute_availability(enrollment.id)
        .expect("recompute runs again");

    let after = context
        .platform
        .enrollment
        .progress(enrollment.id)
        .expect("progress loads");
    let statuses = |courses: &[crate::workflows::enrollment::Course]| {
        courses
            .iter()
            .map(|course| (course.course_type, course.status))
            .collect::<Vec<_>>()
    };
    assert_eq!(statuses(&before.courses), statuses(&after.courses));
    assert_eq!(context.notifier.events().len(), events_before);
}

#[test]
fn recompute_relocks_a_course_unlocked_out_of_order() {
    let context = build_context();
    let enrollment = approved_enrollment(&context);

    // Simulate a bad write: park open while theory's exam is not passed.
    let mut park = course_of(&context, &enrollment, CourseType::Park);
    park.status = CourseStatus::Available;
    crate::workflows::enrollment::CourseRepository::update(&context.courses, park)
        .expect("direct update");

    context
        .platform
        .engine
        .recompute_availability(enrollment.id)
        .expect("recompute runs");

    let park = course_of(&context, &enrollment, CourseType::Park);
    assert_eq!(park.status, CourseStatus::Locked);
}
