use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Args;

use autoecole::error::AppError;
use autoecole::workflows::enrollment::memory::RecordingNotifier;
use autoecole::workflows::enrollment::{
    EnrollmentPlatform, ExamRequest, ProgressionConfig, SessionRequest, TeacherId,
};

use crate::infra::bootstrap_stores;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Score awarded on every exam (defaults to 85)
    #[arg(long)]
    pub(crate) score: Option<f64>,
    /// Override the passing threshold (defaults to 70)
    #[arg(long)]
    pub(crate) passing_score: Option<f64>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let score = args.score.unwrap_or(85.0);
    let mut config = ProgressionConfig::default();
    if let Some(passing_score) = args.passing_score {
        config.passing_score = passing_score;
    }

    let (stores, seeds) = bootstrap_stores();
    let notifier = RecordingNotifier::default();
    let platform = EnrollmentPlatform::new(stores, Arc::new(notifier.clone()), config);

    println!("Driving-school enrollment demo");
    println!("- student {} at school {}", seeds.student_id, seeds.school_id);

    let enrollment = platform
        .enrollment
        .enroll(seeds.student_id, seeds.school_id)?;
    println!(
        "- enrolled -> {} ({})",
        enrollment.id,
        enrollment.status.label()
    );

    let enrollment = platform.enrollment.refresh_document_status(enrollment.id)?;
    println!("- documents verified -> {}", enrollment.status.label());

    let enrollment = platform.enrollment.approve(enrollment.id)?;
    println!("- manager approval -> {}", enrollment.status.label());

    let progress = platform.enrollment.progress(enrollment.id)?;
    let mut certificate = None;
    for course in progress.courses {
        println!(
            "\n{} course: {} sessions required",
            course.course_type.label(),
            course.total_sessions
        );

        for _ in 0..course.total_sessions {
            let session = platform.scheduling.schedule_session(SessionRequest {
                course_id: course.id,
                teacher_id: TeacherId::generate(),
                scheduled_at: Utc::now() + Duration::days(1),
                duration_minutes: 60,
            })?;
            platform.scheduling.complete_session(session.id, None)?;
        }
        println!("  all sessions completed, exam unlocked");

        let exam = platform.scheduling.schedule_exam(ExamRequest {
            course_id: course.id,
            preferred_dates: vec![Utc::now() + Duration::days(3)],
            location: "Alger".to_string(),
        })?;
        let outcome = platform
            .scheduling
            .complete_exam(exam.id, seeds.examiner_id, score, None)?;
        println!(
            "  exam scored {:.1} -> {}",
            outcome.score,
            if outcome.passed { "passed" } else { "failed" }
        );

        if !outcome.passed {
            println!("\nNext course stays locked until this exam is passed.");
            break;
        }
        certificate = outcome.certificate;
    }

    match certificate {
        Some(certificate) => {
            println!("\nCertificate issued: {}", certificate.certificate_number);
            println!(
                "  valid {} to {}",
                certificate.issue_date.format("%Y-%m-%d"),
                certificate.expiry_date.format("%Y-%m-%d")
            );
        }
        None => println!("\nNo certificate issued."),
    }

    let progress = platform.enrollment.progress(enrollment.id)?;
    println!("Final enrollment status: {}", progress.enrollment.status.label());

    println!("\nNotifications emitted:");
    for event in notifier.events() {
        println!("  - {:?}: {}", event.kind, event.title);
    }

    Ok(())
}
