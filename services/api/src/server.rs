use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use tracing::{info, warn};

use autoecole::config::AppConfig;
use autoecole::error::AppError;
use autoecole::telemetry;
use autoecole::workflows::enrollment::EnrollmentPlatform;

use crate::cli::ServeArgs;
use crate::infra::{bootstrap_stores, progression_config, AppState, LoggingNotifier};
use crate::routes::with_enrollment_routes;

const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (stores, seeds) = bootstrap_stores();
    let platform = EnrollmentPlatform::new(
        stores,
        Arc::new(LoggingNotifier),
        progression_config(&config),
    );

    info!(
        student_id = %seeds.student_id,
        school_id = %seeds.school_id,
        examiner_id = %seeds.examiner_id,
        "directory seeded with demo records"
    );

    // Hourly sweep turning abandoned scheduled sessions into no-shows.
    let sweeper = platform.scheduling.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match sweeper.expire_stale_sessions(Utc::now()) {
                Ok(0) => {}
                Ok(expired) => info!(expired, "session expiry sweep finished"),
                Err(err) => warn!(error = %err, "session expiry sweep failed"),
            }
        }
    });

    let app = with_enrollment_routes(platform)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "driving-school platform ready");

    axum::serve(listener, app).await?;
    Ok(())
}
