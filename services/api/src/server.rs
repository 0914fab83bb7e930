use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAuditLog, InMemoryBlobStore, LinkRenderer, LoggingNotifier,
    SeededDirectory, SignaturePhotoValidator,
};
use crate::routes::with_clearance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use clearance::config::AppConfig;
use clearance::error::AppError;
use clearance::telemetry;
use clearance::workflows::clearance::{
    ActiveOfficerSlot, ClearanceApi, ClearanceWorkflowService, IntakeLimits,
    MemorySubmissionStore, UploadIntake, WorkflowCollaborators,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let workflow = Arc::new(ClearanceWorkflowService::new(
        Arc::new(MemorySubmissionStore::new()),
        Arc::new(LoggingNotifier::default()),
        WorkflowCollaborators {
            renderer: Arc::new(LinkRenderer::default()),
            directory: Arc::new(SeededDirectory::campus()),
            officers: Arc::new(ActiveOfficerSlot::new()),
        },
        &config.workflow,
    ));
    let intake = Arc::new(UploadIntake::new(
        Arc::new(SignaturePhotoValidator),
        Arc::new(InMemoryBlobStore::default()),
        Arc::new(InMemoryAuditLog::default()),
        IntakeLimits::from(&config.workflow),
    ));

    let app = with_clearance_routes(ClearanceApi { workflow, intake })
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, prefix = %config.workflow.clearance_prefix, "clearance service ready");
    warn!("no active admissions officer yet; an administrator must POST /api/v1/clearance/officer");

    axum::serve(listener, app).await?;
    Ok(())
}
