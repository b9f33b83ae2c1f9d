use crate::cli::ServeArgs;
use crate::infra::{local_storage, AppState, InMemoryUploadService, InMemoryVerificationService};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use instructor_intake::config::AppConfig;
use instructor_intake::error::AppError;
use instructor_intake::telemetry;
use instructor_intake::workflows::verification::{
    AutoSaver, Collaborators, TracingNotifier, VerificationStore,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(dir) = args.storage_dir.take() {
        config.engine.storage_dir = Some(dir);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = VerificationStore::new(
        Collaborators {
            remote: Arc::new(InMemoryVerificationService::default()),
            uploads: Arc::new(InMemoryUploadService::default()),
            notifier: Arc::new(TracingNotifier),
            storage: local_storage(&config.engine),
        },
        config.engine.clone(),
    );

    let _auto_saver = if args.no_auto_save {
        None
    } else {
        Some(AutoSaver::spawn(
            store.clone(),
            config.engine.auto_save_interval,
        ))
    };

    let app = with_service_routes(store)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        storage_dir = ?config.engine.storage_dir,
        gate = ?config.engine.step_gate,
        "instructor intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
