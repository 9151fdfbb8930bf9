use crate::cli::ServeArgs;
use crate::infra::{load_seed, AppState, InMemoryDocumentStore, InMemoryRoleDirectory};
use crate::routes::with_document_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use repositorio::config::AppConfig;
use repositorio::documents::{DocumentService, RoleGrant, UserId};
use repositorio::error::AppError;
use repositorio::telemetry;
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
    if let Some(seed) = args.seed.take() {
        config.repository.seed_file = Some(seed);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let records = match &config.repository.seed_file {
        Some(path) => {
            let records = load_seed(path)?;
            info!(path = %path.display(), records = records.len(), "seed records loaded");
            records
        }
        None => Vec::new(),
    };
    let store = Arc::new(InMemoryDocumentStore::with_records(records));
    let roles = match &config.repository.bootstrap_admin {
        Some(user) => InMemoryRoleDirectory::with_grant(UserId(user.clone()), RoleGrant::Admin),
        None => {
            warn!("APP_ADMIN_USER not set; no caller can modify the repository");
            InMemoryRoleDirectory::default()
        }
    };
    let document_service = Arc::new(DocumentService::new(store, Arc::new(roles)));

    let app = with_document_routes(document_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "document repository ready");

    axum::serve(listener, app).await?;
    Ok(())
}
