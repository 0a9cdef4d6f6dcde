use crate::cli::ServeArgs;
use crate::infra::{repository_from, AppState};
use crate::routes::with_ledger_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use offer_ledger::config::AppConfig;
use offer_ledger::error::AppError;
use offer_ledger::ledger::{LedgerService, SystemClock};
use offer_ledger::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(repository_from(args.snapshot.as_deref())?);
    let ledger_service = Arc::new(LedgerService::new(
        repository,
        Arc::new(SystemClock),
        config.ledger.scanner(),
    ));

    let app = with_ledger_routes(ledger_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        base_currency = %config.ledger.base_currency,
        compliance_window_days = config.ledger.compliance_window_days.get(),
        "offer ledger ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
