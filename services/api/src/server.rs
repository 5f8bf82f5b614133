use crate::cli::ServeArgs;
use crate::infra::{build_scorer, AppState};
use crate::routes::with_scoring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use creditpath::config::AppConfig;
use creditpath::error::AppError;
use creditpath::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    // No listener is bound until every artifact has loaded and cross-validated.
    let scorer = Arc::new(build_scorer(&config.scoring, args.artifacts.take())?);
    let thresholds = scorer.decision_config().tier_thresholds;

    let app = with_scoring_routes(scorer.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        model_version = %scorer.bundle().model_version(),
        very_low = thresholds.very_low(),
        low = thresholds.low(),
        moderate = thresholds.moderate(),
        high = thresholds.high(),
        "credit scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
