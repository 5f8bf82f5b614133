use creditpath::config::ScoringConfig;
use creditpath::error::AppError;
use creditpath::scoring::{ArtifactStore, CreditScorer};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Load the artifact bundle once and wrap it in a scorer. Any artifact problem is fatal.
pub(crate) fn build_scorer(
    config: &ScoringConfig,
    artifact_override: Option<PathBuf>,
) -> Result<CreditScorer, AppError> {
    let dir = artifact_override.unwrap_or_else(|| config.artifact_dir.clone());
    let bundle = ArtifactStore::new(dir).load()?;
    Ok(CreditScorer::from_bundle(
        Arc::new(bundle),
        config.tier_thresholds,
    ))
}
