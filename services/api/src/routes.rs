use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use chrono::Utc;
use creditpath::scoring::{scoring_router, CreditScorer};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_scoring_routes(scorer: Arc<CreditScorer>) -> axum::Router {
    scoring_router(scorer)
        .route("/health", get(healthcheck))
        .route("/api/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::build_scorer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use creditpath::config::ScoringConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn build_router(state: AppState) -> axum::Router {
        let config = ScoringConfig {
            artifact_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../models")),
            tier_thresholds: None,
        };
        let scorer = Arc::new(build_scorer(&config, None).expect("bundled models load"));
        with_scoring_routes(scorer).layer(Extension(state))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[tokio::test]
    async fn health_endpoints_report_ok_with_timestamp() {
        let router = build_router(app_state(true));

        for uri in ["/health", "/api/health"] {
            let response = router
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
                .await
                .expect("router dispatch");

            assert_eq!(response.status(), StatusCode::OK);
            let payload = json_body(response).await;
            assert_eq!(payload["status"], json!("ok"));
            assert!(payload["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let state = app_state(false);
        let flag = state.readiness.clone();
        let router = build_router(state);

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        flag.store(true, Ordering::Release);
        let response = router
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], json!("ready"));
    }

    #[tokio::test]
    async fn predict_is_served_alongside_operational_routes() {
        let router = build_router(app_state(true));
        let applicant = json!({
            "loan_amnt": 30000,
            "int_rate": 24.0,
            "installment": 1100,
            "sub_grade": "F5",
            "annual_inc": 35000,
            "dti": 45,
            "open_acc": 6,
            "revol_util": 85,
            "total_acc": 9,
            "mort_acc": 0,
            "pub_rec_bankruptcies": 2
        });

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&applicant).expect("serialize")))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["model_version"], json!("lending-club-logreg-2024.1"));
        assert_eq!(payload["recommendation"]["decision"], json!("DECLINE"));
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_prometheus_text() {
        let response = metrics_endpoint(Extension(app_state(true)))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
