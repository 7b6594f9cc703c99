//! HTTP exposition server for wes-exporter.
//!
//! Serves the metric registry in the OpenMetrics text format on `/metrics`,
//! together with poll health on `/health` and an endpoint index on `/`.

pub mod exposition;

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;

use wes_exporter_core::{PollStats, Registry};

use crate::exposition::Exposition;

/// Shared server state.
struct AppState {
    registry: Arc<Registry>,
    exposition: Exposition,
    stats: Arc<PollStats>,
    device_url: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    device: String,
    cycles: u64,
    failures: u64,
    consecutive_failures: u64,
    /// Unix milliseconds of the last successful cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    last_success_unix_ms: Option<u64>,
    last_duration_ms: u64,
    series: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<ErrorEntry>,
}

#[derive(Serialize)]
struct ErrorEntry {
    kind: String,
    message: String,
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.exposition.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            log::error!("metrics encoding failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.stats.snapshot();
    let status = if stats.cycles == 0 {
        "starting"
    } else if stats.consecutive_failures == 0 {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        device: state.device_url.clone(),
        cycles: stats.cycles,
        failures: stats.failures,
        consecutive_failures: stats.consecutive_failures,
        last_success_unix_ms: stats.last_success_unix_ms,
        last_duration_ms: stats.last_duration_ms,
        series: state.registry.series_count(),
        last_error: stats
            .last_error
            .map(|(kind, message)| ErrorEntry { kind, message }),
    })
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "WES Exporter",
        "version": wes_exporter_core::VERSION,
        "device": state.device_url,
        "metrics": state.registry.metric_count(),
        "endpoints": {
            "/": "This API index",
            "/metrics": "OpenMetrics text exposition of the latest device readings",
            "/health": "Poll loop health (cycles, failures, last error)",
        },
    }))
}

/// Build the axum router.
pub fn build_router(registry: Arc<Registry>, stats: Arc<PollStats>, device_url: &str) -> Router {
    let state = Arc::new(AppState {
        exposition: Exposition::new(Arc::clone(&registry)),
        registry,
        stats,
        device_url: device_url.to_string(),
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/metrics", get(handle_metrics))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Run the exposition server until `shutdown` completes.
pub async fn run_server(
    router: Router,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("serving metrics on http://{}/metrics", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;
    use wes_exporter_core::schema;

    fn router() -> (Router, Arc<Registry>) {
        let registry = Arc::new(schema::registry().unwrap());
        let router = build_router(
            Arc::clone(&registry),
            Arc::new(PollStats::default()),
            "http://192.168.0.200",
        );
        (router, registry)
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_registry() {
        let (router, registry) = router();
        registry.set_gauge(schema::PINCE_AMPS, &["3"], 11.2).unwrap();
        registry
            .set_counter(schema::TIC_INDEX, &["1", "tempo", "blue", "hc"], 4567321.5)
            .unwrap();
        registry.set_state(schema::TIC_PTEC, &[], "Inconnu").unwrap();

        let (status, content_type, body) = get_body(router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(exposition::CONTENT_TYPE));
        assert!(body.contains("wes_pince_amps{id=\"3\"} 11.2\n"));
        assert!(body.contains(
            "wes_tic_index_total{id=\"1\",option=\"tempo\",color=\"blue\",phase=\"hc\"} 4567321.5\n"
        ));
        assert!(body.contains("wes_tic_ptec{wes_tic_ptec=\"Inconnu\"} 1\n"));
        assert!(body.contains("wes_tic_ptec{wes_tic_ptec=\"H. Creuse BLEU\"} 0\n"));
    }

    #[tokio::test]
    async fn metrics_before_first_cycle_show_seeded_defaults() {
        let (router, _) = router();
        let (_, _, body) = get_body(router, "/metrics").await;
        assert!(body.contains("\nwes_v 0.0\n"));
        assert!(body.contains("wes_tic_ptec{wes_tic_ptec=\"H. Creuse BLEU\"} 1\n"));
        assert!(!body.contains("wes_pince_amps{"));
    }

    #[tokio::test]
    async fn health_reports_starting_before_first_cycle() {
        let (router, _) = router();
        let (status, _, body) = get_body(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "starting");
        assert_eq!(json["cycles"], 0);
        assert!(json.get("last_error").is_none());
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let (router, _) = router();
        let (_, _, body) = get_body(router, "/").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["device"], "http://192.168.0.200");
        assert!(json["endpoints"]["/metrics"].is_string());
        assert_eq!(json["metrics"], schema::METRICS.len());
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (router, _) = router();
        let (status, _, _) = get_body(router, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
