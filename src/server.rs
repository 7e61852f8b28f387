use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers::status;
use crate::middleware::timing;
use crate::AppState;

/// Builds the status `Router`.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(status::health))
        .route("/version", get(status::version))
        .route("/api/status", get(status::get_status))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::metrics::{CycleSummary, StatusCollector};

    fn app() -> (Router, Arc<StatusCollector>) {
        let status = Arc::new(StatusCollector::new());
        let state = Arc::new(AppState {
            status: status.clone(),
        });
        (create_router(state), status)
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let resp = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_and_version() {
        let (router, _) = app();
        let (code, headers, body) = get_body(router.clone(), "/health").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, "ok");
        assert!(headers.contains_key("x-response-time-us"));

        let (_, _, body) = get_body(router, "/version").await;
        assert_eq!(body, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn status_reports_last_cycle() {
        let (router, status) = app();
        status.record_cycle(CycleSummary {
            timestamp: 1_700_000_000,
            hostname: "agent-01".into(),
            records: 13,
            failed_nodes: Vec::new(),
            transfer_ok: true,
        });

        let (code, _, body) = get_body(router, "/api/status").await;
        assert_eq!(code, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["cycles_total"], 1);
        assert_eq!(json["records_dispatched"], 13);
        assert_eq!(json["last_cycle"]["hostname"], "agent-01");
        assert_eq!(json["poll_latency_us"]["count"], 0);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (router, _) = app();
        let (code, _, _) = get_body(router, "/api/users/1").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }
}
