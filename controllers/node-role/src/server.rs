//! Metrics and probe HTTP server.
//!
//! Serves `/healthz`, `/readyz` and every unmatched path as plain 200
//! responses and exposes the prometheus registry on `/metrics`.

use crate::error::ControllerError;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Registry, TextEncoder};
use std::future::{Future, pending};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Upper bound for handling a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How long open connections may drain after shutdown is requested
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Shared state for the metrics endpoint
#[derive(Clone, Debug)]
struct MetricsState {
    registry: Arc<Registry>,
}

/// Builds the router for metrics and probes.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/healthz", get(ok))
        .route("/readyz", get(ok))
        .route("/", get(ok))
        .route("/metrics", get(metrics))
        .fallback(ok)
        .with_state(MetricsState { registry })
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

/// Serves the router on `0.0.0.0:port` until `shutdown` resolves.
///
/// Connections still open [`SHUTDOWN_GRACE`] after shutdown are abandoned.
pub async fn serve<F>(
    port: u16,
    registry: Arc<Registry>,
    shutdown: F,
) -> Result<(), ControllerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        ControllerError::Server(format!("failed to bind metrics server on {addr}: {e}"))
    })?;

    info!(%addr, "Starting metrics server");
    serve_listener(listener, registry, shutdown, SHUTDOWN_GRACE).await
}

async fn serve_listener<F>(
    listener: TcpListener,
    registry: Arc<Registry>,
    shutdown: F,
    grace: Duration,
) -> Result<(), ControllerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (draining_tx, draining_rx) = oneshot::channel::<()>();
    let signal = async move {
        shutdown.await;
        let _ = draining_tx.send(());
    };
    let drain_deadline = async move {
        if draining_rx.await.is_ok() {
            sleep(grace).await;
        } else {
            pending::<()>().await;
        }
    };

    let server = axum::serve(listener, router(registry))
        .with_graceful_shutdown(signal)
        .into_future();

    tokio::select! {
        result = server => result?,
        () = drain_deadline => {
            warn!(?grace, "Metrics server connections did not drain in time, closing");
        }
    }

    info!("Metrics server stopped");
    Ok(())
}

async fn ok() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<MetricsState>) -> Response {
    match TextEncoder::new().encode_to_string(&state.registry.gather()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use node_role_core::{PatchMetrics, PatchRecorder};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_and_ready_endpoints() {
        let app = router(Arc::new(Registry::new()));

        for path in ["/healthz", "/readyz", "/"] {
            let (status, _) = get_path(app.clone(), path).await;
            assert_eq!(status, StatusCode::OK, "unexpected status for {path}");
        }
    }

    #[tokio::test]
    async fn test_metrics_endpoint_exposes_patch_counters() {
        let metrics = PatchMetrics::new().unwrap();
        metrics.record_success();
        metrics.record_success();
        metrics.record_failure();

        let app = router(Arc::clone(metrics.registry()));
        let (status, body) = get_path(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("node_role_patch_success_total 2"), "{body}");
        assert!(body.contains("node_role_patch_failure_total 1"), "{body}");
    }

    #[tokio::test]
    async fn test_unmatched_path_is_ok() {
        let app = router(Arc::new(Registry::new()));
        let (status, _) = get_path(app, "/anything/else").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_shutdown_does_not_wait_for_stalled_client() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(serve_listener(
            listener,
            Arc::new(Registry::new()),
            async move {
                let _ = shutdown_rx.await;
            },
            Duration::from_millis(200),
        ));

        // Headers are never terminated, so the connection can't finish.
        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: x\r\n")
            .await
            .unwrap();
        sleep(Duration::from_millis(100)).await;

        shutdown_tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server).await;

        assert!(
            matches!(result, Ok(Ok(Ok(())))),
            "server did not stop after the drain grace period"
        );
        drop(client);
    }
}
