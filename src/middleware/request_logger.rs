use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Logs every request with its status and latency.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let response = next.run(req).await;
    let status = response.status();
    let latency = start.elapsed();

    // Errors are logged louder than regular traffic
    if status.is_client_error() || status.is_server_error() {
        warn!(%method, %path, status = status.as_u16(), ?latency, "request failed");
    } else {
        info!(%method, %path, status = status.as_u16(), ?latency, "request served");
    }

    response
}
