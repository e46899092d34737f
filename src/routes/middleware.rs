// ============================================================================
// Axum Middleware
// ============================================================================
//
// - request_logging: method, path, status and duration of every request
// - ip_rate_limiting: per-IP throttle, applied as a route layer on submit
//
// ============================================================================

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use intake_error::AppError;
use std::sync::Arc;
use std::time::Instant;

use super::extractors::ClientIp;
use crate::context::AppContext;

/// Request logging middleware
pub async fn request_logging(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    tracing::debug!(
        method = %method,
        path = %path,
        "Incoming request"
    );

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

/// Per-IP rate limiting middleware.
///
/// Runs before the body is read, so throttled callers never reach
/// validation or storage. Pre-flight requests are not counted.
pub async fn ip_rate_limiting(
    State(ctx): State<Arc<AppContext>>,
    ClientIp(client_ip): ClientIp,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    ctx.rate_limiter.check(&client_ip).await?;

    Ok(next.run(req).await)
}
