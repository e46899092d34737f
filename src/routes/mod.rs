// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Router assembly and middleware stack
// - submit.rs: POST /api/submit-form
// - clients.rs: GET /api/clients (admin listing)
// - health.rs: GET /healthz
// - extractors.rs: ClientIp, FormJson
// - middleware.rs: Request logging, per-IP rate limiting
//
// ============================================================================

mod clients;
mod extractors;
mod health;
mod middleware;
mod submit;

pub use clients::verify_admin_key;
pub use extractors::ClientIp;

use axum::{
    Router,
    routing::{get, post},
};
use intake_config::MAX_REQUEST_BODY_SIZE;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    // Only submissions are throttled
    let submit_routes = Router::new()
        .route("/api/submit-form", post(submit::submit_form))
        .route_layer(axum::middleware::from_fn_with_state(
            app_context.clone(),
            middleware::ip_rate_limiting,
        ));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/clients", get(clients::list_clients))
        .merge(submit_routes)
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                // Tracing layer (outermost - runs first)
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_SIZE))
                .into_inner(),
        )
        .with_state(app_context)
}
