//! MLMart REST API
//!
//! Thin HTTP surface over [`mlmart_ledger::CommissionEngine`].
//!
//! # API Structure
//!
//! ```text
//! /api/v1/
//! ├── POST /users                                  - register a member
//! ├── POST /orders                                 - checkout
//! ├── POST /orders/:id/pay-shipping                - pending → confirmed
//! ├── POST /orders/:id/deliver                     - complete, distribute commissions
//! ├── POST /orders/:id/cancel                      - cancel
//! ├── POST /order-items/:id/check-in               - warehouse drop-off
//! ├── GET  /sellers/:id/pending-dropoffs           - seller drop-off queue
//! ├── GET  /wallets/:user_id                       - available / pending / bonus
//! ├── GET  /wallets/:user_id/transactions          - transaction log
//! ├── GET  /wallets/:user_id/reconciliation        - balance vs. log
//! └── POST /admin/settle                           - settlement sweep
//! ```

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::http::HeaderName;
use axum::Router;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use mlmart_db::LedgerStore;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Enable CORS for browser clients
    pub enable_cors: bool,
    /// Enable request tracing
    pub enable_tracing: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

/// Main API router with middleware
pub fn create_router<S: LedgerStore>(state: Arc<AppState<S>>, config: ApiConfig) -> Router {
    let mut router = Router::new()
        .nest("/api/v1", routes::api_v1_routes::<S>())
        .route("/health", axum::routing::get(handlers::health::health_check))
        .route("/ready", axum::routing::get(handlers::health::readiness_check::<S>))
        .with_state(state);

    if config.enable_tracing {
        router = router.layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");

                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ));
    }

    // Added after tracing so the id exists when the span is created
    let x_request_id = HeaderName::from_static("x-request-id");
    router = router
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    if config.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

/// Minimal router for tests
pub fn create_test_router<S: LedgerStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_v1_routes::<S>())
        .route("/health", axum::routing::get(handlers::health::health_check))
        .route("/ready", axum::routing::get(handlers::health::readiness_check::<S>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.enable_cors);
        assert!(config.enable_tracing);
    }
}
