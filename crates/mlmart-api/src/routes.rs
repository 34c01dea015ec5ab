//! API Routes

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use mlmart_db::LedgerStore;

use crate::handlers;
use crate::state::AppState;

/// API v1 routes
pub fn api_v1_routes<S: LedgerStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Members
        .route("/users", post(handlers::member::register::<S>))
        // Orders
        .route("/orders", post(handlers::order::create_order::<S>))
        .route("/orders/:order_id/pay-shipping", post(handlers::order::pay_shipping::<S>))
        .route("/orders/:order_id/deliver", post(handlers::order::confirm_delivery::<S>))
        .route("/orders/:order_id/cancel", post(handlers::order::cancel_order::<S>))
        .route("/order-items/:item_id/check-in", post(handlers::order::check_in_item::<S>))
        .route(
            "/sellers/:seller_id/pending-dropoffs",
            get(handlers::order::pending_dropoffs::<S>),
        )
        // Wallets
        .route("/wallets/:user_id", get(handlers::wallet::get_summary::<S>))
        .route("/wallets/:user_id/transactions", get(handlers::wallet::get_history::<S>))
        .route("/wallets/:user_id/reconciliation", get(handlers::wallet::reconcile::<S>))
        // Administration
        .route("/admin/settle", post(handlers::admin::settle::<S>))
}
