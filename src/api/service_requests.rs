use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::service::*;

pub fn service_routes() -> Router<PgPool> {
    Router::new()
        .route("/cleaning-requests", post(create_cleaning_request))
        .route("/cleaning-requests/{id}/status", patch(update_cleaning_status))
        .route("/appliance-complaints", post(create_appliance_complaint))
        .route("/appliance-complaints/{id}/status", patch(update_appliance_status))
        .route("/store-orders", post(create_store_order))
        .route("/store-orders/{id}/status", patch(update_store_order_status))
}

/// Role-scoped read views.
pub fn dashboard_routes() -> Router<PgPool> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/stats", get(get_dashboard_stats))
}
