use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::requests::*;

pub fn approval_routes() -> Router<PgPool> {
    Router::new()
        .route("/approval-requests", get(list_approval_requests))
        .route("/approval-requests/{request_id}/approve", post(approve_request))
        .route("/approval-requests/{request_id}/reject", post(reject_request))
}
