use axum::{http::StatusCode, routing::get, Router};
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::db::models::catalog::{Appliance, Catalog, StoreCategory, StoreItem};
use crate::utils::api_response::ApiResponse;

/// Reference lists the student forms are built from. No login required.
#[utoipa::path(
    get,
    path = "/catalog",
    responses(
        (
            status = 200,
            description = "Hostel blocks, time slots, appliances and store items",
            body = Catalog
        )
    ),
    tag = "Catalog"
)]
pub async fn get_catalog() -> ApiResponse<Catalog> {
    ApiResponse::success(StatusCode::OK, "Catalog", Catalog::current())
}

pub fn catalog_routes() -> Router<PgPool> {
    Router::new().route("/catalog", get(get_catalog))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_catalog),
    components(schemas(Catalog, Appliance, StoreCategory, StoreItem)),
    tags((name = "Catalog", description = "Fixed form options"))
)]
pub struct CatalogDoc;
