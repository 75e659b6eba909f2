pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod utils;

use std::time::Duration;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::{Extension, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::auth::AuthDoc;
use crate::api::catalog::CatalogDoc;
use crate::config::Config;
use crate::db::queries::requests::ApprovalDoc;
use crate::db::queries::service::ServiceDoc;
use crate::middleware::auth::{jwt_middleware, rbac_middleware, PermissionCache, RevokedTokens};
use crate::middleware::request_logger::log_requests;

/// Largest JSON body accepted by any route.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// ✅ Merged OpenAPI document served by Swagger UI and RapiDoc
pub fn api_doc() -> utoipa::openapi::OpenApi {
    AuthDoc::openapi()
        .merge_from(CatalogDoc::openapi())
        .merge_from(ServiceDoc::openapi())
        .merge_from(ApprovalDoc::openapi())
}

/// Builds the full application router.
///
/// Public routes need no token. Private routes pass through `jwt_middleware`
/// and then `rbac_middleware`, which attaches the caller's `UserPermissions`.
pub fn build_app(
    pool: PgPool,
    permission_cache: PermissionCache,
    revoked_tokens: RevokedTokens,
) -> Router {
    let merged_doc = api_doc();
    let timeout = Duration::from_secs(Config::get().request_timeout_secs);

    let public_routes = Router::new()
        .merge(api::auth::auth_routes())
        .merge(api::catalog::catalog_routes());

    let private_routes = Router::new()
        .merge(api::auth::secure_auth_routes())
        .merge(api::service_requests::service_routes())
        .merge(api::service_requests::dashboard_routes())
        .merge(api::requests::approval_routes())
        .route_layer(from_fn_with_state(pool.clone(), rbac_middleware))
        .route_layer(from_fn(jwt_middleware));

    Router::new()
        .merge(api::health::health_routes())
        .merge(public_routes)
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/rapidoc.json", merged_doc).path("/rapidoc"))
        .layer(Extension(permission_cache))
        .layer(Extension(revoked_tokens))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(from_fn(log_requests))
        .with_state(pool)
}
