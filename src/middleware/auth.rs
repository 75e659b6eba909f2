use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Extension, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use moka::sync::Cache; // ✅ High-performance TTL Cache
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::api::auth::Claims;
use crate::config::Config;
use crate::db::models::service::ServiceKind;
use crate::db::models::user::{Role, UserRole};
use crate::error::{PortalError, PortalResult};
use crate::utils::api_response::ApiResponse;

/// ✅ **RBAC Permissions Cache Using `moka`**
pub type PermissionCache = Arc<Cache<Uuid, UserPermissions>>;

/// Token ids (`jti`) signed out before their expiry.
pub type RevokedTokens = Arc<Cache<String, ()>>;

/// ✅ **Initialize the `moka` Cache**
pub fn create_permission_cache(ttl: Duration) -> PermissionCache {
    Arc::new(Cache::builder().time_to_live(ttl).build())
}

/// Entries only need to outlive the tokens they block.
pub fn create_revocation_list(token_ttl: Duration) -> RevokedTokens {
    Arc::new(Cache::builder().time_to_live(token_ttl).build())
}

/// ✅ **JWT Middleware** (Handles Token Authentication)
pub async fn jwt_middleware(
    Extension(revoked): Extension<RevokedTokens>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    // Step 1: Extract Authorization header
    let auth_header = req.headers().get("Authorization").ok_or_else(|| {
        warn!("Missing Authorization header");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing Authorization header", None)
            .into_response()
    })?;

    // Step 2: Convert header to string
    let token_str = auth_header.to_str().map_err(|_| {
        warn!("Invalid Authorization header format");
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid Authorization header format",
            None,
        )
        .into_response()
    })?;

    // Step 3: Strip "Bearer " prefix
    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid token format (missing 'Bearer ' prefix)");
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
        .into_response()
    })?;

    // Step 4: Decode the JWT token
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(Config::get().jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("JWT decoding failed: {:?}", e);
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            Some(json!({ "error": e.to_string() })),
        )
        .into_response()
    })?;

    // Step 5: Refuse tokens that were signed out
    if revoked.contains_key(&token_data.claims.jti) {
        warn!("Revoked token presented for {}", token_data.claims.email);
        return Err(ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Session has been signed out",
            None,
        )
        .into_response());
    }

    // Step 6: Insert claims into request extensions
    debug!("JWT decoded successfully: {:?}", token_data.claims);
    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}

/// ✅ **User Permissions Structure**
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserPermissions {
    pub user_id: Uuid,
    pub role: Role,
    pub approved: bool,
}

impl From<UserRole> for UserPermissions {
    fn from(row: UserRole) -> Self {
        UserPermissions { user_id: row.user_id, role: row.role, approved: row.approved }
    }
}

impl UserPermissions {
    pub fn require_approved(&self) -> PortalResult<()> {
        if !self.approved {
            return Err(PortalError::PendingApproval);
        }
        Ok(())
    }

    /// ✅ **Require an approved account holding `role`**
    pub fn require(&self, role: Role) -> PortalResult<()> {
        if self.role != role {
            return Err(PortalError::Forbidden(format!(
                "This action requires the {} role",
                role
            )));
        }
        if !self.approved {
            return Err(PortalError::PendingApproval);
        }
        Ok(())
    }

    /// ✅ **Check if user may change the status of `kind` requests**
    pub fn require_manager_of(&self, kind: ServiceKind) -> PortalResult<()> {
        self.require(kind.manager())
    }
}

/// ✅ **RBAC Middleware with `moka`**
pub async fn rbac_middleware(
    State(db_pool): State<PgPool>,
    Extension(permission_cache): Extension<PermissionCache>, // ✅ Uses Axum **Extension**
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = req.extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| {
            error!("Missing JWT claims in request");
            ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "Missing JWT claims in request",
                None,
            )
            .into_response()
        })?;

    let user_id = claims.user_id().map_err(IntoResponse::into_response)?;

    // ✅ **Check cache first before querying DB**
    if let Some(cached_permissions) = permission_cache.get(&user_id) {
        req.extensions_mut().insert(cached_permissions);
        return Ok(next.run(req).await);
    }

    // ❌ **If not cached, query database**
    let user_permissions = match fetch_rbac_from_db(user_id, &db_pool).await {
        Ok(Some(permissions)) => permissions,
        Ok(None) => {
            warn!("Token for unknown user {}", user_id);
            return Err(ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "Account no longer exists",
                None,
            )
            .into_response());
        }
        Err(err) => {
            error!("Database query failed: {:?}", err);
            return Err(ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load user permissions",
                Some(json!({ "error": err.to_string() })),
            ).into_response());
        }
    };

    // ✅ **Cache the retrieved permissions**
    permission_cache.insert(user_id, user_permissions.clone());

    // ✅ **Attach to request & continue**
    req.extensions_mut().insert(user_permissions);
    Ok(next.run(req).await)
}

/// ✅ **Query Database for RBAC Data**
async fn fetch_rbac_from_db(
    user_id: Uuid,
    pool: &PgPool,
) -> Result<Option<UserPermissions>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRole>(
        "SELECT user_id, role, approved FROM user_roles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(UserPermissions::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(role: Role, approved: bool) -> UserPermissions {
        UserPermissions { user_id: Uuid::new_v4(), role, approved }
    }

    #[test]
    fn approved_role_passes() {
        assert!(perms(Role::Admin, true).require(Role::Admin).is_ok());
        assert!(perms(Role::Vendor, true).require_manager_of(ServiceKind::StoreOrder).is_ok());
        assert!(perms(Role::Admin, true).require_manager_of(ServiceKind::Appliance).is_ok());
    }

    #[test]
    fn wrong_role_is_forbidden() {
        assert!(matches!(
            perms(Role::Student, true).require_manager_of(ServiceKind::Cleaning),
            Err(PortalError::Forbidden(_))
        ));
        assert!(matches!(
            perms(Role::Admin, true).require_manager_of(ServiceKind::StoreOrder),
            Err(PortalError::Forbidden(_))
        ));
        assert!(matches!(
            perms(Role::SuperUser, true).require(Role::Vendor),
            Err(PortalError::Forbidden(_))
        ));
    }

    #[test]
    fn unapproved_account_is_pending() {
        assert!(matches!(
            perms(Role::Vendor, false).require(Role::Vendor),
            Err(PortalError::PendingApproval)
        ));
    }

    #[test]
    fn revocation_list_remembers_token_ids() {
        let revoked = create_revocation_list(Duration::from_secs(60));
        revoked.insert("abc".to_string(), ());
        assert!(revoked.contains_key("abc"));
        assert!(!revoked.contains_key("def"));
    }
}
