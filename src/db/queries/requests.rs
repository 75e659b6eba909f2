use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::models::requests::{
    ApprovalDecision, ApprovalFilter, ApprovalRequest, ApprovalStatus,
};
use crate::db::models::user::Role;
use crate::error::{PortalError, PortalResult};
use crate::middleware::auth::{PermissionCache, UserPermissions};
use crate::utils::api_response::ApiResponse;

const APPROVAL_COLUMNS: &str =
    "id, user_id, role, full_name, email, status, requested_at, approved_at, reviewed_by";

#[utoipa::path(
    get,
    path = "/approval-requests",
    params(ApprovalFilter),
    responses(
        (
            status = 200,
            description = "Approval requests, newest first",
            body = Vec<ApprovalRequest>
        ),
        (status = 403, description = "Only the super user can review accounts"),
        (status = 500, description = "Failed to retrieve requests")
    ),
    tag = "Approvals",
    security(("bearerAuth" = []))
)]
pub async fn list_approval_requests(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Query(filter): Query<ApprovalFilter>,
) -> Result<ApiResponse<Vec<ApprovalRequest>>, ApiResponse<()>> {
    perms.require(Role::SuperUser)?;

    let requests = sqlx::query_as::<_, ApprovalRequest>(&format!(
        r#"
        SELECT {APPROVAL_COLUMNS}
        FROM approval_requests
        WHERE $1::approval_status IS NULL OR status = $1
        ORDER BY requested_at DESC
        "#
    ))
    .bind(filter.status)
    .fetch_all(&pool)
    .await
    .map_err(PortalError::from)?;

    Ok(ApiResponse::success(StatusCode::OK, "Approval requests", requests))
}

/// Records the verdict and, for approvals, unlocks the account in the same transaction.
async fn decide(
    pool: &PgPool,
    reviewer: Uuid,
    request_id: Uuid,
    decision: ApprovalDecision,
) -> PortalResult<ApprovalRequest> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_scalar::<_, ApprovalStatus>(
        "SELECT status FROM approval_requests WHERE id = $1 FOR UPDATE",
    )
    .bind(request_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(PortalError::NotFound("Approval request"))?;

    let outcome = decision.check(current)?;

    let updated = sqlx::query_as::<_, ApprovalRequest>(&format!(
        r#"
        UPDATE approval_requests
        SET status = $1,
            reviewed_by = $2,
            approved_at = CASE WHEN $1 = 'approved'::approval_status THEN NOW() ELSE approved_at END
        WHERE id = $3
        RETURNING {APPROVAL_COLUMNS}
        "#
    ))
    .bind(outcome)
    .bind(reviewer)
    .bind(request_id)
    .fetch_one(&mut *tx)
    .await?;

    if decision.unlocks_account() {
        sqlx::query("UPDATE user_roles SET approved = TRUE WHERE user_id = $1")
            .bind(updated.user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(updated)
}

#[utoipa::path(
    post,
    path = "/approval-requests/{request_id}/approve",
    params(("request_id" = Uuid, Path, description = "Approval request ID")),
    responses(
        (status = 200, description = "Account approved", body = ApprovalRequest),
        (status = 403, description = "Only the super user can review accounts"),
        (status = 404, description = "Approval request not found"),
        (status = 409, description = "Approval request is not pending")
    ),
    tag = "Approvals",
    security(("bearerAuth" = []))
)]
pub async fn approve_request(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Extension(permission_cache): Extension<PermissionCache>,
    Path(request_id): Path<Uuid>,
) -> Result<ApiResponse<ApprovalRequest>, ApiResponse<()>> {
    perms.require(Role::SuperUser)?;

    let request = decide(&pool, perms.user_id, request_id, ApprovalDecision::Approve).await?;
    permission_cache.invalidate(&request.user_id);

    info!("✅ {} account for {} approved", request.role, request.email);
    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("{}'s account has been approved", request.full_name),
        request,
    ))
}

#[utoipa::path(
    post,
    path = "/approval-requests/{request_id}/reject",
    params(("request_id" = Uuid, Path, description = "Approval request ID")),
    responses(
        (status = 200, description = "Request rejected", body = ApprovalRequest),
        (status = 403, description = "Only the super user can review accounts"),
        (status = 404, description = "Approval request not found"),
        (status = 409, description = "Approval request is not pending")
    ),
    tag = "Approvals",
    security(("bearerAuth" = []))
)]
pub async fn reject_request(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Path(request_id): Path<Uuid>,
) -> Result<ApiResponse<ApprovalRequest>, ApiResponse<()>> {
    perms.require(Role::SuperUser)?;

    let request = decide(&pool, perms.user_id, request_id, ApprovalDecision::Reject).await?;

    info!("🚫 {} account for {} rejected", request.role, request.email);
    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("{}'s request has been rejected", request.full_name),
        request,
    ))
}

use utoipa::OpenApi;
#[derive(OpenApi)]
#[openapi(
    paths(list_approval_requests, approve_request, reject_request),
    components(schemas(ApprovalRequest, ApprovalStatus, Role)),
    tags(
        (name = "Approvals", description = "Super user review of admin and vendor accounts")
    )
)]
pub struct ApprovalDoc;
