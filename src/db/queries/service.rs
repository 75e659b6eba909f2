use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use sqlx::postgres::PgRow;
use sqlx::types::Json as JsonColumn;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::service::{
    ApplianceComplaint, CleaningRequest, DashboardStats, Location, NewApplianceComplaint,
    NewCleaningRequest, NewStoreOrder, OrderItem, PortalData, RequestStatus, ServiceKind,
    StatusUpdate, StoreOrder,
};
use crate::db::models::user::Role;
use crate::db::queries::user::fetch_profile;
use crate::error::{PortalError, PortalResult};
use crate::middleware::auth::UserPermissions;
use crate::utils::api_response::ApiResponse;

/// Which rows of one collection a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Own(Uuid),
    All,
    Hidden,
}

/// Students see their own submissions, staff see the queue they work on,
/// the super user sees everything.
pub fn scope_for(perms: &UserPermissions, kind: ServiceKind) -> Scope {
    if !perms.approved {
        return Scope::Hidden;
    }
    match perms.role {
        Role::Student => Scope::Own(perms.user_id),
        Role::SuperUser => Scope::All,
        role if role == kind.manager() => Scope::All,
        _ => Scope::Hidden,
    }
}

async fn fetch_rows<T>(
    pool: &PgPool,
    perms: &UserPermissions,
    kind: ServiceKind,
) -> PortalResult<Vec<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let table = kind.table();
    let rows = match scope_for(perms, kind) {
        Scope::Hidden => Vec::new(),
        Scope::All => {
            sqlx::query_as::<_, T>(&format!("SELECT * FROM {table} ORDER BY created_at DESC"))
                .fetch_all(pool)
                .await?
        }
        Scope::Own(user_id) => {
            sqlx::query_as::<_, T>(&format!(
                "SELECT * FROM {table} WHERE user_id = $1 ORDER BY created_at DESC"
            ))
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Reloads all three collections, newest first.
pub async fn load_portal_data(
    pool: &PgPool,
    perms: &UserPermissions,
) -> PortalResult<PortalData> {
    let (cleaning_requests, appliance_complaints, store_orders) = tokio::try_join!(
        fetch_rows::<CleaningRequest>(pool, perms, ServiceKind::Cleaning),
        fetch_rows::<ApplianceComplaint>(pool, perms, ServiceKind::Appliance),
        fetch_rows::<StoreOrder>(pool, perms, ServiceKind::StoreOrder),
    )?;

    Ok(PortalData { cleaning_requests, appliance_complaints, store_orders })
}

async fn resolve_student_name(
    pool: &PgPool,
    perms: &UserPermissions,
    location: &mut Location,
) -> PortalResult<()> {
    if location.needs_student_name() {
        let profile = fetch_profile(pool, perms.user_id).await?;
        location.resolve_student_name(&profile.full_name)?;
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/cleaning-requests",
    request_body = NewCleaningRequest,
    responses(
        (
            status = 201,
            description = "Cleaning request submitted; reloaded dashboard",
            body = PortalData
        ),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Only students can submit requests"),
        (status = 500, description = "Failed to insert cleaning request")
    ),
    tag = "Service Requests",
    security(("bearerAuth" = []))
)]
pub async fn create_cleaning_request(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Json(mut payload): Json<NewCleaningRequest>,
) -> Result<ApiResponse<PortalData>, ApiResponse<()>> {
    perms.require(Role::Student)?;
    payload.validate(Local::now().date_naive())?;
    resolve_student_name(&pool, &perms, &mut payload.location).await?;

    sqlx::query(
        r#"
        INSERT INTO cleaning_requests
            (id, user_id, student_name, hostel_block, room_number,
             preferred_date, preferred_time, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(perms.user_id)
    .bind(payload.location.student_name())
    .bind(&payload.location.hostel_block)
    .bind(&payload.location.room_number)
    .bind(payload.preferred_date)
    .bind(&payload.preferred_time)
    .bind(&payload.notes)
    .execute(&pool)
    .await
    .map_err(PortalError::from)?;

    info!(
        "🧹 Cleaning request from {} for {} room {}",
        perms.user_id, payload.location.hostel_block, payload.location.room_number
    );
    let data = load_portal_data(&pool, &perms).await?;
    Ok(ApiResponse::success(StatusCode::CREATED, "Cleaning request submitted successfully", data))
}

#[utoipa::path(
    post,
    path = "/appliance-complaints",
    request_body = NewApplianceComplaint,
    responses(
        (status = 201, description = "Complaint submitted; reloaded dashboard", body = PortalData),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Only students can submit complaints"),
        (status = 500, description = "Failed to insert complaint")
    ),
    tag = "Service Requests",
    security(("bearerAuth" = []))
)]
pub async fn create_appliance_complaint(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Json(mut payload): Json<NewApplianceComplaint>,
) -> Result<ApiResponse<PortalData>, ApiResponse<()>> {
    perms.require(Role::Student)?;
    payload.validate()?;
    resolve_student_name(&pool, &perms, &mut payload.location).await?;

    sqlx::query(
        r#"
        INSERT INTO appliance_complaints
            (id, user_id, student_name, hostel_block, room_number, appliance, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(perms.user_id)
    .bind(payload.location.student_name())
    .bind(&payload.location.hostel_block)
    .bind(&payload.location.room_number)
    .bind(&payload.appliance)
    .bind(&payload.description)
    .execute(&pool)
    .await
    .map_err(PortalError::from)?;

    info!("🔧 {} complaint from {}", payload.appliance, perms.user_id);
    let data = load_portal_data(&pool, &perms).await?;
    Ok(ApiResponse::success(StatusCode::CREATED, "Complaint submitted successfully", data))
}

#[utoipa::path(
    post,
    path = "/store-orders",
    request_body = NewStoreOrder,
    responses(
        (status = 201, description = "Order placed; reloaded dashboard", body = PortalData),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Only students can place orders"),
        (status = 500, description = "Failed to insert order")
    ),
    tag = "Service Requests",
    security(("bearerAuth" = []))
)]
pub async fn create_store_order(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Json(mut payload): Json<NewStoreOrder>,
) -> Result<ApiResponse<PortalData>, ApiResponse<()>> {
    perms.require(Role::Student)?;
    payload.validate()?;
    resolve_student_name(&pool, &perms, &mut payload.location).await?;

    sqlx::query(
        r#"
        INSERT INTO store_orders
            (id, user_id, student_name, hostel_block, room_number, category, items)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(perms.user_id)
    .bind(payload.location.student_name())
    .bind(&payload.location.hostel_block)
    .bind(&payload.location.room_number)
    .bind(&payload.category)
    .bind(JsonColumn(&payload.items))
    .execute(&pool)
    .await
    .map_err(PortalError::from)?;

    info!(
        "🛒 {} order with {} item(s) from {}",
        payload.category,
        payload.items.len(),
        perms.user_id
    );
    let data = load_portal_data(&pool, &perms).await?;
    Ok(ApiResponse::success(StatusCode::CREATED, "Order placed successfully", data))
}

/// Writes `target` only if the row still holds `expected`.
pub async fn compare_and_set_status(
    pool: &PgPool,
    kind: ServiceKind,
    id: Uuid,
    expected: RequestStatus,
    target: RequestStatus,
) -> PortalResult<()> {
    let table = kind.table();
    let result = sqlx::query(&format!(
        "UPDATE {table} SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3"
    ))
    .bind(target)
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        warn!("{} {} changed while updating to {}", kind.label(), id, target);
        return Err(PortalError::Conflict(format!(
            "{} was updated by someone else; reload and try again",
            kind.label()
        )));
    }
    Ok(())
}

/// Moves one request forward, refusing backward or repeated transitions.
async fn change_status(
    pool: &PgPool,
    perms: &UserPermissions,
    kind: ServiceKind,
    id: Uuid,
    target: RequestStatus,
) -> PortalResult<PortalData> {
    perms.require_manager_of(kind)?;
    RequestStatus::check_target(target)?;

    let table = kind.table();
    let current =
        sqlx::query_scalar::<_, RequestStatus>(&format!("SELECT status FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(PortalError::NotFound(kind.label()))?;

    current.check_transition(target)?;
    compare_and_set_status(pool, kind, id, current, target).await?;

    info!("✅ {} {} moved {} -> {} by {}", kind.label(), id, current, target, perms.user_id);
    load_portal_data(pool, perms).await
}

#[utoipa::path(
    patch,
    path = "/cleaning-requests/{id}/status",
    request_body = StatusUpdate,
    params(("id" = Uuid, Path, description = "Cleaning request ID")),
    responses(
        (status = 200, description = "Status updated; reloaded dashboard", body = PortalData),
        (status = 400, description = "Requested status is not allowed"),
        (status = 403, description = "Only approved admins can update cleaning requests"),
        (status = 404, description = "Cleaning request not found"),
        (status = 409, description = "Status can only move forward")
    ),
    tag = "Service Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_cleaning_status(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<ApiResponse<PortalData>, ApiResponse<()>> {
    let data = change_status(&pool, &perms, ServiceKind::Cleaning, id, update.status).await?;
    Ok(ApiResponse::success(StatusCode::OK, format!("Request marked as {}", update.status), data))
}

#[utoipa::path(
    patch,
    path = "/appliance-complaints/{id}/status",
    request_body = StatusUpdate,
    params(("id" = Uuid, Path, description = "Appliance complaint ID")),
    responses(
        (status = 200, description = "Status updated; reloaded dashboard", body = PortalData),
        (status = 400, description = "Requested status is not allowed"),
        (status = 403, description = "Only approved admins can update complaints"),
        (status = 404, description = "Appliance complaint not found"),
        (status = 409, description = "Status can only move forward")
    ),
    tag = "Service Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_appliance_status(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<ApiResponse<PortalData>, ApiResponse<()>> {
    let data = change_status(&pool, &perms, ServiceKind::Appliance, id, update.status).await?;
    Ok(ApiResponse::success(StatusCode::OK, format!("Complaint marked as {}", update.status), data))
}

#[utoipa::path(
    patch,
    path = "/store-orders/{id}/status",
    request_body = StatusUpdate,
    params(("id" = Uuid, Path, description = "Store order ID")),
    responses(
        (status = 200, description = "Status updated; reloaded dashboard", body = PortalData),
        (status = 400, description = "Requested status is not allowed"),
        (status = 403, description = "Only approved vendors can update orders"),
        (status = 404, description = "Store order not found"),
        (status = 409, description = "Status can only move forward")
    ),
    tag = "Service Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_store_order_status(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<ApiResponse<PortalData>, ApiResponse<()>> {
    let data = change_status(&pool, &perms, ServiceKind::StoreOrder, id, update.status).await?;
    let label = match update.status {
        RequestStatus::Completed => "delivered",
        other => other.as_str(),
    };
    Ok(ApiResponse::success(StatusCode::OK, format!("Order marked as {}", label), data))
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (
            status = 200,
            description = "Collections visible to the caller, newest first",
            body = PortalData
        ),
        (status = 403, description = "Account pending approval"),
        (status = 500, description = "Failed to load dashboard")
    ),
    tag = "Dashboard",
    security(("bearerAuth" = []))
)]
pub async fn get_dashboard(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
) -> Result<ApiResponse<PortalData>, ApiResponse<()>> {
    perms.require_approved()?;
    let data = load_portal_data(&pool, &perms).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Dashboard loaded", data))
}

#[utoipa::path(
    get,
    path = "/dashboard/stats",
    responses(
        (status = 200, description = "Status counts per visible collection", body = DashboardStats),
        (status = 403, description = "Account pending approval"),
        (status = 500, description = "Failed to load dashboard")
    ),
    tag = "Dashboard",
    security(("bearerAuth" = []))
)]
pub async fn get_dashboard_stats(
    State(pool): State<PgPool>,
    Extension(perms): Extension<UserPermissions>,
) -> Result<ApiResponse<DashboardStats>, ApiResponse<()>> {
    perms.require_approved()?;
    let data = load_portal_data(&pool, &perms).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Dashboard counts", data.stats()))
}

use utoipa::OpenApi;
#[derive(OpenApi)]
#[openapi(
    paths(
        create_cleaning_request,
        create_appliance_complaint,
        create_store_order,
        update_cleaning_status,
        update_appliance_status,
        update_store_order_status,
        get_dashboard,
        get_dashboard_stats
    ),
    components(schemas(
        CleaningRequest, ApplianceComplaint, StoreOrder, OrderItem, NewCleaningRequest,
        NewApplianceComplaint, NewStoreOrder, StatusUpdate, RequestStatus, PortalData,
        DashboardStats, Location
    )),
    tags(
        (
            name = "Service Requests",
            description = "Cleaning requests, appliance complaints and store orders"
        ),
        (name = "Dashboard", description = "Role-scoped views over all service requests")
    )
)]
pub struct ServiceDoc;
