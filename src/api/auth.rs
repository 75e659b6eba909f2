use axum::{extract::State, http::StatusCode, routing::{get, post}, Extension, Json, Router};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::db::models::user::{
    ChangePasswordRequest, LoginRecord, LoginRequest, Role, SessionView, SignupRequest,
    MIN_PASSWORD_LEN,
};
use crate::db::queries::user::{
    create_account, fetch_login_record, fetch_password_hash, fetch_session, update_password,
};
use crate::error::{PortalError, PortalResult};
use crate::middleware::auth::RevokedTokens;
use crate::utils::api_response::ApiResponse;

/// JWT Claims used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - profile id
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Token id, used to sign a single session out
    pub jti: String,
    pub iat: usize,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: Uuid, email: &str, role: Role, ttl_secs: u64) -> Self {
        let now = Utc::now().timestamp() as usize;
        Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl_secs as usize,
        }
    }

    /// Converts `sub` to the profile id, or returns a descriptive error.
    pub fn user_id(&self) -> Result<Uuid, ApiResponse<()>> {
        self.sub.parse::<Uuid>().map_err(|_| {
            ApiResponse::error(StatusCode::BAD_REQUEST, "Invalid user ID format in token", None)
        })
    }
}

pub fn issue_token(claims: &Claims, secret: &str) -> PortalResult<String> {
    Ok(encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}

/// A corrupt stored hash is a server error, not a wrong password.
pub fn verify_password(password: &str, password_hash: &str) -> PortalResult<bool> {
    Ok(verify(password, password_hash)?)
}

/// Admin and vendor accounts cannot sign in until a super user approves them.
pub fn check_login_allowed(record: &LoginRecord) -> PortalResult<()> {
    if !record.approved {
        return Err(PortalError::PendingApproval);
    }
    Ok(())
}

/// Represents a successful login response returning the jwt token.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub session: SessionView,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SignupResponse {
    pub pending_approval: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub session: SessionView,
}

fn start_session(session: SessionView) -> PortalResult<LoginResponse> {
    let config = Config::get();
    let claims =
        Claims::new(session.user.id, &session.user.email, session.role, config.jwt_ttl_secs);
    let token = issue_token(&claims, &config.jwt_secret)?;
    Ok(LoginResponse { token, session })
}

/// Handles account signup
///
/// Students are approved immediately and receive a session. Admin and vendor
/// accounts are recorded with a pending approval request and get no token.
///
/// # Returns
/// * `201 Created` - Student account created, session started.
/// * `202 Accepted` - Admin/vendor account awaiting approval.
/// * `400 Bad Request` - Missing or invalid fields.
/// * `403 Forbidden` - Attempt to sign up as super user.
/// * `409 Conflict` - Email already registered.
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "Authentication",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Student account created", body = SignupResponse),
        (status = 202, description = "Account awaiting super user approval", body = SignupResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Role cannot self-register"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn signup(
    State(pool): State<PgPool>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<ApiResponse<SignupResponse>, ApiResponse<()>> {
    payload.validate()?;

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(PortalError::from)?;
    let session = create_account(&pool, &payload, &password_hash)
        .await
        .map_err(|e| match e {
            PortalError::Database(db) if crate::error::is_unique_violation(&db) => {
                PortalError::Conflict("Email already registered".into())
            }
            other => other,
        })?;

    if payload.role.needs_approval() {
        info!("📝 {} signup for {} awaiting approval", payload.role, payload.email);
        return Ok(ApiResponse::success(
            StatusCode::ACCEPTED,
            "Account created. Awaiting super user approval.",
            SignupResponse { pending_approval: true, token: None, session },
        ));
    }

    let LoginResponse { token, session } = start_session(session)?;
    info!("✅ Student account created: {}", payload.email);
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Account created",
        SignupResponse { pending_approval: false, token: Some(token), session },
    ))
}

/// Handles user login
///
/// # Returns
/// * `200 OK` - Returns a JWT token if authentication is successful.
/// * `401 Unauthorized` - If credentials are incorrect.
/// * `403 Forbidden` - Account still waiting for approval.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body(content = LoginRequest, description = "User login details"),
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Account pending approval"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn login(
    State(pool): State<PgPool>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiResponse<()>> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.trim().is_empty() {
        return Err(PortalError::Validation("Please enter both email and password".into()).into());
    }

    let invalid = || PortalError::Unauthorized("Invalid email or password.".into());

    let Some(record) = fetch_login_record(&pool, &email).await? else {
        warn!("❌ Login attempt for non-existent user: {}", email);
        return Err(invalid().into());
    };

    if !verify_password(&payload.password, &record.password_hash)? {
        warn!("❌ Invalid password attempt for user: {}", email);
        return Err(invalid().into());
    }

    if let Err(e) = check_login_allowed(&record) {
        warn!("🔒 Login attempt for unapproved {} account: {}", record.role, email);
        return Err(e.into());
    }

    let response = start_session(SessionView {
        user: record.profile(),
        role: record.role,
        is_approved: record.approved,
    })?;

    info!("✅ Login successful for user: {}", email);
    Ok(ApiResponse::success(StatusCode::OK, "Login successful", response))
}

/// Signs the presented token out.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    responses(
        (status = 200, description = "Signed out"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
pub async fn logout(
    Extension(claims): Extension<Claims>,
    Extension(revoked): Extension<RevokedTokens>,
) -> ApiResponse<()> {
    revoked.insert(claims.jti.clone(), ());
    info!("👋 Signed out {}", claims.email);
    ApiResponse::success(StatusCode::OK, "Signed out", ())
}

/// Current user, role and approval flag.
#[utoipa::path(
    get,
    path = "/auth/session",
    tag = "Authentication",
    responses(
        (status = 200, description = "Current session", body = SessionView),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Account no longer exists")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_session(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<SessionView>, ApiResponse<()>> {
    let session = fetch_session(&pool, claims.user_id()?).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Authenticated user info", session))
}

/// Handles a user password change request
///
/// The user must provide their **current password** for verification.
#[utoipa::path(
    post,
    path = "/auth/change_password",
    tag = "Authentication",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated successfully"),
        (status = 400, description = "New password too short"),
        (status = 401, description = "Old password incorrect"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn change_password(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if payload.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))
        .into());
    }

    let user_id = claims.user_id()?;
    let current_hash = fetch_password_hash(&pool, user_id).await?;

    if !verify_password(&payload.old_password, &current_hash)? {
        return Err(PortalError::Unauthorized("Incorrect old password".into()).into());
    }

    let new_password_hash = hash(&payload.new_password, DEFAULT_COST).map_err(PortalError::from)?;
    update_password(&pool, user_id, &new_password_hash).await?;

    Ok(ApiResponse::success(StatusCode::OK, "Password updated successfully", ()))
}

/// Registers the public authentication routes for the API.
///
/// # Routes
/// - `POST /auth/signup` → Create an account.
/// - `POST /auth/login` → Authenticate and return a JWT token.
///
/// # Example Usage
/// ```sh
/// curl -X POST http://localhost:3000/auth/login \
///   -H "Content-Type: application/json" \
///   -d '{"email": "student@nmims.edu", "password": "secret123"}'
/// ```
pub fn auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

/// Registers the **protected** authentication routes for the API.
///
/// # Routes
/// - `POST /auth/logout` → Revoke the presented token.
/// - `GET /auth/session` → Current user, role and approval flag.
/// - `POST /auth/change_password` → Change own password (requires old password).
pub fn secure_auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(get_session))
        .route("/auth/change_password", post(change_password))
}

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::{Modify, OpenApi};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());

        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );

        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(signup, login, logout, get_session, change_password),
    components(
        schemas(
            SignupRequest, SignupResponse,
            LoginRequest, LoginResponse,
            ChangePasswordRequest, SessionView, Role
        )
    ),
    tags(
        (name = "Authentication", description = "Signup, login and session endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct AuthDoc;
