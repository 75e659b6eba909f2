use axum::http::StatusCode;
use serde_json::json;
use tracing::error;

use crate::db::models::service::RequestStatus;
use crate::utils::api_response::ApiResponse;

pub const PENDING_APPROVAL_MESSAGE: &str = "Your account is pending approval from the super user.";

/// Errors raised while serving a portal operation.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{}", PENDING_APPROVAL_MESSAGE)]
    PendingApproval,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Token generation failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

pub type PortalResult<T> = Result<T, PortalError>;

impl PortalError {
    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::PendingApproval | PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Conflict(_) | PortalError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            PortalError::Database(e) if is_unique_violation(e) => StatusCode::CONFLICT,
            PortalError::Database(_) | PortalError::PasswordHash(_) | PortalError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Postgres `unique_violation`.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

impl From<PortalError> for ApiResponse<()> {
    fn from(err: PortalError) -> Self {
        let status = err.status();
        match &err {
            PortalError::PendingApproval => ApiResponse::error(
                status,
                err.to_string(),
                Some(json!({ "pending_approval": true })),
            ),
            PortalError::InvalidTransition { from, to } => ApiResponse::error(
                status,
                err.to_string(),
                Some(json!({ "current_status": from, "requested_status": to })),
            ),
            PortalError::Database(e) if status == StatusCode::CONFLICT => {
                ApiResponse::error(
                    status,
                    "Record already exists",
                    Some(json!({ "error": e.to_string() })),
                )
            }
            PortalError::Database(_) | PortalError::PasswordHash(_) | PortalError::Token(_) => {
                error!("❌ {}", err);
                ApiResponse::error(
                    status,
                    "Internal server error",
                    Some(json!({ "error": err.to_string() })),
                )
            }
            _ => ApiResponse::error(status, err.to_string(), None),
        }
    }
}
