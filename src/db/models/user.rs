use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
    Vendor,
    SuperUser,
}

impl Role {
    /// Admin and vendor accounts stay unusable until a super user approves them.
    pub fn needs_approval(self) -> bool {
        matches!(self, Role::Admin | Role::Vendor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Vendor => "vendor",
            Role::SuperUser => "super_user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub room_number: Option<String>,
    pub hostel_block: Option<String>,
    pub sap_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role: Role,
    pub approved: bool,
}

/// Everything the login path needs in one row.
#[derive(Debug, FromRow)]
pub struct LoginRecord {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub room_number: Option<String>,
    pub hostel_block: Option<String>,
    pub sap_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub password_hash: String,
    pub role: Role,
    pub approved: bool,
}

impl LoginRecord {
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            room_number: self.room_number.clone(),
            hostel_block: self.hostel_block.clone(),
            sap_id: self.sap_id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Current identity as seen by a dashboard.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct SessionView {
    pub user: Profile,
    pub role: Role,
    pub is_approved: bool,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub room_number: Option<String>,
    pub hostel_block: Option<String>,
    pub sap_id: Option<String>,
}

pub const MIN_PASSWORD_LEN: usize = 6;

impl SignupRequest {
    /// Normalizes the payload in place and checks required fields.
    pub fn validate(&mut self) -> PortalResult<()> {
        self.email = self.email.trim().to_lowercase();
        self.full_name = self.full_name.trim().to_string();

        if self.role == Role::SuperUser {
            return Err(PortalError::Forbidden(
                "Super user accounts cannot be created through signup".into(),
            ));
        }
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(PortalError::Validation("A valid email is required".into()));
        }
        if self.full_name.is_empty() {
            return Err(PortalError::Validation("Full name is required".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PortalError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        for field in [&mut self.room_number, &mut self.hostel_block, &mut self.sap_id] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
        Ok(())
    }
}

#[derive(Serialize, Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(role: Role) -> SignupRequest {
        SignupRequest {
            email: "  Rahul.Sharma@NMIMS.edu ".into(),
            password: "secret123".into(),
            full_name: " Rahul Sharma ".into(),
            role,
            room_number: Some(" 304 ".into()),
            hostel_block: Some("".into()),
            sap_id: None,
        }
    }

    #[test]
    fn only_admin_and_vendor_need_approval() {
        assert!(!Role::Student.needs_approval());
        assert!(Role::Admin.needs_approval());
        assert!(Role::Vendor.needs_approval());
        assert!(!Role::SuperUser.needs_approval());
    }

    #[test]
    fn role_uses_snake_case_on_the_wire() {
        assert_eq!(serde_json::to_string(&Role::SuperUser).unwrap(), "\"super_user\"");
        let role: Role = serde_json::from_str("\"vendor\"").unwrap();
        assert_eq!(role, Role::Vendor);
    }

    #[test]
    fn signup_is_normalized() {
        let mut req = signup(Role::Student);
        req.validate().unwrap();
        assert_eq!(req.email, "rahul.sharma@nmims.edu");
        assert_eq!(req.full_name, "Rahul Sharma");
        assert_eq!(req.room_number.as_deref(), Some("304"));
        assert_eq!(req.hostel_block, None);
    }

    #[test]
    fn super_user_cannot_sign_up() {
        let mut req = signup(Role::SuperUser);
        assert!(matches!(req.validate(), Err(PortalError::Forbidden(_))));
    }

    #[test]
    fn short_password_is_rejected() {
        let mut req = signup(Role::Admin);
        req.password = "abc".into();
        assert!(matches!(req.validate(), Err(PortalError::Validation(_))));
    }

    #[test]
    fn missing_name_is_rejected() {
        let mut req = signup(Role::Vendor);
        req.full_name = "   ".into();
        assert!(matches!(req.validate(), Err(PortalError::Validation(_))));
    }
}
