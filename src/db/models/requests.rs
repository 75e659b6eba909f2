// src/db/models/requests.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::user::Role;
use crate::error::{PortalError, PortalResult};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A super user's verdict on a pending account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl ApprovalDecision {
    pub fn outcome(self) -> ApprovalStatus {
        match self {
            ApprovalDecision::Approve => ApprovalStatus::Approved,
            ApprovalDecision::Reject => ApprovalStatus::Rejected,
        }
    }

    /// Reviewed requests are final.
    pub fn check(self, current: ApprovalStatus) -> PortalResult<ApprovalStatus> {
        if current != ApprovalStatus::Pending {
            return Err(PortalError::Conflict("Approval request is not pending".into()));
        }
        Ok(self.outcome())
    }

    /// Only an approval unlocks the account's role row.
    pub fn unlocks_account(self) -> bool {
        self == ApprovalDecision::Approve
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow, ToSchema)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub full_name: String,
    pub email: String,
    pub status: ApprovalStatus,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ApprovalFilter {
    pub status: Option<ApprovalStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_requests_can_be_decided() {
        assert_eq!(
            ApprovalDecision::Approve.check(ApprovalStatus::Pending).unwrap(),
            ApprovalStatus::Approved
        );
        assert_eq!(
            ApprovalDecision::Reject.check(ApprovalStatus::Pending).unwrap(),
            ApprovalStatus::Rejected
        );
    }

    #[test]
    fn reviewed_requests_are_final() {
        for current in [ApprovalStatus::Approved, ApprovalStatus::Rejected] {
            assert!(matches!(
                ApprovalDecision::Approve.check(current),
                Err(PortalError::Conflict(_))
            ));
            assert!(matches!(
                ApprovalDecision::Reject.check(current),
                Err(PortalError::Conflict(_))
            ));
        }
    }

    #[test]
    fn rejection_leaves_the_account_locked() {
        assert!(ApprovalDecision::Approve.unlocks_account());
        assert!(!ApprovalDecision::Reject.unlocks_account());
    }
}
