// src/db/models/service.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::catalog;
use crate::db::models::user::Role;
use crate::error::{PortalError, PortalResult};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
}

impl RequestStatus {
    fn rank(self) -> u8 {
        match self {
            RequestStatus::Pending => 0,
            RequestStatus::InProgress => 1,
            RequestStatus::Completed => 2,
        }
    }

    /// `pending` is only ever an initial status.
    pub fn check_target(to: RequestStatus) -> PortalResult<()> {
        if to == RequestStatus::Pending {
            return Err(PortalError::Validation(
                "A request cannot be moved back to pending".into(),
            ));
        }
        Ok(())
    }

    /// Status only moves forward; skipping `in-progress` is allowed.
    pub fn check_transition(self, to: RequestStatus) -> PortalResult<()> {
        Self::check_target(to)?;
        if to.rank() <= self.rank() {
            return Err(PortalError::InvalidTransition { from: self, to });
        }
        Ok(())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in-progress",
            RequestStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three kinds of service request a student can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Cleaning,
    Appliance,
    StoreOrder,
}

impl ServiceKind {
    pub fn table(self) -> &'static str {
        match self {
            ServiceKind::Cleaning => "cleaning_requests",
            ServiceKind::Appliance => "appliance_complaints",
            ServiceKind::StoreOrder => "store_orders",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::Cleaning => "Cleaning request",
            ServiceKind::Appliance => "Appliance complaint",
            ServiceKind::StoreOrder => "Store order",
        }
    }

    /// Role allowed to move this kind of request through its statuses.
    pub fn manager(self) -> Role {
        match self {
            ServiceKind::Cleaning | ServiceKind::Appliance => Role::Admin,
            ServiceKind::StoreOrder => Role::Vendor,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct CleaningRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_name: String,
    pub hostel_block: String,
    pub room_number: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: String,
    pub notes: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct ApplianceComplaint {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_name: String,
    pub hostel_block: String,
    pub room_number: String,
    pub appliance: String,
    pub description: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct OrderItem {
    pub name: String,
    pub quantity: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct StoreOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_name: String,
    pub hostel_block: String,
    pub room_number: String,
    pub category: String,
    #[schema(value_type = Vec<OrderItem>)]
    pub items: Json<Vec<OrderItem>>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields shared by every student submission.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Location {
    /// Defaults to the submitting student's profile name.
    pub student_name: Option<String>,
    #[serde(default)]
    pub hostel_block: String,
    #[serde(default)]
    pub room_number: String,
}

impl Location {
    fn validate(&mut self) -> PortalResult<()> {
        self.student_name = self
            .student_name
            .take()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        self.hostel_block = required(&self.hostel_block, "Hostel block")?;
        if !catalog::is_hostel_block(&self.hostel_block) {
            return Err(PortalError::Validation(format!(
                "Unknown hostel block: {}",
                self.hostel_block
            )));
        }
        self.room_number = required(&self.room_number, "Room number")?;
        Ok(())
    }

    pub fn needs_student_name(&self) -> bool {
        self.student_name.is_none()
    }

    /// Falls back to the profile name when the form left it blank.
    pub fn resolve_student_name(&mut self, profile_name: &str) -> PortalResult<()> {
        if self.student_name.is_none() {
            let name = required(profile_name, "Student name")?;
            self.student_name = Some(name);
        }
        Ok(())
    }

    pub fn student_name(&self) -> &str {
        self.student_name.as_deref().unwrap_or_default()
    }
}

fn required(value: &str, field: &str) -> PortalResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PortalError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct NewCleaningRequest {
    #[serde(flatten)]
    pub location: Location,
    pub preferred_date: Option<NaiveDate>,
    #[serde(default)]
    pub preferred_time: String,
    #[serde(default)]
    pub notes: String,
}

impl NewCleaningRequest {
    pub fn validate(&mut self, today: NaiveDate) -> PortalResult<()> {
        self.location.validate()?;
        match self.preferred_date {
            None => return Err(PortalError::Validation("Preferred date is required".into())),
            Some(date) if date < today => {
                return Err(PortalError::Validation(
                    "Preferred date cannot be in the past".into(),
                ))
            }
            Some(_) => {}
        }
        self.preferred_time = required(&self.preferred_time, "Preferred time")?;
        if !catalog::is_time_slot(&self.preferred_time) {
            return Err(PortalError::Validation(format!(
                "Unknown time slot: {}",
                self.preferred_time
            )));
        }
        self.notes = self.notes.trim().to_string();
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct NewApplianceComplaint {
    #[serde(flatten)]
    pub location: Location,
    #[serde(default)]
    pub appliance: String,
    #[serde(default)]
    pub description: String,
}

impl NewApplianceComplaint {
    pub fn validate(&mut self) -> PortalResult<()> {
        self.location.validate()?;
        self.appliance = required(&self.appliance, "Appliance")?;
        if !catalog::is_appliance(&self.appliance) {
            return Err(PortalError::Validation(format!(
                "Unknown appliance: {}",
                self.appliance
            )));
        }
        self.description = required(&self.description, "Description")?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct NewStoreOrder {
    #[serde(flatten)]
    pub location: Location,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl NewStoreOrder {
    /// Also folds repeated items into a single line.
    pub fn validate(&mut self) -> PortalResult<()> {
        self.location.validate()?;
        let category = catalog::store_category(self.category.trim()).ok_or_else(|| {
            PortalError::Validation(format!("Unknown store category: {}", self.category))
        })?;
        self.category = category.name.to_string();

        if self.items.is_empty() {
            return Err(PortalError::Validation("Please add items to your order".into()));
        }

        let mut merged: Vec<OrderItem> = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            let name = item.name.trim();
            if item.quantity < 1 {
                return Err(PortalError::Validation(format!(
                    "Quantity for {} must be at least 1",
                    name
                )));
            }
            if !category.has_item(name) {
                return Err(PortalError::Validation(format!(
                    "{} is not sold under {}",
                    name, category.name
                )));
            }
            match merged.iter_mut().find(|m| m.name == name) {
                Some(existing) => {
                    existing.quantity =
                        existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                            PortalError::Validation(format!("Quantity for {} is too large", name))
                        })?;
                }
                None => merged.push(OrderItem { name: name.to_string(), quantity: item.quantity }),
            }
        }
        self.items = merged;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, ToSchema)]
pub struct StatusUpdate {
    pub status: RequestStatus,
}

/// Everything a dashboard shows, reloaded after every mutation.
#[derive(Serialize, Deserialize, Debug, Default, ToSchema)]
pub struct PortalData {
    pub cleaning_requests: Vec<CleaningRequest>,
    pub appliance_complaints: Vec<ApplianceComplaint>,
    pub store_orders: Vec<StoreOrder>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct StatusCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub total: i64,
}

impl StatusCounts {
    pub fn from_statuses(statuses: impl IntoIterator<Item = RequestStatus>) -> Self {
        let mut counts = StatusCounts::default();
        for status in statuses {
            match status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::InProgress => counts.in_progress += 1,
                RequestStatus::Completed => counts.completed += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

#[derive(Serialize, Deserialize, Debug, Default, ToSchema)]
pub struct DashboardStats {
    pub cleaning_requests: StatusCounts,
    pub appliance_complaints: StatusCounts,
    pub store_orders: StatusCounts,
}

impl PortalData {
    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            cleaning_requests: StatusCounts::from_statuses(
                self.cleaning_requests.iter().map(|r| r.status),
            ),
            appliance_complaints: StatusCounts::from_statuses(
                self.appliance_complaints.iter().map(|c| c.status),
            ),
            store_orders: StatusCounts::from_statuses(self.store_orders.iter().map(|o| o.status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 13).unwrap()
    }

    fn location(block: &str, room: &str) -> Location {
        Location {
            student_name: None,
            hostel_block: block.into(),
            room_number: room.into(),
        }
    }

    #[test]
    fn status_moves_forward_only() {
        use RequestStatus::*;
        assert!(Pending.check_transition(InProgress).is_ok());
        assert!(Pending.check_transition(Completed).is_ok());
        assert!(InProgress.check_transition(Completed).is_ok());

        assert!(matches!(
            Completed.check_transition(InProgress),
            Err(PortalError::InvalidTransition { from: Completed, to: InProgress })
        ));
        assert!(matches!(
            InProgress.check_transition(InProgress),
            Err(PortalError::InvalidTransition { .. })
        ));
        assert!(matches!(
            Completed.check_transition(Pending),
            Err(PortalError::Validation(_))
        ));
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_string(&RequestStatus::InProgress).unwrap(), "\"in-progress\"");
        let parsed: StatusUpdate = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(parsed.status, RequestStatus::Completed);
        assert!(serde_json::from_str::<StatusUpdate>(r#"{"status":"cancelled"}"#).is_err());
    }

    #[test]
    fn managers_per_kind() {
        assert_eq!(ServiceKind::Cleaning.manager(), Role::Admin);
        assert_eq!(ServiceKind::Appliance.manager(), Role::Admin);
        assert_eq!(ServiceKind::StoreOrder.manager(), Role::Vendor);
    }

    #[test]
    fn cleaning_request_scenario_is_accepted() {
        let mut req: NewCleaningRequest = serde_json::from_value(serde_json::json!({
            "hostel_block": "Block A",
            "room_number": "304",
            "preferred_date": "2026-01-14",
            "preferred_time": "10:00 AM"
        }))
        .unwrap();
        req.validate(today()).unwrap();
        assert!(req.location.needs_student_name());
        req.location.resolve_student_name("Rahul Sharma").unwrap();
        assert_eq!(req.location.student_name(), "Rahul Sharma");
        assert_eq!(req.notes, "");
    }

    #[test]
    fn cleaning_request_requires_date_and_known_slot() {
        let mut req = NewCleaningRequest {
            location: location("Block A", "304"),
            preferred_date: None,
            preferred_time: "10:00 AM".into(),
            notes: String::new(),
        };
        assert!(matches!(req.validate(today()), Err(PortalError::Validation(_))));

        req.preferred_date = Some(today());
        req.preferred_time = "01:00 AM".into();
        assert!(matches!(req.validate(today()), Err(PortalError::Validation(_))));
    }

    #[test]
    fn cleaning_request_in_the_past_is_rejected() {
        let mut req = NewCleaningRequest {
            location: location("Block B", "205"),
            preferred_date: NaiveDate::from_ymd_opt(2026, 1, 12),
            preferred_time: "02:00 PM".into(),
            notes: "Bathroom too".into(),
        };
        let err = req.validate(today()).unwrap_err();
        assert_eq!(err.to_string(), "Preferred date cannot be in the past");
    }

    #[test]
    fn typed_student_name_wins_over_profile() {
        let mut loc = Location {
            student_name: Some("  Priya Patel ".into()),
            hostel_block: "Block B".into(),
            room_number: "205".into(),
        };
        loc.validate().unwrap();
        loc.resolve_student_name("Someone Else").unwrap();
        assert_eq!(loc.student_name(), "Priya Patel");

        let mut blank = location("Block B", "205");
        blank.validate().unwrap();
        assert!(matches!(blank.resolve_student_name("  "), Err(PortalError::Validation(_))));
    }

    #[test]
    fn blank_room_is_rejected() {
        let mut req = NewApplianceComplaint {
            location: location("Block A", "   "),
            appliance: "AC".into(),
            description: "Not cooling".into(),
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.to_string(), "Room number is required");
    }

    #[test]
    fn appliance_must_be_listed() {
        let mut req = NewApplianceComplaint {
            location: location("Block C", "401"),
            appliance: "Microwave".into(),
            description: "Broken".into(),
        };
        assert!(matches!(req.validate(), Err(PortalError::Validation(_))));
    }

    #[test]
    fn store_order_merges_repeated_items() {
        let mut order = NewStoreOrder {
            location: location("Block B", "203"),
            category: "Stationery".into(),
            items: vec![
                OrderItem { name: "Sticky Notes".into(), quantity: 1 },
                OrderItem { name: "Stapler".into(), quantity: 1 },
                OrderItem { name: "Sticky Notes".into(), quantity: 2 },
            ],
        };
        order.validate().unwrap();
        assert_eq!(
            order.items,
            vec![
                OrderItem { name: "Sticky Notes".into(), quantity: 3 },
                OrderItem { name: "Stapler".into(), quantity: 1 },
            ]
        );
    }

    #[test]
    fn merged_quantity_that_overflows_is_rejected() {
        let mut order = NewStoreOrder {
            location: location("Block B", "203"),
            category: "Stationery".into(),
            items: vec![
                OrderItem { name: "Stapler".into(), quantity: i32::MAX },
                OrderItem { name: "Stapler".into(), quantity: 1 },
            ],
        };
        assert!(matches!(order.validate(), Err(PortalError::Validation(_))));
    }

    #[test]
    fn store_order_rejects_empty_cart_and_foreign_items() {
        let mut order = NewStoreOrder {
            location: location("Block A", "105"),
            category: "Fruits".into(),
            items: vec![],
        };
        assert!(matches!(order.validate(), Err(PortalError::Validation(_))));

        order.items = vec![OrderItem { name: "Stapler".into(), quantity: 1 }];
        assert!(matches!(order.validate(), Err(PortalError::Validation(_))));

        order.items = vec![OrderItem { name: "Mixed Fruit Bowl".into(), quantity: 0 }];
        assert!(matches!(order.validate(), Err(PortalError::Validation(_))));
    }

    #[test]
    fn counts_by_status() {
        use RequestStatus::*;
        let counts = StatusCounts::from_statuses([Pending, Completed, Pending, InProgress]);
        assert_eq!(
            counts,
            StatusCounts { pending: 2, in_progress: 1, completed: 1, total: 4 }
        );
    }
}
