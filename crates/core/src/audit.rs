use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    OrderCreated,
    OrderCompleted,
    OrderSent,
    OrderCancelled,
    LineAdded,
    LineUpdated,
    LineRemoved,
    SupplierAssigned,
    BatchReleased,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderCreated => "ORDER_CREATED",
            Self::OrderCompleted => "ORDER_COMPLETED",
            Self::OrderSent => "ORDER_SENT",
            Self::OrderCancelled => "ORDER_CANCELLED",
            Self::LineAdded => "LINE_ADDED",
            Self::LineUpdated => "LINE_UPDATED",
            Self::LineRemoved => "LINE_REMOVED",
            Self::SupplierAssigned => "SUPPLIER_ASSIGNED",
            Self::BatchReleased => "BATCH_RELEASED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ORDER_CREATED" => Some(Self::OrderCreated),
            "ORDER_COMPLETED" => Some(Self::OrderCompleted),
            "ORDER_SENT" => Some(Self::OrderSent),
            "ORDER_CANCELLED" => Some(Self::OrderCancelled),
            "LINE_ADDED" => Some(Self::LineAdded),
            "LINE_UPDATED" => Some(Self::LineUpdated),
            "LINE_REMOVED" => Some(Self::LineRemoved),
            "SUPPLIER_ASSIGNED" => Some(Self::SupplierAssigned),
            "BATCH_RELEASED" => Some(Self::BatchReleased),
            _ => None,
        }
    }

    /// Lifecycle milestones; line-level edits are minor events.
    pub fn is_major_event(&self) -> bool {
        matches!(
            self,
            Self::OrderCreated
                | Self::OrderCompleted
                | Self::OrderSent
                | Self::OrderCancelled
                | Self::BatchReleased
        )
    }
}

/// One append-only activity entry. Records are written in the same
/// transaction as the mutation they describe; they are never updated or
/// deleted afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: UserId,
    pub kind: ActivityKind,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub details: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        user_id: UserId,
        kind: ActivityKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            user_id,
            kind,
            description: description.into(),
            old_value: None,
            new_value: None,
            details: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_change(mut self, old_value: impl Into<String>, new_value: impl Into<String>) -> Self {
        self.old_value = Some(old_value.into());
        self.new_value = Some(new_value.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
