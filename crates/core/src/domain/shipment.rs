use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::supplier::SupplierId;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipmentBatchId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Open,
    Sent,
    Cancelled,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Sent => "SENT",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(Self::Open),
            "SENT" => Some(Self::Sent),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Groups order lines across all orders that share a resolved supplier and
/// an effective delivery date. Batches are created lazily by the router and
/// kept forever as historical groupings, even when every line is removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentBatch {
    pub id: ShipmentBatchId,
    pub supplier_id: SupplierId,
    /// `None` for suppliers without fixed delivery days on orders that did
    /// not specify a date; resolved manually downstream.
    pub delivery_date: Option<NaiveDate>,
    pub status: ShipmentStatus,
    pub sender_id: Option<UserId>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl ShipmentBatch {
    pub fn can_transition_to(&self, next: ShipmentStatus) -> bool {
        matches!(
            (self.status, next),
            (ShipmentStatus::Open, ShipmentStatus::Sent)
                | (ShipmentStatus::Open, ShipmentStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: ShipmentStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::conflict(format!(
                "shipment batch cannot move from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ShipmentBatch, ShipmentBatchId, ShipmentStatus};
    use crate::domain::supplier::SupplierId;
    use crate::errors::DomainError;

    fn batch(status: ShipmentStatus) -> ShipmentBatch {
        ShipmentBatch {
            id: ShipmentBatchId("shp-1".to_string()),
            supplier_id: SupplierId("sup-1".to_string()),
            delivery_date: None,
            status,
            sender_id: None,
            sent_at: None,
        }
    }

    #[test]
    fn open_batch_can_be_sent_once() {
        let mut batch = batch(ShipmentStatus::Open);
        batch.transition_to(ShipmentStatus::Sent).expect("open -> sent");
        assert!(matches!(
            batch.transition_to(ShipmentStatus::Sent),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn sent_batch_never_reopens() {
        let batch = batch(ShipmentStatus::Sent);
        assert!(!batch.can_transition_to(ShipmentStatus::Open));
        assert!(!batch.can_transition_to(ShipmentStatus::Cancelled));
    }
}
