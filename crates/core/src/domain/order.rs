use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::article::ArticleId;
use crate::domain::department::DepartmentId;
use crate::domain::shipment::ShipmentBatchId;
use crate::domain::supplier::SupplierId;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLineId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Complete,
    Sent,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Complete => "COMPLETE",
            Self::Sent => "SENT",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(Self::Draft),
            "COMPLETE" => Some(Self::Complete),
            "SENT" => Some(Self::Sent),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub department_id: DepartmentId,
    pub creator_id: UserId,
    pub approver_id: Option<UserId>,
    pub status: OrderStatus,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_notes: Option<String>,
    pub additional_articles: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self.status, next),
            (OrderStatus::Draft, OrderStatus::Complete)
                | (OrderStatus::Complete, OrderStatus::Sent)
                | (OrderStatus::Draft, OrderStatus::Cancelled)
                | (OrderStatus::Complete, OrderStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::conflict(format!(
                "order cannot move from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub article_id: ArticleId,
    /// Resolved supplier, or `None` while the line awaits manual assignment.
    pub supplier_id: Option<SupplierId>,
    pub shipment_batch_id: Option<ShipmentBatchId>,
    pub quantity: Decimal,
    pub note: Option<String>,
}

pub fn ensure_positive_quantity(quantity: Decimal) -> Result<(), DomainError> {
    if quantity <= Decimal::ZERO {
        return Err(DomainError::validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{ensure_positive_quantity, Order, OrderId, OrderStatus};
    use crate::domain::department::DepartmentId;
    use crate::domain::user::UserId;
    use crate::errors::DomainError;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId("ord-1".to_string()),
            department_id: DepartmentId("dep-kitchen".to_string()),
            creator_id: UserId("usr-1".to_string()),
            approver_id: None,
            status,
            delivery_date: None,
            delivery_notes: None,
            additional_articles: None,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn draft_completes_and_completed_is_sent() {
        let mut order = order(OrderStatus::Draft);
        order.transition_to(OrderStatus::Complete).expect("draft -> complete");
        order.transition_to(OrderStatus::Sent).expect("complete -> sent");
        assert_eq!(order.status, OrderStatus::Sent);
    }

    #[test]
    fn completed_order_never_returns_to_draft() {
        let mut order = order(OrderStatus::Complete);
        assert!(!order.can_transition_to(OrderStatus::Draft));
        assert!(matches!(
            order.transition_to(OrderStatus::Draft),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn cancellation_is_reachable_from_draft_and_complete_only() {
        assert!(order(OrderStatus::Draft).can_transition_to(OrderStatus::Cancelled));
        assert!(order(OrderStatus::Complete).can_transition_to(OrderStatus::Cancelled));
        assert!(!order(OrderStatus::Sent).can_transition_to(OrderStatus::Cancelled));
        assert!(!order(OrderStatus::Cancelled).can_transition_to(OrderStatus::Draft));
    }

    #[test]
    fn terminal_states_are_sent_and_cancelled() {
        assert!(OrderStatus::Sent.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Draft.is_terminal());
        assert!(!OrderStatus::Complete.is_terminal());
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        assert!(ensure_positive_quantity(Decimal::new(15, 1)).is_ok());
        assert!(matches!(
            ensure_positive_quantity(Decimal::ZERO),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            ensure_positive_quantity(Decimal::new(-5, 1)),
            Err(DomainError::Validation(_))
        ));
    }
}
