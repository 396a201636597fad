//! Shipment batch release: one Open batch leaves as a consignment, and
//! completed orders whose lines are all shipped flip to Sent in the same
//! transaction.

use chrono::Utc;
use tracing::info;

use pantry_core::audit::{ActivityKind, ActivityRecord};
use pantry_core::domain::order::OrderStatus;
use pantry_core::domain::shipment::{ShipmentBatch, ShipmentBatchId, ShipmentStatus};
use pantry_core::domain::user::{Role, User};
use pantry_core::errors::DomainError;
use pantry_db::repositories::{
    ShipmentRepository, SqlShipmentRepository, SqlSupplierRepository, SupplierRepository,
};
use pantry_db::DbPool;

use crate::error::{from_domain, ServiceError};
use crate::store;

pub struct ShipmentService {
    pool: DbPool,
}

impl ShipmentService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Release an Open batch: Open -> Sent, stamping sender and send time.
    /// Requires Admin or a grant for the batch's supplier. A delivery date
    /// in the past blocks the release.
    pub async fn release(
        &self,
        caller: &User,
        batch_id: &ShipmentBatchId,
    ) -> Result<ShipmentBatch, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut batch = store::fetch_batch(&mut tx, batch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("shipment batch", batch_id.0.clone()))?;
        if batch.status != ShipmentStatus::Open {
            return Err(DomainError::conflict(format!(
                "shipment batch is {} and cannot be released",
                batch.status.as_str()
            ))
            .into());
        }
        let today = Utc::now().date_naive();
        if let Some(date) = batch.delivery_date {
            if date < today {
                return Err(DomainError::conflict(format!(
                    "delivery date {date} is in the past"
                ))
                .into());
            }
        }
        if caller.role != Role::Admin
            && !store::has_supplier_grant(&mut tx, &caller.id, &batch.supplier_id).await?
        {
            return Err(DomainError::forbidden(format!(
                "no release grant for supplier `{}`",
                batch.supplier_id.0
            ))
            .into());
        }

        from_domain(batch.transition_to(ShipmentStatus::Sent))?;
        batch.sender_id = Some(caller.id.clone());
        batch.sent_at = Some(Utc::now());
        store::update_batch(&mut tx, &batch).await?;

        // Orders fully covered by sent batches leave Complete now.
        let shipped_orders = store::complete_orders_fully_sent(&mut tx, &batch.id).await?;
        for mut order in shipped_orders {
            from_domain(order.transition_to(OrderStatus::Sent))?;
            order.updated_at = Some(Utc::now());
            store::update_order(&mut tx, &order).await?;
            store::insert_activity(
                &mut tx,
                &ActivityRecord::new(
                    "order",
                    order.id.0.clone(),
                    caller.id.clone(),
                    ActivityKind::OrderSent,
                    format!("all lines shipped; released with batch `{}`", batch.id.0),
                ),
            )
            .await?;
        }

        store::insert_activity(
            &mut tx,
            &ActivityRecord::new(
                "shipment_batch",
                batch.id.0.clone(),
                caller.id.clone(),
                ActivityKind::BatchReleased,
                format!("batch released for supplier `{}`", batch.supplier_id.0),
            ),
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "orders.batch.released",
            batch_id = %batch.id.0,
            supplier_id = %batch.supplier_id.0,
            "shipment batch released"
        );
        Ok(batch)
    }

    /// Batches the caller may see: everything for admins, otherwise only
    /// batches of suppliers the caller holds grants for.
    pub async fn list(&self, caller: &User) -> Result<Vec<ShipmentBatch>, ServiceError> {
        let shipments = SqlShipmentRepository::new(self.pool.clone());
        if caller.role == Role::Admin {
            return Ok(shipments.list_all().await?);
        }
        let granted =
            SqlSupplierRepository::new(self.pool.clone()).granted_suppliers(&caller.id).await?;
        Ok(shipments.list_for_suppliers(&granted).await?)
    }

    pub async fn get(
        &self,
        caller: &User,
        batch_id: &ShipmentBatchId,
    ) -> Result<ShipmentBatch, ServiceError> {
        let shipments = SqlShipmentRepository::new(self.pool.clone());
        let batch = shipments
            .find_by_id(batch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("shipment batch", batch_id.0.clone()))?;
        if caller.role != Role::Admin {
            let suppliers = SqlSupplierRepository::new(self.pool.clone());
            if !suppliers.has_grant(&caller.id, &batch.supplier_id).await? {
                return Err(DomainError::forbidden(format!(
                    "no grant for supplier `{}`",
                    batch.supplier_id.0
                ))
                .into());
            }
        }
        Ok(batch)
    }
}
