use pantry_core::domain::order::OrderLine;
use pantry_core::domain::shipment::{ShipmentBatch, ShipmentBatchId};
use pantry_core::domain::supplier::SupplierId;

use super::{RepositoryError, ShipmentRepository};
use crate::rows::{batch_from_row, line_from_row};
use crate::DbPool;

const BATCH_COLUMNS: &str = "id, supplier_id, delivery_date, status, sender_id, sent_at";

pub struct SqlShipmentRepository {
    pool: DbPool,
}

impl SqlShipmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ShipmentRepository for SqlShipmentRepository {
    async fn find_by_id(
        &self,
        id: &ShipmentBatchId,
    ) -> Result<Option<ShipmentBatch>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BATCH_COLUMNS} FROM shipment_batch WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(batch_from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<ShipmentBatch>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BATCH_COLUMNS} FROM shipment_batch ORDER BY delivery_date IS NULL, delivery_date"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(batch_from_row).collect()
    }

    async fn list_for_suppliers(
        &self,
        suppliers: &[SupplierId],
    ) -> Result<Vec<ShipmentBatch>, RepositoryError> {
        if suppliers.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; suppliers.len()].join(", ");
        let sql = format!(
            "SELECT {BATCH_COLUMNS} FROM shipment_batch
             WHERE supplier_id IN ({placeholders})
             ORDER BY delivery_date IS NULL, delivery_date"
        );
        let mut query = sqlx::query(&sql);
        for supplier in suppliers {
            query = query.bind(&supplier.0);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(batch_from_row).collect()
    }

    async fn lines_in_batch(
        &self,
        id: &ShipmentBatchId,
    ) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, order_id, article_id, supplier_id, shipment_batch_id, quantity, note
             FROM order_line WHERE shipment_batch_id = ?",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(line_from_row).collect()
    }
}
