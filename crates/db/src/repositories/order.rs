use pantry_core::domain::department::DepartmentId;
use pantry_core::domain::order::{Order, OrderId, OrderLine, OrderLineId};

use super::{OrderRepository, RepositoryError};
use crate::rows::{line_from_row, order_from_row};
use crate::DbPool;

const ORDER_COLUMNS: &str = "id, department_id, creator_id, approver_id, status, delivery_date,
    delivery_notes, additional_articles, active, created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, order_id, article_id, supplier_id, shipment_batch_id, quantity, note";

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE active = 1 ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn list_for_departments(
        &self,
        departments: &[DepartmentId],
    ) -> Result<Vec<Order>, RepositoryError> {
        if departments.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; departments.len()].join(", ");
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE active = 1 AND department_id IN ({placeholders})
             ORDER BY created_at DESC"
        );
        let mut query = sqlx::query(&sql);
        for department in departments {
            query = query.bind(&department.0);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn lines_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_COLUMNS} FROM order_line WHERE order_id = ?"
        ))
        .bind(&order_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(line_from_row).collect()
    }

    async fn find_line(&self, id: &OrderLineId) -> Result<Option<OrderLine>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {LINE_COLUMNS} FROM order_line WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(line_from_row).transpose()
    }
}
