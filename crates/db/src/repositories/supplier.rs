use std::collections::HashSet;

use uuid::Uuid;

use pantry_core::domain::supplier::{DeliveryDayRule, Supplier, SupplierId, Weekday};
use pantry_core::domain::user::UserId;

use super::{RepositoryError, SupplierRepository};
use crate::rows::{supplier_from_row, weekday_from_str};
use crate::DbPool;

pub struct SqlSupplierRepository {
    pool: DbPool,
}

impl SqlSupplierRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SupplierRepository for SqlSupplierRepository {
    async fn find_by_id(&self, id: &SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, fixed_delivery_days, active FROM supplier WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(supplier_from_row).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Supplier>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, email, phone, fixed_delivery_days, active
             FROM supplier WHERE active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(supplier_from_row).collect()
    }

    async fn save(&self, supplier: Supplier) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO supplier (id, name, email, phone, fixed_delivery_days, active)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 phone = excluded.phone,
                 fixed_delivery_days = excluded.fixed_delivery_days,
                 active = excluded.active",
        )
        .bind(&supplier.id.0)
        .bind(&supplier.name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(i64::from(supplier.fixed_delivery_days))
        .bind(i64::from(supplier.active))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delivery_weekdays(
        &self,
        supplier_id: &SupplierId,
    ) -> Result<HashSet<Weekday>, RepositoryError> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT weekday FROM delivery_day_rule WHERE supplier_id = ?")
                .bind(&supplier_id.0)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(|value| weekday_from_str(value)).collect()
    }

    async fn save_delivery_day(&self, rule: DeliveryDayRule) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO delivery_day_rule (id, supplier_id, weekday)
             VALUES (?, ?, ?)
             ON CONFLICT(supplier_id, weekday) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&rule.supplier_id.0)
        .bind(rule.weekday.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_grant(
        &self,
        user_id: &UserId,
        supplier_id: &SupplierId,
    ) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM supplier_grant WHERE user_id = ? AND supplier_id = ?)",
        )
        .bind(&user_id.0)
        .bind(&supplier_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists == 1)
    }

    async fn save_grant(
        &self,
        user_id: &UserId,
        supplier_id: &SupplierId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO supplier_grant (user_id, supplier_id)
             VALUES (?, ?)
             ON CONFLICT(user_id, supplier_id) DO NOTHING",
        )
        .bind(&user_id.0)
        .bind(&supplier_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn granted_suppliers(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SupplierId>, RepositoryError> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT supplier_id FROM supplier_grant WHERE user_id = ?")
                .bind(&user_id.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(SupplierId).collect())
    }
}
