use pantry_core::domain::department::{Department, DepartmentId};

use super::{DepartmentRepository, RepositoryError};
use crate::rows::department_from_row;
use crate::DbPool;

pub struct SqlDepartmentRepository {
    pool: DbPool,
}

impl SqlDepartmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DepartmentRepository for SqlDepartmentRepository {
    async fn find_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, parent_id, active FROM department WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(department_from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Department>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, parent_id, active FROM department ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(department_from_row).collect()
    }

    async fn save(&self, department: Department) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO department (id, name, parent_id, active)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 parent_id = excluded.parent_id,
                 active = excluded.active",
        )
        .bind(&department.id.0)
        .bind(&department.name)
        .bind(department.parent_id.as_ref().map(|id| id.0.clone()))
        .bind(i64::from(department.active))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
