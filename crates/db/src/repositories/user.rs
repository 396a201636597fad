use pantry_core::domain::user::{User, UserId};

use super::{RepositoryError, UserRepository};
use crate::rows::user_from_row;
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, name, role, department_id, active FROM app_user WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO app_user (id, name, role, department_id, active)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 role = excluded.role,
                 department_id = excluded.department_id,
                 active = excluded.active",
        )
        .bind(&user.id.0)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.department_id.0)
        .bind(i64::from(user.active))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
