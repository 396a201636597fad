use pantry_core::audit::ActivityRecord;

use super::{ActivityRepository, RepositoryError};
use crate::rows::activity_from_row;
use crate::DbPool;

pub struct SqlActivityRepository {
    pool: DbPool,
}

impl SqlActivityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ActivityRepository for SqlActivityRepository {
    async fn append(&self, record: ActivityRecord) -> Result<(), RepositoryError> {
        let details = record
            .details
            .as_ref()
            .map(|value| {
                serde_json::to_string(value)
                    .map_err(|error| RepositoryError::Decode(format!("details: {error}")))
            })
            .transpose()?;
        sqlx::query(
            "INSERT INTO activity_log
                 (id, entity_type, entity_id, user_id, kind, description,
                  old_value, new_value, details, major_event, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.entity_type)
        .bind(&record.entity_id)
        .bind(&record.user_id.0)
        .bind(record.kind.as_str())
        .bind(&record.description)
        .bind(&record.old_value)
        .bind(&record.new_value)
        .bind(details)
        .bind(i64::from(record.kind.is_major_event()))
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<ActivityRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, entity_type, entity_id, user_id, kind, description,
                    old_value, new_value, details, major_event, recorded_at
             FROM activity_log
             WHERE entity_type = ? AND entity_id = ?
             ORDER BY recorded_at ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(activity_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use pantry_core::audit::{ActivityKind, ActivityRecord};
    use pantry_core::domain::user::UserId;

    use super::SqlActivityRepository;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::ActivityRepository;

    #[tokio::test]
    async fn appended_records_come_back_in_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlActivityRepository::new(pool);

        let user = UserId("usr-1".to_string());
        let created = ActivityRecord::new(
            "order",
            "ord-1",
            user.clone(),
            ActivityKind::OrderCreated,
            "order created",
        );
        let mut updated = ActivityRecord::new(
            "order",
            "ord-1",
            user.clone(),
            ActivityKind::LineUpdated,
            "quantity changed",
        )
        .with_change("5", "7.5")
        .with_details(serde_json::json!({"line_id": "lin-1"}));
        updated.recorded_at = created.recorded_at + chrono::Duration::seconds(1);

        repo.append(created.clone()).await.expect("append created");
        repo.append(updated.clone()).await.expect("append updated");

        let listed = repo.list_for_entity("order", "ord-1").await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].kind, ActivityKind::OrderCreated);
        assert_eq!(listed[1].old_value.as_deref(), Some("5"));
        assert_eq!(listed[1].details, updated.details);

        let other = repo.list_for_entity("order", "ord-2").await.expect("list other");
        assert!(other.is_empty());
    }
}
