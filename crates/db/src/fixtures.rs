use sqlx::Executor;

use crate::repositories::RepositoryError;
use crate::DbPool;

const SEED_DEPARTMENT_IDS: &[&str] =
    &["dep-restaurant", "dep-kitchen", "dep-pastry", "dep-service", "dep-bar"];

const SEED_USER_IDS: &[&str] = &["usr-admin", "usr-approver", "usr-kitchen"];

const SEED_SUPPLIER_IDS: &[&str] = &["sup-greens", "sup-dry"];

const SEED_ARTICLE_IDS: &[&str] = &["art-flour", "art-chanterelle", "art-oil"];

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub departments: usize,
    pub users: usize,
    pub suppliers: usize,
    pub articles: usize,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Demo dataset for local development and smoke checks.
///
/// Covers the department tree (root, two levels below), the three roles, and
/// articles linked to one, zero and two suppliers respectively so routing
/// exercises every branch.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &'static str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Load the dataset in one transaction.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            departments: SEED_DEPARTMENT_IDS.len(),
            users: SEED_USER_IDS.len(),
            suppliers: SEED_SUPPLIER_IDS.len(),
            articles: SEED_ARTICLE_IDS.len(),
        })
    }

    /// Verify that the dataset is present and complete.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for (label, table, ids) in [
            ("departments", "department", SEED_DEPARTMENT_IDS),
            ("users", "app_user", SEED_USER_IDS),
            ("suppliers", "supplier", SEED_SUPPLIER_IDS),
            ("articles", "article", SEED_ARTICLE_IDS),
        ] {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!("SELECT COUNT(*) FROM {table} WHERE id IN ({placeholders})");
            let mut query = sqlx::query_scalar::<_, i64>(&sql);
            for id in ids {
                query = query.bind(*id);
            }
            let count = query.fetch_one(pool).await?;
            checks.push((label, count == ids.len() as i64));
        }

        let link_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM article_supplier_link WHERE article_id = 'art-oil'")
                .fetch_one(pool)
                .await?;
        checks.push(("ambiguous-article-links", link_count == 2));

        let rule_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_day_rule WHERE supplier_id = 'sup-greens'",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("delivery-day-rules", rule_count == 2));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}
