use pantry_core::domain::article::{Article, ArticleId, ArticleSupplierLink};

use super::{ArticleRepository, RepositoryError};
use crate::rows::{article_from_row, link_from_row};
use crate::DbPool;

pub struct SqlArticleRepository {
    pool: DbPool,
}

impl SqlArticleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ArticleRepository for SqlArticleRepository {
    async fn find_by_id(&self, id: &ArticleId) -> Result<Option<Article>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, unit, notes, active FROM article WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn save(&self, article: Article) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO article (id, name, unit, notes, active)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 unit = excluded.unit,
                 notes = excluded.notes,
                 active = excluded.active",
        )
        .bind(&article.id.0)
        .bind(&article.name)
        .bind(&article.unit)
        .bind(&article.notes)
        .bind(i64::from(article.active))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn links_for_article(
        &self,
        article_id: &ArticleId,
    ) -> Result<Vec<ArticleSupplierLink>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, article_id, supplier_id, supplier_article_number, price, unit
             FROM article_supplier_link WHERE article_id = ?",
        )
        .bind(&article_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(link_from_row).collect()
    }

    async fn save_link(&self, link: ArticleSupplierLink) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO article_supplier_link
                 (id, article_id, supplier_id, supplier_article_number, price, unit)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(article_id, supplier_id) DO UPDATE SET
                 supplier_article_number = excluded.supplier_article_number,
                 price = excluded.price,
                 unit = excluded.unit",
        )
        .bind(&link.id)
        .bind(&link.article_id.0)
        .bind(&link.supplier_id.0)
        .bind(&link.supplier_article_number)
        .bind(link.price.map(|price| price.to_string()))
        .bind(&link.unit)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use pantry_core::domain::article::{Article, ArticleId, ArticleSupplierLink};
    use pantry_core::domain::supplier::{Supplier, SupplierId};

    use super::SqlArticleRepository;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::{ArticleRepository, SqlSupplierRepository, SupplierRepository};

    #[tokio::test]
    async fn article_links_round_trip_with_price() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        SqlSupplierRepository::new(pool.clone())
            .save(Supplier {
                id: SupplierId("sup-dry".to_string()),
                name: "Hanse Dry Goods".to_string(),
                email: None,
                phone: None,
                fixed_delivery_days: false,
                active: true,
            })
            .await
            .expect("save supplier");

        let repo = SqlArticleRepository::new(pool);
        let article = Article {
            id: ArticleId("art-flour".to_string()),
            name: "Wheat Flour".to_string(),
            unit: "kg".to_string(),
            notes: None,
            active: true,
        };
        repo.save(article.clone()).await.expect("save article");

        let link = ArticleSupplierLink {
            id: "asl-1".to_string(),
            article_id: article.id.clone(),
            supplier_id: SupplierId("sup-dry".to_string()),
            supplier_article_number: Some("HD-1102".to_string()),
            price: Some(Decimal::new(89, 2)),
            unit: "kg".to_string(),
        };
        repo.save_link(link.clone()).await.expect("save link");

        let links = repo.links_for_article(&article.id).await.expect("links");
        assert_eq!(links, vec![link]);

        let other = repo
            .links_for_article(&ArticleId("art-unknown".to_string()))
            .await
            .expect("links for unlinked article");
        assert!(other.is_empty());
    }
}
