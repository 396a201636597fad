use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use pantry_core::domain::article::{Article, ArticleId, ArticleSupplierLink};
use pantry_core::domain::department::{Department, DepartmentId};
use pantry_core::domain::supplier::{DeliveryDayRule, Supplier, SupplierId, Weekday};
use pantry_core::domain::user::{User, UserId};

use super::{
    ArticleRepository, DepartmentRepository, RepositoryError, SupplierRepository, UserRepository,
};

#[derive(Default)]
pub struct InMemoryDepartmentRepository {
    departments: RwLock<HashMap<String, Department>>,
}

#[async_trait::async_trait]
impl DepartmentRepository for InMemoryDepartmentRepository {
    async fn find_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let departments = self.departments.read().await;
        Ok(departments.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Department>, RepositoryError> {
        let departments = self.departments.read().await;
        Ok(departments.values().cloned().collect())
    }

    async fn save(&self, department: Department) -> Result<(), RepositoryError> {
        let mut departments = self.departments.write().await;
        departments.insert(department.id.0.clone(), department);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).cloned())
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.0.clone(), user);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySupplierRepository {
    suppliers: RwLock<HashMap<String, Supplier>>,
    delivery_days: RwLock<HashMap<String, HashSet<Weekday>>>,
    grants: RwLock<HashSet<(String, String)>>,
}

#[async_trait::async_trait]
impl SupplierRepository for InMemorySupplierRepository {
    async fn find_by_id(&self, id: &SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.get(&id.0).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Supplier>, RepositoryError> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.values().filter(|supplier| supplier.active).cloned().collect())
    }

    async fn save(&self, supplier: Supplier) -> Result<(), RepositoryError> {
        let mut suppliers = self.suppliers.write().await;
        suppliers.insert(supplier.id.0.clone(), supplier);
        Ok(())
    }

    async fn delivery_weekdays(
        &self,
        supplier_id: &SupplierId,
    ) -> Result<HashSet<Weekday>, RepositoryError> {
        let delivery_days = self.delivery_days.read().await;
        Ok(delivery_days.get(&supplier_id.0).cloned().unwrap_or_default())
    }

    async fn save_delivery_day(&self, rule: DeliveryDayRule) -> Result<(), RepositoryError> {
        let mut delivery_days = self.delivery_days.write().await;
        delivery_days.entry(rule.supplier_id.0.clone()).or_default().insert(rule.weekday);
        Ok(())
    }

    async fn has_grant(
        &self,
        user_id: &UserId,
        supplier_id: &SupplierId,
    ) -> Result<bool, RepositoryError> {
        let grants = self.grants.read().await;
        Ok(grants.contains(&(user_id.0.clone(), supplier_id.0.clone())))
    }

    async fn save_grant(
        &self,
        user_id: &UserId,
        supplier_id: &SupplierId,
    ) -> Result<(), RepositoryError> {
        let mut grants = self.grants.write().await;
        grants.insert((user_id.0.clone(), supplier_id.0.clone()));
        Ok(())
    }

    async fn granted_suppliers(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SupplierId>, RepositoryError> {
        let grants = self.grants.read().await;
        Ok(grants
            .iter()
            .filter(|(user, _)| user == &user_id.0)
            .map(|(_, supplier)| SupplierId(supplier.clone()))
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryArticleRepository {
    articles: RwLock<HashMap<String, Article>>,
    links: RwLock<HashMap<String, Vec<ArticleSupplierLink>>>,
}

#[async_trait::async_trait]
impl ArticleRepository for InMemoryArticleRepository {
    async fn find_by_id(&self, id: &ArticleId) -> Result<Option<Article>, RepositoryError> {
        let articles = self.articles.read().await;
        Ok(articles.get(&id.0).cloned())
    }

    async fn save(&self, article: Article) -> Result<(), RepositoryError> {
        let mut articles = self.articles.write().await;
        articles.insert(article.id.0.clone(), article);
        Ok(())
    }

    async fn links_for_article(
        &self,
        article_id: &ArticleId,
    ) -> Result<Vec<ArticleSupplierLink>, RepositoryError> {
        let links = self.links.read().await;
        Ok(links.get(&article_id.0).cloned().unwrap_or_default())
    }

    async fn save_link(&self, link: ArticleSupplierLink) -> Result<(), RepositoryError> {
        let mut links = self.links.write().await;
        let entry = links.entry(link.article_id.0.clone()).or_default();
        entry.retain(|existing| existing.supplier_id != link.supplier_id);
        entry.push(link);
        Ok(())
    }
}
