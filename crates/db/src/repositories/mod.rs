use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use pantry_core::audit::ActivityRecord;
use pantry_core::domain::article::{Article, ArticleId, ArticleSupplierLink};
use pantry_core::domain::department::{Department, DepartmentId};
use pantry_core::domain::order::{Order, OrderId, OrderLine, OrderLineId};
use pantry_core::domain::shipment::{ShipmentBatch, ShipmentBatchId};
use pantry_core::domain::supplier::{DeliveryDayRule, Supplier, SupplierId, Weekday};
use pantry_core::domain::user::{User, UserId};

pub mod activity;
pub mod article;
pub mod department;
pub mod memory;
pub mod order;
pub mod shipment;
pub mod supplier;
pub mod user;

pub use activity::SqlActivityRepository;
pub use article::SqlArticleRepository;
pub use department::SqlDepartmentRepository;
pub use memory::{
    InMemoryArticleRepository, InMemoryDepartmentRepository, InMemorySupplierRepository,
    InMemoryUserRepository,
};
pub use order::SqlOrderRepository;
pub use shipment::SqlShipmentRepository;
pub use supplier::SqlSupplierRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Department>, RepositoryError>;
    async fn save(&self, department: Department) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn find_by_id(&self, id: &SupplierId) -> Result<Option<Supplier>, RepositoryError>;
    async fn list_active(&self) -> Result<Vec<Supplier>, RepositoryError>;
    async fn save(&self, supplier: Supplier) -> Result<(), RepositoryError>;

    async fn delivery_weekdays(
        &self,
        supplier_id: &SupplierId,
    ) -> Result<HashSet<Weekday>, RepositoryError>;
    async fn save_delivery_day(&self, rule: DeliveryDayRule) -> Result<(), RepositoryError>;

    async fn has_grant(
        &self,
        user_id: &UserId,
        supplier_id: &SupplierId,
    ) -> Result<bool, RepositoryError>;
    async fn save_grant(
        &self,
        user_id: &UserId,
        supplier_id: &SupplierId,
    ) -> Result<(), RepositoryError>;
    async fn granted_suppliers(&self, user_id: &UserId)
        -> Result<Vec<SupplierId>, RepositoryError>;
}

#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn find_by_id(&self, id: &ArticleId) -> Result<Option<Article>, RepositoryError>;
    async fn save(&self, article: Article) -> Result<(), RepositoryError>;

    async fn links_for_article(
        &self,
        article_id: &ArticleId,
    ) -> Result<Vec<ArticleSupplierLink>, RepositoryError>;
    async fn save_link(&self, link: ArticleSupplierLink) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn list_active(&self) -> Result<Vec<Order>, RepositoryError>;
    async fn list_for_departments(
        &self,
        departments: &[DepartmentId],
    ) -> Result<Vec<Order>, RepositoryError>;
    async fn lines_for_order(&self, order_id: &OrderId)
        -> Result<Vec<OrderLine>, RepositoryError>;
    async fn find_line(&self, id: &OrderLineId) -> Result<Option<OrderLine>, RepositoryError>;
}

#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ShipmentBatchId,
    ) -> Result<Option<ShipmentBatch>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<ShipmentBatch>, RepositoryError>;
    async fn list_for_suppliers(
        &self,
        suppliers: &[SupplierId],
    ) -> Result<Vec<ShipmentBatch>, RepositoryError>;
    async fn lines_in_batch(
        &self,
        id: &ShipmentBatchId,
    ) -> Result<Vec<OrderLine>, RepositoryError>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn append(&self, record: ActivityRecord) -> Result<(), RepositoryError>;
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<ActivityRecord>, RepositoryError>;
}
