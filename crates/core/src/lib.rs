pub mod audit;
pub mod authz;
pub mod config;
pub mod domain;
pub mod errors;
pub mod scheduling;

pub use audit::{ActivityKind, ActivityRecord};
pub use authz::{authorize_order_edit, EditDecision, EditDenial};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::article::{Article, ArticleId, ArticleSupplierLink};
pub use domain::department::{Department, DepartmentId, DepartmentTree, MAX_TREE_DEPTH};
pub use domain::order::{Order, OrderId, OrderLine, OrderLineId, OrderStatus};
pub use domain::shipment::{ShipmentBatch, ShipmentBatchId, ShipmentStatus};
pub use domain::supplier::{DeliveryDayRule, Supplier, SupplierId, Weekday};
pub use domain::user::{Role, User, UserId};
pub use errors::DomainError;
pub use scheduling::{
    next_delivery_date, HolidayCalendar, RegionalHolidayCalendar, SEARCH_HORIZON_DAYS,
};
