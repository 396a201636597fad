pub mod error;
pub mod router;
pub mod service;
pub mod shipments;
mod store;

pub use error::ServiceError;
pub use router::UNRESOLVED_SUPPLIER_NOTE;
pub use service::{
    CreateOrderRequest, LineChanges, NewLineRequest, OrderChanges, OrderDetail, OrderService,
};
pub use shipments::ShipmentService;
