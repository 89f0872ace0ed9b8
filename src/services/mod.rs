// Order engines
pub mod order_status;
pub mod orders;

// Directory and catalog management
pub mod catalog;
pub mod customers;

pub use catalog::CatalogService;
pub use customers::CustomerService;
pub use order_status::OrderStatusService;
pub use orders::{CreateOrderOutcome, CreateOrderRequest, OrderLineRequest, OrderService};
