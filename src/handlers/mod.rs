pub mod customers;
pub mod health;
pub mod orders;
pub mod products;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{CatalogService, CustomerService, OrderService, OrderStatusService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub order: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub customer: Arc<CustomerService>,
    pub catalog: Arc<CatalogService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            order: Arc::new(OrderService::new(db_pool.clone(), event_sender.clone())),
            order_status: Arc::new(OrderStatusService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            customer: Arc::new(CustomerService::new(db_pool.clone())),
            catalog: Arc::new(CatalogService::new(db_pool, event_sender)),
        }
    }

    /// Swaps the order service, e.g. for one with a custom number generator.
    pub fn with_order_service(mut self, order: OrderService) -> Self {
        self.order = Arc::new(order);
        self
    }
}
