use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::OrderStatus;

/// Domain events published after a transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        customer_id: Uuid,
        total_amount: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
        changed_by: String,
    },
    OrderCancelled {
        order_id: Uuid,
        restored_units: i64,
    },
    ProductStockChanged {
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::OrderCancelled { .. } => "order_cancelled",
            Event::ProductStockChanged { .. } => "product_stock_changed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Best-effort publish: a missing or closed channel is logged, never propagated.
pub async fn publish(sender: Option<&Arc<EventSender>>, event: Event) {
    if let Some(sender) = sender {
        let name = event.name();
        if let Err(e) = sender.send(event).await {
            warn!(error = %e, event = name, "Failed to publish event");
        }
    }
}

/// Drains the channel, logging every event, until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!(payload = ?event, "Event payload");

        match &event {
            Event::OrderCreated {
                order_id,
                order_number,
                customer_id,
                total_amount,
            } => info!(
                event = event.name(),
                %order_id,
                %order_number,
                %customer_id,
                %total_amount,
                "Order created"
            ),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
                changed_by,
            } => info!(
                event = event.name(),
                %order_id,
                %old_status,
                %new_status,
                %changed_by,
                "Order status changed"
            ),
            Event::OrderCancelled {
                order_id,
                restored_units,
            } => info!(
                event = event.name(),
                %order_id,
                restored_units,
                "Order cancelled"
            ),
            Event::ProductStockChanged {
                product_id,
                old_quantity,
                new_quantity,
            } => info!(
                event = event.name(),
                %product_id,
                old_quantity,
                new_quantity,
                "Product stock changed"
            ),
        }
    }

    info!("Event processing loop stopped");
}
