use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::Query;
use crate::{
    db::DbPool,
    entities::{customer, order, order_item, order_status_history, product, OrderStatus},
    errors::ServiceError,
    repositories::{OrderFilter, OrderRepository, SoftDeletable},
};

/// Order as exposed to readers, with the customer's name resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub idempotency_key: String,
    pub observations: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDetail {
    fn from_parts(order: order::Model, customer: Option<customer::Model>) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            customer_id: order.customer_id,
            customer_name: customer.map(|c| c.name).unwrap_or_default(),
            status: order.status,
            total_amount: order.total_amount,
            idempotency_key: order.idempotency_key,
            observations: order.observations,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }

    /// Builds the view for an order already in hand.
    pub async fn load(db: &DbPool, order: order::Model) -> Result<Self, ServiceError> {
        let customer = customer::Entity::find_by_id(order.customer_id).one(db).await?;
        Ok(Self::from_parts(order, customer))
    }
}

/// One order line with the product's current name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryView {
    pub id: Uuid,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub changed_by: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<order_status_history::Model> for StatusHistoryView {
    fn from(row: order_status_history::Model) -> Self {
        Self {
            id: row.id,
            previous_status: row.previous_status,
            new_status: row.new_status,
            changed_by: row.changed_by,
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

async fn ensure_order_exists(db: &DbPool, order_id: Uuid) -> Result<(), ServiceError> {
    order::Entity::find_active()
        .filter(order::Column::Id.eq(order_id))
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

/// Struct to get a specific order by ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetOrderQuery {
    pub order_id: Uuid,
}

#[async_trait]
impl Query for GetOrderQuery {
    type Result = OrderDetail;

    #[instrument(skip(self, db), fields(order_id = %self.order_id))]
    async fn execute(&self, db: &DbPool) -> Result<Self::Result, ServiceError> {
        debug!("Executing GetOrderQuery");

        order::Entity::find_active()
            .filter(order::Column::Id.eq(self.order_id))
            .find_also_related(customer::Entity)
            .one(db)
            .await?
            .map(|(order, customer)| OrderDetail::from_parts(order, customer))
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", self.order_id)))
    }
}

/// Struct to list live orders, newest first.
#[derive(Debug, Default)]
pub struct ListOrdersQuery {
    pub filter: OrderFilter,
}

#[async_trait]
impl Query for ListOrdersQuery {
    type Result = Vec<OrderDetail>;

    #[instrument(skip(self, db))]
    async fn execute(&self, db: &DbPool) -> Result<Self::Result, ServiceError> {
        debug!(filter = ?self.filter, "Executing ListOrdersQuery");

        let orders = OrderRepository::new(std::sync::Arc::new(db.clone()))
            .list(&self.filter)
            .await?;

        let customer_ids: Vec<Uuid> = orders.iter().map(|o| o.customer_id).collect();
        let customers = customer::Entity::find()
            .filter(customer::Column::Id.is_in(customer_ids))
            .all(db)
            .await?;

        Ok(orders
            .into_iter()
            .map(|order| {
                let customer = customers.iter().find(|c| c.id == order.customer_id).cloned();
                OrderDetail::from_parts(order, customer)
            })
            .collect())
    }
}

/// Struct to get the items of an order in creation order.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetOrderItemsQuery {
    pub order_id: Uuid,
}

#[async_trait]
impl Query for GetOrderItemsQuery {
    type Result = Vec<OrderItemView>;

    #[instrument(skip(self, db), fields(order_id = %self.order_id))]
    async fn execute(&self, db: &DbPool) -> Result<Self::Result, ServiceError> {
        debug!("Executing GetOrderItemsQuery");
        ensure_order_exists(db, self.order_id).await?;

        let rows = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(self.order_id))
            .find_also_related(product::Entity)
            .order_by_asc(order_item::Column::CreatedAt)
            .order_by_asc(order_item::Column::LineNumber)
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(item, product)| OrderItemView {
                id: item.id,
                product_id: item.product_id,
                product_name: product.map(|p| p.name).unwrap_or_default(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
                created_at: item.created_at,
            })
            .collect())
    }
}

/// Struct to get the status history of an order, oldest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetOrderStatusHistoryQuery {
    pub order_id: Uuid,
}

#[async_trait]
impl Query for GetOrderStatusHistoryQuery {
    type Result = Vec<StatusHistoryView>;

    #[instrument(skip(self, db), fields(order_id = %self.order_id))]
    async fn execute(&self, db: &DbPool) -> Result<Self::Result, ServiceError> {
        debug!("Executing GetOrderStatusHistoryQuery");
        ensure_order_exists(db, self.order_id).await?;

        let rows = OrderRepository::history_for_order(db, self.order_id).await?;
        Ok(rows.into_iter().map(StatusHistoryView::from).collect())
    }
}
