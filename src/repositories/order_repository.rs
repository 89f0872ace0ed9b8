use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as Order, Model as OrderModel, OrderStatus,
};
use crate::entities::order_item::{
    self, ActiveModel as OrderItemActiveModel, Entity as OrderItem, Model as OrderItemModel,
};
use crate::entities::order_status_history::{
    self, ActiveModel as HistoryActiveModel, Entity as OrderStatusHistory, Model as HistoryModel,
};
use crate::repositories::{BaseRepository, Repository, SoftDeletable};

/// Optional filters for order listings
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OrderFilter {
    /// Substring of the order number, case-insensitive
    pub order_number: Option<String>,
    pub customer_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

/// One audit entry to append for a status change
#[derive(Debug, Clone)]
pub struct StatusChange<'a> {
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub changed_by: &'a str,
    pub reason: Option<&'a str>,
}

/// Repository for orders, their items and their status history.
///
/// Associated functions taking a connection are meant to run inside the
/// caller's transaction.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find an order by ID, excluding soft-deleted rows
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderModel>, DbErr> {
        Order::find_active()
            .filter(Column::Id.eq(id))
            .one(self.base.get_db())
            .await
    }

    /// The order owning `key`, if any. Soft-deleted orders still own their key.
    pub async fn find_by_idempotency_key<C: ConnectionTrait>(
        conn: &C,
        key: &str,
    ) -> Result<Option<OrderModel>, DbErr> {
        Order::find_with_deleted()
            .filter(Column::IdempotencyKey.eq(key))
            .one(conn)
            .await
    }

    /// Reads a live order holding an exclusive row lock for the rest of the transaction.
    pub async fn lock_by_id<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<OrderModel>, DbErr> {
        Order::find_active()
            .filter(Column::Id.eq(id))
            .lock_exclusive()
            .one(conn)
            .await
    }

    pub async fn insert_order<C: ConnectionTrait>(
        conn: &C,
        order: OrderActiveModel,
    ) -> Result<OrderModel, DbErr> {
        order.insert(conn).await
    }

    pub async fn insert_items<C: ConnectionTrait>(
        conn: &C,
        items: Vec<OrderItemActiveModel>,
    ) -> Result<(), DbErr> {
        if items.is_empty() {
            return Ok(());
        }
        OrderItem::insert_many(items).exec(conn).await?;
        Ok(())
    }

    /// Sets the order status and appends the matching history row.
    pub async fn record_status_change<C: ConnectionTrait>(
        conn: &C,
        order: OrderModel,
        change: StatusChange<'_>,
    ) -> Result<(OrderModel, HistoryModel), DbErr> {
        let order_id = order.id;

        let mut active = order.into_active_model();
        active.status = Set(change.new_status);
        let updated = active.update(conn).await?;

        let history = HistoryActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            previous_status: Set(change.previous_status),
            new_status: Set(change.new_status),
            changed_by: Set(change.changed_by.to_string()),
            reason: Set(change.reason.map(str::to_string)),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;

        Ok((updated, history))
    }

    /// Items of an order in creation order
    pub async fn items_for_order<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, DbErr> {
        OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .order_by_asc(order_item::Column::LineNumber)
            .all(conn)
            .await
    }

    /// Status history of an order, oldest first
    pub async fn history_for_order<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
    ) -> Result<Vec<HistoryModel>, DbErr> {
        OrderStatusHistory::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(conn)
            .await
    }

    /// Lists live orders, newest first
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderModel>, DbErr> {
        let mut query = Order::find_active();

        if let Some(number) = &filter.order_number {
            query = query.filter(Column::OrderNumber.contains(number.to_uppercase()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status));
        }

        query
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await
    }
}

impl Repository for OrderRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
