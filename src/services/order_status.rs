use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::order::{Model as OrderModel, OrderStatus},
    errors::ServiceError,
    events::{publish, Event, EventSender},
    repositories::{order_repository::StatusChange, OrderRepository, ProductRepository},
};

/// Status transition engine.
///
/// Every change runs in one transaction holding the order row lock, so a
/// status is never applied twice and stock is never restored twice.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

/// Stock given back by a cancellation, per product.
struct Restoration {
    per_product: BTreeMap<Uuid, i64>,
}

impl Restoration {
    fn total_units(&self) -> i64 {
        self.per_product.values().sum()
    }
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Moves an order along the status table and records the change.
    ///
    /// A move to `CANCELED` takes the cancellation path so reserved stock is
    /// returned.
    #[instrument(skip(self, reason), fields(order_id = %order_id, new_status = %new_status, changed_by = %changed_by))]
    pub async fn transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        changed_by: &str,
        reason: Option<&str>,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.begin().await?;

        let order = match Self::lock_order(&txn, order_id).await {
            Ok(order) => order,
            Err(e) => return Self::abort(txn, e).await,
        };
        let previous_status = order.status;

        if !previous_status.can_transition_to(new_status) {
            warn!(from = %previous_status, to = %new_status, "Rejected status transition");
            return Self::abort(
                txn,
                ServiceError::InvalidTransition {
                    from: previous_status,
                    to: new_status,
                },
            )
            .await;
        }

        let result = if new_status == OrderStatus::Canceled {
            Self::cancel_locked(&txn, order, changed_by, reason)
                .await
                .map(|(order, restored)| (order, Some(restored)))
        } else {
            OrderRepository::record_status_change(
                &txn,
                order,
                StatusChange {
                    previous_status,
                    new_status,
                    changed_by,
                    reason,
                },
            )
            .await
            .map(|(order, _)| (order, None))
            .map_err(ServiceError::from)
        };

        let (updated, restored) = match result {
            Ok(done) => done,
            Err(e) => return Self::abort(txn, e).await,
        };

        self.commit(txn, order_id).await?;
        info!(from = %previous_status, to = %new_status, "Order status changed");

        self.publish_change(&updated, previous_status, changed_by, restored)
            .await;
        Ok(updated)
    }

    /// Cancels a PENDING or CONFIRMED order, returning its items to stock.
    #[instrument(skip(self, reason), fields(order_id = %order_id, changed_by = %changed_by))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        changed_by: &str,
        reason: Option<&str>,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.begin().await?;

        let order = match Self::lock_order(&txn, order_id).await {
            Ok(order) => order,
            Err(e) => return Self::abort(txn, e).await,
        };
        let previous_status = order.status;

        if !previous_status.is_cancelable() {
            warn!(status = %previous_status, "Rejected cancellation");
            return Self::abort(txn, ServiceError::NotCancelable(previous_status)).await;
        }

        let (updated, restored) = match Self::cancel_locked(&txn, order, changed_by, reason).await
        {
            Ok(done) => done,
            Err(e) => return Self::abort(txn, e).await,
        };

        self.commit(txn, order_id).await?;
        info!(
            from = %previous_status,
            restored_units = restored.total_units(),
            "Order canceled"
        );

        self.publish_change(&updated, previous_status, changed_by, Some(restored))
            .await;
        Ok(updated)
    }

    /// Restores stock for every item of a locked order and marks it canceled.
    async fn cancel_locked(
        txn: &DatabaseTransaction,
        order: OrderModel,
        changed_by: &str,
        reason: Option<&str>,
    ) -> Result<(OrderModel, Restoration), ServiceError> {
        let items = OrderRepository::items_for_order(txn, order.id).await?;

        let mut per_product: BTreeMap<Uuid, i64> = BTreeMap::new();
        for item in &items {
            *per_product.entry(item.product_id).or_insert(0) += i64::from(item.quantity);
        }

        // Ascending product order, same as creation.
        for (&product_id, &quantity) in &per_product {
            let delta = i32::try_from(quantity).map_err(|_| {
                ServiceError::InternalError(format!(
                    "Restored quantity {} for product {} overflows",
                    quantity, product_id
                ))
            })?;
            if !ProductRepository::adjust_stock(txn, product_id, delta).await? {
                return Err(ServiceError::InternalError(format!(
                    "Product {} referenced by order {} is missing",
                    product_id, order.id
                )));
            }
        }

        let previous_status = order.status;
        let (updated, _) = OrderRepository::record_status_change(
            txn,
            order,
            StatusChange {
                previous_status,
                new_status: OrderStatus::Canceled,
                changed_by,
                reason,
            },
        )
        .await?;

        Ok((updated, Restoration { per_product }))
    }

    async fn lock_order(txn: &DatabaseTransaction, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderRepository::lock_by_id(txn, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn begin(&self) -> Result<DatabaseTransaction, ServiceError> {
        self.db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })
    }

    async fn commit(&self, txn: DatabaseTransaction, order_id: Uuid) -> Result<(), ServiceError> {
        txn.commit().await.map_err(|e| {
            error!("Failed to commit status change for order {}: {}", order_id, e);
            ServiceError::DatabaseError(e)
        })
    }

    async fn abort<T>(txn: DatabaseTransaction, err: ServiceError) -> Result<T, ServiceError> {
        if let Err(e) = txn.rollback().await {
            error!("Failed to roll back transaction: {}", e);
        }
        Err(err)
    }

    async fn publish_change(
        &self,
        order: &OrderModel,
        previous_status: OrderStatus,
        changed_by: &str,
        restored: Option<Restoration>,
    ) {
        let sender = self.event_sender.as_ref();

        publish(
            sender,
            Event::OrderStatusChanged {
                order_id: order.id,
                old_status: previous_status,
                new_status: order.status,
                changed_by: changed_by.to_string(),
            },
        )
        .await;

        if let Some(restored) = restored {
            publish(
                sender,
                Event::OrderCancelled {
                    order_id: order.id,
                    restored_units: restored.total_units(),
                },
            )
            .await;
        }
    }
}
