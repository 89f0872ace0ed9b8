use crate::{
    db::DbPool,
    entities::order::{ActiveModel as OrderActiveModel, Model as OrderModel, OrderStatus},
    entities::order_item::ActiveModel as OrderItemActiveModel,
    entities::product::{Model as ProductModel, MAX_AMOUNT},
    errors::{unique_violation, ServiceError},
    events::{publish, Event, EventSender},
    repositories::{CustomerRepository, OrderRepository, ProductRepository},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, DbErr, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Attempts made to find a free order number before giving up.
pub const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// Produces candidate order numbers. Uniqueness is enforced by storage.
pub trait OrderNumberGenerator: Send + Sync + fmt::Debug {
    fn generate(&self) -> String;
}

/// `ORD-` followed by 12 upper-case hex digits of a random UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOrderNumberGenerator;

impl OrderNumberGenerator for RandomOrderNumberGenerator {
    fn generate(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("ORD-{}", hex[..12].to_uppercase())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Idempotency key must be between 1 and 255 characters"))]
    pub idempotency_key: String,
    #[validate]
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub observations: Option<String>,
}

/// Result of a creation request.
#[derive(Debug, Clone)]
pub struct CreateOrderOutcome {
    pub order: OrderModel,
    /// True when the idempotency key already belonged to an order and
    /// nothing was written.
    pub replayed: bool,
}

/// Order creation engine: idempotent, all-or-nothing stock reservation.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    number_generator: Arc<dyn OrderNumberGenerator>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
            number_generator: Arc::new(RandomOrderNumberGenerator),
        }
    }

    /// Replaces the order number source.
    pub fn with_number_generator(mut self, generator: Arc<dyn OrderNumberGenerator>) -> Self {
        self.number_generator = generator;
        self
    }

    /// Creates an order, or returns the existing one when the idempotency key is known.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, idempotency_key = %request.idempotency_key))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderOutcome, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        if let Some(existing) =
            OrderRepository::find_by_idempotency_key(db, &request.idempotency_key).await?
        {
            info!(order_id = %existing.id, "Idempotent replay of existing order");
            return Ok(CreateOrderOutcome {
                order: existing,
                replayed: true,
            });
        }

        CustomerRepository::get_active_customer(db, request.customer_id)
            .await?
            .ok_or(ServiceError::InvalidCustomer(request.customer_id))?;

        if request.items.is_empty() {
            return Err(ServiceError::EmptyOrder);
        }

        let demand = aggregate_demand(&request.items);

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let (order, stock_changes) = match self.reserve_and_insert(&txn, &request, &demand).await {
            Ok(created) => created,
            Err(err) => {
                if let Err(e) = txn.rollback().await {
                    error!(error = %e, "Failed to roll back order creation");
                }
                return match err {
                    ServiceError::DatabaseError(db_err) if is_idempotency_conflict(&db_err) => {
                        self.replay_after_conflict(&request.idempotency_key).await
                    }
                    other => Err(other),
                };
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order.id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_amount = %order.total_amount,
            lines = request.items.len(),
            "Order created"
        );

        publish(
            self.event_sender.as_ref(),
            Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
                customer_id: order.customer_id,
                total_amount: order.total_amount,
            },
        )
        .await;
        for (product_id, old_quantity, new_quantity) in stock_changes {
            publish(
                self.event_sender.as_ref(),
                Event::ProductStockChanged {
                    product_id,
                    old_quantity,
                    new_quantity,
                },
            )
            .await;
        }

        Ok(CreateOrderOutcome {
            order,
            replayed: false,
        })
    }

    /// Locks, checks, writes and decrements inside `txn`.
    ///
    /// Returns the order and `(product_id, old, new)` stock figures.
    async fn reserve_and_insert(
        &self,
        txn: &DatabaseTransaction,
        request: &CreateOrderRequest,
        demand: &BTreeMap<Uuid, i64>,
    ) -> Result<(OrderModel, Vec<(Uuid, i32, i32)>), ServiceError> {
        // BTreeMap iteration gives ascending product ids, the global lock order.
        let mut locked: HashMap<Uuid, ProductModel> = HashMap::with_capacity(demand.len());
        for (&product_id, &requested) in demand {
            let product = ProductRepository::lock_and_get_product(txn, product_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

            if i64::from(product.stock_quantity) < requested {
                warn!(
                    product_id = %product_id,
                    requested,
                    available = product.stock_quantity,
                    "Insufficient stock"
                );
                return Err(ServiceError::InsufficientStock {
                    product_id,
                    product_name: product.name,
                    requested,
                    available: product.stock_quantity,
                });
            }
            locked.insert(product_id, product);
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut total = Decimal::ZERO;
        let mut items = Vec::with_capacity(request.items.len());

        for (index, line) in request.items.iter().enumerate() {
            let product = locked.get(&line.product_id).ok_or_else(|| {
                ServiceError::InternalError(format!("Product {} was not locked", line.product_id))
            })?;
            let unit_price = product.price;
            let subtotal = amount_in_range(
                unit_price.checked_mul(Decimal::from(line.quantity)),
                "Line subtotal",
            )?;
            total = amount_in_range(total.checked_add(subtotal), "Order total")?;

            items.push(OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                line_number: Set(index as i32 + 1),
                quantity: Set(line.quantity),
                unit_price: Set(unit_price),
                subtotal: Set(subtotal),
                created_at: Set(now),
                updated_at: Set(now),
            });
        }

        let draft = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(String::new()),
            customer_id: Set(request.customer_id),
            status: Set(OrderStatus::Pending),
            total_amount: Set(total),
            idempotency_key: Set(request.idempotency_key.clone()),
            observations: Set(request.observations.clone().unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };
        let order = self.insert_with_unique_number(txn, draft).await?;

        OrderRepository::insert_items(txn, items).await?;

        let mut stock_changes = Vec::with_capacity(demand.len());
        for (&product_id, &requested) in demand {
            let product = &locked[&product_id];
            // requested <= stock_quantity, so it fits in i32.
            let quantity = requested as i32;
            if !ProductRepository::adjust_stock(txn, product_id, -quantity).await? {
                return Err(ServiceError::InsufficientStock {
                    product_id,
                    product_name: product.name.clone(),
                    requested,
                    available: product.stock_quantity,
                });
            }
            stock_changes.push((
                product_id,
                product.stock_quantity,
                product.stock_quantity - quantity,
            ));
        }

        Ok((order, stock_changes))
    }

    /// Inserts the order under a fresh number, retrying on number collisions.
    ///
    /// Each attempt runs in a savepoint so a failed insert leaves the outer
    /// transaction usable.
    async fn insert_with_unique_number(
        &self,
        txn: &DatabaseTransaction,
        draft: OrderActiveModel,
    ) -> Result<OrderModel, ServiceError> {
        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            let order_number = self.number_generator.generate();
            let mut candidate = draft.clone();
            candidate.order_number = Set(order_number.clone());

            let savepoint = txn.begin().await?;
            match OrderRepository::insert_order(&savepoint, candidate).await {
                Ok(order) => {
                    savepoint.commit().await?;
                    return Ok(order);
                }
                Err(err) => {
                    savepoint.rollback().await?;
                    if is_order_number_conflict(&err) {
                        warn!(attempt, %order_number, "Order number collision, retrying");
                        continue;
                    }
                    return Err(ServiceError::DatabaseError(err));
                }
            }
        }

        error!(
            attempts = MAX_ORDER_NUMBER_ATTEMPTS,
            "Could not generate a unique order number"
        );
        Err(ServiceError::OrderNumberExhausted(MAX_ORDER_NUMBER_ATTEMPTS))
    }

    /// A concurrent request with the same key won the race; hand back its order.
    async fn replay_after_conflict(&self, key: &str) -> Result<CreateOrderOutcome, ServiceError> {
        let existing = OrderRepository::find_by_idempotency_key(&*self.db_pool, key)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(
                    "Idempotency key conflict without a stored order".to_string(),
                )
            })?;

        info!(order_id = %existing.id, "Idempotency key taken concurrently, replaying");
        Ok(CreateOrderOutcome {
            order: existing,
            replayed: true,
        })
    }
}

/// Total requested units per product, keyed in ascending id order.
fn aggregate_demand(items: &[OrderLineRequest]) -> BTreeMap<Uuid, i64> {
    let mut demand = BTreeMap::new();
    for line in items {
        *demand.entry(line.product_id).or_insert(0i64) += i64::from(line.quantity);
    }
    demand
}

/// Rejects amounts that overflowed or do not fit a `DECIMAL(15, 2)` column.
fn amount_in_range(value: Option<Decimal>, what: &str) -> Result<Decimal, ServiceError> {
    value.filter(|v| *v <= MAX_AMOUNT).ok_or_else(|| {
        warn!(what, "Amount out of range");
        ServiceError::ValidationError(format!(
            "{} exceeds the maximum amount of {}",
            what, MAX_AMOUNT
        ))
    })
}

fn is_order_number_conflict(err: &DbErr) -> bool {
    unique_violation(err).is_some_and(|msg| msg.contains("order_number"))
}

fn is_idempotency_conflict(err: &DbErr) -> bool {
    unique_violation(err).is_some_and(|msg| msg.contains("idempotency_key"))
}
