use crate::{
    db::DbPool,
    entities::product::{validate_price, ActiveModel as ProductActiveModel, Model as ProductModel},
    errors::{unique_violation, ServiceError},
    events::{publish, Event, EventSender},
    repositories::{ProductFilter, ProductRepository, Repository},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 50, message = "SKU must be between 1 and 50 characters"))]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "Product name must be between 1 and 255 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update; stock is changed only through `update_stock`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Product name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStockRequest {
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: i32,
}

fn default_true() -> bool {
    true
}

/// Product catalog management
#[derive(Clone)]
pub struct CatalogService {
    repository: ProductRepository,
    event_sender: Option<Arc<EventSender>>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            repository: ProductRepository::new(db_pool),
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;

        let product = ProductActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(request.sku.trim().to_string()),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            price: Set(request.price),
            stock_quantity: Set(request.stock_quantity),
            is_active: Set(request.is_active),
            deleted_at: Set(None),
            ..Default::default()
        };

        let created = self.repository.create(product).await.map_err(|e| {
            if unique_violation(&e).is_some() {
                ServiceError::Conflict(format!("A product with SKU '{}' already exists", request.sku))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    /// Product lookup used by the seed tool to stay idempotent.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<ProductModel>, ServiceError> {
        Ok(self.repository.find_by_sku(sku).await?)
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductModel>, ServiceError> {
        Ok(self.repository.list(&filter).await?)
    }

    /// Price changes never touch existing order items, which keep their snapshot.
    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;

        let existing = self.get_product(id).await?;
        let mut active = existing.into_active_model();

        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        let updated = self.repository.update(active).await?;
        info!(product_id = %id, "Product updated");
        Ok(updated)
    }

    /// Sets the absolute stock level under the product row lock.
    #[instrument(skip(self, request), fields(stock_quantity = request.stock_quantity))]
    pub async fn update_stock(
        &self,
        id: Uuid,
        request: UpdateStockRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;

        let txn = self.repository.get_db().begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for stock update");
            ServiceError::DatabaseError(e)
        })?;

        let product = match ProductRepository::lock_for_stock_update(&txn, id).await? {
            Some(product) => product,
            None => {
                txn.rollback().await?;
                return Err(ServiceError::NotFound(format!("Product {} not found", id)));
            }
        };

        let old_quantity = product.stock_quantity;
        let mut active = product.into_active_model();
        active.stock_quantity = Set(request.stock_quantity);
        let updated = active.update(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, product_id = %id, "Failed to commit stock update");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %id, old_quantity, new_quantity = updated.stock_quantity, "Stock updated");
        publish(
            self.event_sender.as_ref(),
            Event::ProductStockChanged {
                product_id: id,
                old_quantity,
                new_quantity: updated.stock_quantity,
            },
        )
        .await;

        Ok(updated)
    }

    /// Soft-deletes a product. Order items keep referencing it.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.repository.soft_delete(id).await? {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }
        info!(product_id = %id, "Product soft deleted");
        Ok(())
    }
}
