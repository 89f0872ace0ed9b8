use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Select};
use std::sync::Arc;

use crate::entities::{customer, order, product};

pub mod customer_repository;
pub mod order_repository;
pub mod product_repository;

pub use customer_repository::{CustomerFilter, CustomerRepository};
pub use order_repository::{OrderFilter, OrderRepository};
pub use product_repository::{ProductFilter, ProductRepository};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Entities removed logically by stamping `deleted_at`.
///
/// `find_active` is the default read path; `find_with_deleted` is for
/// administrative access that must also see removed rows.
pub trait SoftDeletable: EntityTrait {
    fn deleted_at_column() -> Self::Column;

    fn find_active() -> Select<Self> {
        Self::find().filter(Self::deleted_at_column().is_null())
    }

    fn find_with_deleted() -> Select<Self> {
        Self::find()
    }
}

impl SoftDeletable for customer::Entity {
    fn deleted_at_column() -> Self::Column {
        customer::Column::DeletedAt
    }
}

impl SoftDeletable for product::Entity {
    fn deleted_at_column() -> Self::Column {
        product::Column::DeletedAt
    }
}

impl SoftDeletable for order::Entity {
    fn deleted_at_column() -> Self::Column {
        order::Column::DeletedAt
    }
}
