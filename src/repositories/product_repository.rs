use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::entities::product::{
    ActiveModel as ProductActiveModel, Column, Entity as Product, Model as ProductModel,
};
use crate::repositories::{BaseRepository, Repository, SoftDeletable};

/// Optional filters for catalog listings
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductFilter {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub name_like: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository for the product catalog
#[derive(Debug, Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Reads a sellable product holding an exclusive row lock until the
    /// surrounding transaction ends. `SELECT ... FOR UPDATE` on Postgres;
    /// SQLite serializes writers at the database level instead.
    pub async fn lock_and_get_product<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<ProductModel>, DbErr> {
        Product::find_active()
            .filter(Column::Id.eq(id))
            .filter(Column::IsActive.eq(true))
            .lock_exclusive()
            .one(conn)
            .await
    }

    /// Like `lock_and_get_product` but also returns inactive products.
    pub async fn lock_for_stock_update<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<ProductModel>, DbErr> {
        Product::find_active()
            .filter(Column::Id.eq(id))
            .lock_exclusive()
            .one(conn)
            .await
    }

    /// Applies `delta` to the stock of `id` in a single guarded UPDATE.
    ///
    /// Returns false when the product does not exist or the result would be
    /// negative; nothing is written in that case.
    pub async fn adjust_stock<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
        delta: i32,
    ) -> Result<bool, DbErr> {
        let mut update = Product::update_many()
            .col_expr(
                Column::StockQuantity,
                Expr::col(Column::StockQuantity).add(delta),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id));

        if delta < 0 {
            update = update.filter(Column::StockQuantity.gte(-delta));
        }

        let result = update.exec(conn).await?;
        debug!(product_id = %id, delta, applied = result.rows_affected > 0, "Stock adjusted");

        Ok(result.rows_affected > 0)
    }

    /// Find a product by ID, excluding soft-deleted rows
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductModel>, DbErr> {
        Product::find_active()
            .filter(Column::Id.eq(id))
            .one(self.base.get_db())
            .await
    }

    /// Find a product by ID including soft-deleted rows
    pub async fn find_with_deleted_by_id(&self, id: Uuid) -> Result<Option<ProductModel>, DbErr> {
        Product::find_with_deleted()
            .filter(Column::Id.eq(id))
            .one(self.base.get_db())
            .await
    }

    /// Looks a product up by SKU, soft-deleted rows included
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<ProductModel>, DbErr> {
        Product::find_with_deleted()
            .filter(Column::Sku.eq(sku))
            .one(self.base.get_db())
            .await
    }

    pub async fn create(&self, product: ProductActiveModel) -> Result<ProductModel, DbErr> {
        product.insert(self.base.get_db()).await
    }

    pub async fn update(&self, product: ProductActiveModel) -> Result<ProductModel, DbErr> {
        product.update(self.base.get_db()).await
    }

    /// Lists products ordered by SKU
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<ProductModel>, DbErr> {
        let mut query = Product::find_active();

        if let Some(sku) = &filter.sku {
            query = query.filter(Column::Sku.eq(sku.as_str()));
        }
        if let Some(name) = &filter.name {
            query = query.filter(Column::Name.eq(name.as_str()));
        }
        if let Some(name_like) = &filter.name_like {
            query = query.filter(Column::Name.contains(name_like.as_str()));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(Column::IsActive.eq(is_active));
        }

        query
            .order_by_asc(Column::Sku)
            .all(self.base.get_db())
            .await
    }

    /// Stamps `deleted_at`. Returns false when no live product matched.
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, DbErr> {
        let now = Utc::now();
        let result = Product::update_many()
            .col_expr(Column::DeletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(self.base.get_db())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

impl Repository for ProductRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
