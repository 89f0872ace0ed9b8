use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::customer::{
    ActiveModel as CustomerActiveModel, Column, Entity as Customer, Model as CustomerModel,
};
use crate::repositories::{BaseRepository, Repository, SoftDeletable};

/// Optional filters for customer listings
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CustomerFilter {
    pub document: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository for the customer directory
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    base: BaseRepository,
}

impl CustomerRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Resolves a customer that can place orders: present, not soft deleted and active.
    pub async fn get_active_customer<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<CustomerModel>, DbErr> {
        Customer::find_active()
            .filter(Column::Id.eq(id))
            .filter(Column::IsActive.eq(true))
            .one(conn)
            .await
    }

    /// Find a customer by ID, excluding soft-deleted rows
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerModel>, DbErr> {
        Customer::find_active()
            .filter(Column::Id.eq(id))
            .one(self.base.get_db())
            .await
    }

    /// Find a customer by ID including soft-deleted rows
    pub async fn find_with_deleted_by_id(&self, id: Uuid) -> Result<Option<CustomerModel>, DbErr> {
        Customer::find_with_deleted()
            .filter(Column::Id.eq(id))
            .one(self.base.get_db())
            .await
    }

    /// Looks a customer up by document, soft-deleted rows included
    pub async fn find_by_document(&self, document: &str) -> Result<Option<CustomerModel>, DbErr> {
        Customer::find_with_deleted()
            .filter(Column::Document.eq(document))
            .one(self.base.get_db())
            .await
    }

    pub async fn create(&self, customer: CustomerActiveModel) -> Result<CustomerModel, DbErr> {
        customer.insert(self.base.get_db()).await
    }

    pub async fn update(&self, customer: CustomerActiveModel) -> Result<CustomerModel, DbErr> {
        customer.update(self.base.get_db()).await
    }

    /// Lists customers, newest first
    pub async fn list(&self, filter: &CustomerFilter) -> Result<Vec<CustomerModel>, DbErr> {
        let mut query = Customer::find_active();

        if let Some(document) = &filter.document {
            query = query.filter(Column::Document.eq(document.as_str()));
        }
        if let Some(email) = &filter.email {
            query = query.filter(Column::Email.eq(email.to_lowercase()));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(Column::IsActive.eq(is_active));
        }

        query
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await
    }

    /// Stamps `deleted_at`. Returns false when no live customer matched.
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, DbErr> {
        let now = Utc::now();
        let result = Customer::update_many()
            .col_expr(Column::DeletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(self.base.get_db())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

impl Repository for CustomerRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
