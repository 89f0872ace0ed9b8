use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states of an order.
///
/// ```text
/// PENDING ──► CONFIRMED ──► SEPARATED ──► SHIPPED ──► DELIVERED
///    │            │
///    └────────────┴──► CANCELED
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "SEPARATED")]
    Separated,
    #[sea_orm(string_value = "SHIPPED")]
    Shipped,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
}

impl OrderStatus {
    /// Statuses reachable from `self` through an ordinary status change.
    pub fn allowed_transitions(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Canceled],
            OrderStatus::Confirmed => &[OrderStatus::Separated, OrderStatus::Canceled],
            OrderStatus::Separated => &[OrderStatus::Shipped],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Canceled => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Orders can only be canceled (with stock restored) before separation.
    pub fn is_cancelable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

/// The `orders` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human readable identifier, e.g. `ORD-1A2B3C4D5E6F`.
    #[sea_orm(unique)]
    pub order_number: String,

    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,

    /// Caller supplied token; one order per key.
    #[sea_orm(unique)]
    pub idempotency_key: String,

    pub observations: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "Restrict"
    )]
    Customer,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::order_status_history::Entity")]
    StatusHistory,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::order_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;
    use std::str::FromStr;
    use test_case::test_case;

    #[test_case(OrderStatus::Pending, OrderStatus::Confirmed, true)]
    #[test_case(OrderStatus::Pending, OrderStatus::Canceled, true)]
    #[test_case(OrderStatus::Pending, OrderStatus::Shipped, false)]
    #[test_case(OrderStatus::Pending, OrderStatus::Separated, false)]
    #[test_case(OrderStatus::Confirmed, OrderStatus::Separated, true)]
    #[test_case(OrderStatus::Confirmed, OrderStatus::Canceled, true)]
    #[test_case(OrderStatus::Confirmed, OrderStatus::Delivered, false)]
    #[test_case(OrderStatus::Separated, OrderStatus::Shipped, true)]
    #[test_case(OrderStatus::Separated, OrderStatus::Canceled, false)]
    #[test_case(OrderStatus::Shipped, OrderStatus::Delivered, true)]
    #[test_case(OrderStatus::Shipped, OrderStatus::Canceled, false)]
    #[test_case(OrderStatus::Delivered, OrderStatus::Canceled, false)]
    #[test_case(OrderStatus::Canceled, OrderStatus::Pending, false)]
    fn transition_table(from: OrderStatus, to: OrderStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn no_status_transitions_to_itself() {
        for status in OrderStatus::iter() {
            assert!(!status.can_transition_to(status), "{status} -> {status}");
        }
    }

    #[test]
    fn only_pending_and_confirmed_are_cancelable() {
        let cancelable: Vec<_> = OrderStatus::iter().filter(|s| s.is_cancelable()).collect();
        assert_eq!(cancelable, vec![OrderStatus::Pending, OrderStatus::Confirmed]);
    }

    #[test]
    fn delivered_and_canceled_have_no_way_out() {
        assert!(OrderStatus::Delivered.allowed_transitions().is_empty());
        assert!(OrderStatus::Canceled.allowed_transitions().is_empty());
        assert!(!OrderStatus::Shipped.allowed_transitions().is_empty());
    }

    #[test]
    fn status_text_round_trips_case_insensitively() {
        assert_eq!(OrderStatus::Separated.to_string(), "SEPARATED");
        assert_eq!(OrderStatus::from_str("confirmed").unwrap(), OrderStatus::Confirmed);
        assert!(OrderStatus::from_str("processing").is_err());
        assert_eq!(
            serde_json::to_string(&OrderStatus::Canceled).unwrap(),
            "\"CANCELED\""
        );
    }
}
