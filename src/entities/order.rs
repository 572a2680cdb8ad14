use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status assigned at checkout time, before the payment provider has
/// reported anything back.
pub const STATUS_PENDING_PAYMENT: &str = "pending_mp";

/// Terminal status applied when the provider reports an approved payment.
pub const STATUS_PAYMENT_APPROVED: &str = "payment_approved";

/// Status set by the admin surface once the order has been handed over.
pub const STATUS_DELIVERED: &str = "delivered";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable code shown to customers; distinct from the durable
    /// id and not guaranteed unique.
    pub order_code: String,

    /// Display label derived from the customer's name and email.
    pub customer_code: Option<String>,

    pub total_amount: Decimal,
    pub total_quantity: i32,
    pub status: String,
    pub payer_email: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub shipping_number: Option<String>,
    pub shipping_complement: Option<String>,
    pub shipping_neighborhood: Option<String>,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip_code: String,

    /// Checkout session descriptor created at the payment provider.
    pub mp_preference_id: Option<String>,

    /// Provider payment id; unique across orders so replayed webhooks
    /// for the same payment cannot attach it to a second order.
    pub mp_payment_id: Option<String>,

    /// Raw status string as reported by the provider.
    pub mp_status: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(self)
    }
}
