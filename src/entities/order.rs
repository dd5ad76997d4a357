use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted order record.
///
/// The monetary breakdown (`subtotal`, `discount`, `shipping_cost`, `tax`,
/// `cod_surcharge`, `total_amount`) is fixed at creation time; later writers
/// only touch the payment/fulfillment state and shipment correlation fields.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable order identifier, e.g. `ORD-2026-000042`. Unique.
    pub order_number: String,

    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,

    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub cod_surcharge: Decimal,
    pub total_amount: Decimal,
    pub currency: String,

    pub coupon_code: Option<String>,

    /// `online` or `cod`.
    pub payment_method: String,
    /// `pending`, `paid`, `failed`, `refunded`.
    pub payment_status: String,
    /// Gateway transaction reference, set after a verified payment.
    pub payment_id: Option<String>,
    /// Gateway's own order identifier, used to correlate webhooks.
    pub gateway_order_id: Option<String>,

    /// `pending`, `confirmed`, `processing`, `shipped`, `delivered`, `cancelled`.
    pub status: String,

    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_pincode: String,
    pub shipping_country: String,

    /// Shipment provider correlation fields, filled after registration.
    pub shipment_id: Option<String>,
    pub awb_code: Option<String>,
    pub courier_name: Option<String>,
    pub tracking_url: Option<String>,

    /// Client-supplied checkout deduplication token. Unique when present.
    pub idempotency_key: Option<String>,

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

impl ActiveModelBehavior for ActiveModel {}
