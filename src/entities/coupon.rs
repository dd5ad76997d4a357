use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stored uppercase; lookups normalize the submitted code first. Unique.
    pub code: String,

    pub description: Option<String>,

    /// `percentage` or `fixed`.
    pub discount_type: String,
    pub value: Decimal,

    /// Order total must reach this before the coupon applies.
    pub min_order: Decimal,
    /// Cap for percentage discounts; ignored for fixed ones.
    pub max_discount: Option<Decimal>,

    /// Global redemption cap; `None` means unlimited.
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    /// Per-customer redemption cap; `None` means unlimited.
    pub per_user_limit: Option<i32>,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::coupon_usage::Entity")]
    CouponUsage,
}

impl Related<super::coupon_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CouponUsage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
