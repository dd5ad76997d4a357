use crate::{
    db::DbPool,
    entities::coupon::{self, Entity as CouponEntity},
    entities::coupon_usage::{self, Entity as CouponUsageEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub const DISCOUNT_TYPE_PERCENTAGE: &str = "percentage";
pub const DISCOUNT_TYPE_FIXED: &str = "fixed";

/// Why a coupon could not be applied. The variant message is surfaced to
/// the client verbatim, so keep it actionable without leaking internals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    NotFound,
    Inactive,
    NotYetStarted,
    Expired,
    MinOrderNotMet { min_order: Decimal },
    UsageLimitReached,
    PerUserLimitReached,
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Coupon code not found"),
            Self::Inactive => write!(f, "Coupon is not active"),
            Self::NotYetStarted => write!(f, "Coupon is not valid yet"),
            Self::Expired => write!(f, "Coupon has expired"),
            Self::MinOrderNotMet { min_order } => {
                write!(f, "Order must be at least {} to use this coupon", min_order)
            }
            Self::UsageLimitReached => write!(f, "Coupon usage limit reached"),
            Self::PerUserLimitReached => {
                write!(f, "You have already used this coupon the maximum number of times")
            }
        }
    }
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateCouponRequest {
    #[validate(length(min = 3, max = 32))]
    pub code: String,
    pub description: Option<String>,
    #[validate(custom = "validate_discount_type")]
    pub discount_type: String,
    pub value: Decimal,
    #[serde(default)]
    pub min_order: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn validate_discount_type(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        DISCOUNT_TYPE_PERCENTAGE | DISCOUNT_TYPE_FIXED => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_discount_type")),
    }
}

#[derive(Debug, Serialize)]
pub struct CouponListResponse {
    pub coupons: Vec<coupon::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Decides whether `coupon` applies to an order of `order_total` placed by a
/// customer with `prior_user_redemptions` recorded uses, and if so the
/// discount amount. Pure so the policy can be tested without a database.
///
/// Percentage discounts are floored to whole currency units and capped at
/// `max_discount`. Fixed discounts are taken verbatim; the checkout workflow
/// rejects any order whose resulting total is not positive.
pub fn evaluate(
    coupon: &coupon::Model,
    order_total: Decimal,
    prior_user_redemptions: i64,
    now: DateTime<Utc>,
) -> Result<Decimal, CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if now < coupon.start_date {
        return Err(CouponRejection::NotYetStarted);
    }
    if now > coupon.end_date {
        return Err(CouponRejection::Expired);
    }
    if order_total < coupon.min_order {
        return Err(CouponRejection::MinOrderNotMet {
            min_order: coupon.min_order,
        });
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Err(CouponRejection::UsageLimitReached);
        }
    }
    if let Some(limit) = coupon.per_user_limit {
        if prior_user_redemptions >= i64::from(limit) {
            return Err(CouponRejection::PerUserLimitReached);
        }
    }

    let discount = match coupon.discount_type.as_str() {
        DISCOUNT_TYPE_PERCENTAGE => {
            let raw = (order_total * coupon.value / Decimal::from(100)).floor();
            match coupon.max_discount {
                Some(cap) if raw > cap => cap,
                _ => raw,
            }
        }
        _ => coupon.value,
    };

    Ok(discount)
}

/// Coupon ledger: validation, atomic redemption accounting, and the
/// append-only usage trail.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CouponService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, req))]
    pub async fn create_coupon(
        &self,
        req: CreateCouponRequest,
    ) -> Result<coupon::Model, ServiceError> {
        req.validate()?;

        if req.end_date <= req.start_date {
            return Err(ServiceError::ValidationError(
                "end_date must be after start_date".to_string(),
            ));
        }
        if req.value <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "value must be positive".to_string(),
            ));
        }
        if req.discount_type == DISCOUNT_TYPE_PERCENTAGE && req.value > Decimal::from(100) {
            return Err(ServiceError::ValidationError(
                "percentage value cannot exceed 100".to_string(),
            ));
        }

        let code = req.code.trim().to_uppercase();
        let existing = CouponEntity::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            description: Set(req.description),
            discount_type: Set(req.discount_type),
            value: Set(req.value),
            min_order: Set(req.min_order),
            max_discount: Set(req.max_discount),
            usage_limit: Set(req.usage_limit),
            used_count: Set(0),
            per_user_limit: Set(req.per_user_limit),
            start_date: Set(req.start_date),
            end_date: Set(req.end_date),
            is_active: Set(req.is_active),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.db)
        .await?;

        info!(coupon_id = %model.id, code = %model.code, "Coupon created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn list_coupons(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<CouponListResponse, ServiceError> {
        let paginator = CouponEntity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let coupons = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(CouponListResponse {
            coupons,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_by_code(&self, code: &str) -> Result<Option<coupon::Model>, ServiceError> {
        let coupon = CouponEntity::find()
            .filter(coupon::Column::Code.eq(code.trim().to_uppercase()))
            .one(&*self.db)
            .await?;
        Ok(coupon)
    }

    async fn count_user_redemptions(
        &self,
        coupon_id: Uuid,
        customer_id: Uuid,
    ) -> Result<i64, ServiceError> {
        let count = CouponUsageEntity::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon_id))
            .filter(coupon_usage::Column::CustomerId.eq(customer_id))
            .count(&*self.db)
            .await?;
        Ok(count as i64)
    }

    /// Looks up the code and evaluates it against the order. Returns the
    /// coupon and the discount it would grant; does not consume a use.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        code: &str,
        customer_id: Uuid,
        order_total: Decimal,
    ) -> Result<(coupon::Model, Decimal), ServiceError> {
        let coupon = self
            .find_by_code(code)
            .await?
            .ok_or_else(|| ServiceError::ValidationError(CouponRejection::NotFound.to_string()))?;

        let prior = self.count_user_redemptions(coupon.id, customer_id).await?;

        let discount = evaluate(&coupon, order_total, prior, Utc::now())
            .map_err(|r| ServiceError::ValidationError(r.to_string()))?;

        Ok((coupon, discount))
    }

    /// Consumes one use of the coupon. The guarded UPDATE increments
    /// `used_count` only while it is still under `usage_limit`, so two
    /// concurrent redemptions of the last slot cannot both win; the loser
    /// sees zero rows affected.
    #[instrument(skip(self))]
    pub async fn redeem(&self, coupon_id: Uuid) -> Result<(), ServiceError> {
        let result = CouponEntity::update_many()
            .col_expr(
                coupon::Column::UsedCount,
                Expr::col(coupon::Column::UsedCount).add(1),
            )
            .col_expr(coupon::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(coupon::Column::Id.eq(coupon_id))
            .filter(
                Condition::any()
                    .add(coupon::Column::UsageLimit.is_null())
                    .add(
                        Expr::col(coupon::Column::UsedCount)
                            .lt(Expr::col(coupon::Column::UsageLimit)),
                    ),
            )
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ValidationError(
                CouponRejection::UsageLimitReached.to_string(),
            ));
        }

        Ok(())
    }

    /// Returns a consumed use after a downstream failure. Best effort: the
    /// caller has already failed the request, so a release that itself fails
    /// is only logged.
    #[instrument(skip(self))]
    pub async fn release(&self, coupon_id: Uuid) {
        let result = CouponEntity::update_many()
            .col_expr(
                coupon::Column::UsedCount,
                Expr::col(coupon::Column::UsedCount).sub(1),
            )
            .col_expr(coupon::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(coupon::Column::Id.eq(coupon_id))
            .filter(coupon::Column::UsedCount.gt(0))
            .exec(&*self.db)
            .await;

        match result {
            Ok(r) if r.rows_affected == 1 => {
                info!(coupon_id = %coupon_id, "Coupon use released");
            }
            Ok(_) => {
                warn!(coupon_id = %coupon_id, "Coupon release matched no rows");
            }
            Err(e) => {
                warn!(coupon_id = %coupon_id, error = %e, "Failed to release coupon use");
            }
        }
    }

    /// Appends a usage row once the order the redemption belongs to exists.
    #[instrument(skip(self))]
    pub async fn record_usage(
        &self,
        coupon_id: Uuid,
        order_id: Uuid,
        customer_id: Uuid,
        discount_amount: Decimal,
    ) -> Result<(), ServiceError> {
        coupon_usage::ActiveModel {
            id: Set(Uuid::new_v4()),
            coupon_id: Set(coupon_id),
            order_id: Set(order_id),
            customer_id: Set(customer_id),
            discount_amount: Set(discount_amount),
            used_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_best_effort(Event::CouponRedeemed {
                coupon_id,
                order_id,
            })
            .await;

        Ok(())
    }
}
