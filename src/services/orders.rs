use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Fulfillment state of an order. Independent of [`PaymentStatus`]: a
/// cash-on-delivery order is `Confirmed` while payment is still `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(ServiceError::InvalidStatus(format!(
                "Unknown order status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized line item captured at checkout time.
#[derive(Debug, Clone)]
pub struct OrderItemDraft {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
}

/// Everything the store needs to persist a new order. Totals are computed
/// by the checkout workflow before the draft reaches this service and are
/// never recomputed here.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub items: Vec<OrderItemDraft>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub cod_surcharge: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub gateway_order_id: Option<String>,
    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_pincode: String,
    pub shipping_country: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Source of truth for order records: creation, lookups by natural key,
/// and partial field updates that never reconstruct the whole document.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Allocates the next order number from the atomic `order_number`
    /// counter, formatted `ORD-<year>-<seq padded to 6 digits>`.
    ///
    /// The increment-and-read happens in a single UPDATE so concurrent
    /// checkouts can never observe the same value.
    #[instrument(skip(self))]
    pub async fn generate_order_number(&self) -> Result<String, ServiceError> {
        let db = &*self.db;
        let backend = db.get_database_backend();

        let (seed_sql, bump_sql) = match backend {
            DbBackend::Postgres => (
                "INSERT INTO counters (name, value) VALUES ($1, 0) ON CONFLICT (name) DO NOTHING",
                "UPDATE counters SET value = value + 1 WHERE name = $1 RETURNING value",
            ),
            _ => (
                "INSERT INTO counters (name, value) VALUES (?, 0) ON CONFLICT (name) DO NOTHING",
                "UPDATE counters SET value = value + 1 WHERE name = ? RETURNING value",
            ),
        };

        db.execute(Statement::from_sql_and_values(
            backend,
            seed_sql,
            ["order_number".into()],
        ))
        .await?;

        let row = db
            .query_one(Statement::from_sql_and_values(
                backend,
                bump_sql,
                ["order_number".into()],
            ))
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("order_number counter row missing".to_string())
            })?;

        let seq: i64 = row.try_get("", "value")?;
        Ok(format!("ORD-{}-{:06}", Utc::now().year(), seq))
    }

    /// Persists an order and its line items in one transaction.
    #[instrument(skip(self, draft), fields(order_number = %draft.order_number, customer_id = %draft.customer_id))]
    pub async fn create_order(&self, draft: OrderDraft) -> Result<order::Model, ServiceError> {
        let db = &*self.db;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(draft.order_number.clone()),
            customer_id: Set(draft.customer_id),
            customer_name: Set(draft.customer_name),
            customer_email: Set(draft.customer_email),
            customer_phone: Set(draft.customer_phone),
            subtotal: Set(draft.subtotal),
            discount: Set(draft.discount),
            shipping_cost: Set(draft.shipping_cost),
            tax: Set(draft.tax),
            cod_surcharge: Set(draft.cod_surcharge),
            total_amount: Set(draft.total_amount),
            currency: Set(draft.currency),
            coupon_code: Set(draft.coupon_code),
            payment_method: Set(draft.payment_method),
            payment_status: Set(draft.payment_status.to_string()),
            payment_id: Set(None),
            gateway_order_id: Set(draft.gateway_order_id),
            status: Set(draft.status.to_string()),
            shipping_name: Set(draft.shipping_name),
            shipping_phone: Set(draft.shipping_phone),
            shipping_address: Set(draft.shipping_address),
            shipping_city: Set(draft.shipping_city),
            shipping_state: Set(draft.shipping_state),
            shipping_pincode: Set(draft.shipping_pincode),
            shipping_country: Set(draft.shipping_country),
            shipment_id: Set(None),
            awb_code: Set(None),
            courier_name: Set(None),
            tracking_url: Set(None),
            idempotency_key: Set(draft.idempotency_key),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        for item in draft.items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                name: Set(item.name),
                sku: Set(item.sku),
                unit_price: Set(item.unit_price),
                quantity: Set(item.quantity),
                line_total: Set(item.unit_price * Decimal::from(item.quantity)),
                size: Set(item.size),
                color: Set(item.color),
                image_url: Set(item.image_url),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(order_id = %order_id, order_number = %order_model.order_number, "Order created");

        self.event_sender
            .send_best_effort(Event::OrderCreated {
                order_id,
                order_number: order_model.order_number.clone(),
            })
            .await;

        Ok(order_model)
    }

    #[instrument(skip(self))]
    pub async fn get_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?;
        Ok(order)
    }

    /// Webhooks correlate by the gateway's own order id, not ours, because
    /// they can fire before the client's verification round-trip completes.
    #[instrument(skip(self))]
    pub async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::GatewayOrderId.eq(gateway_order_id))
            .one(&*self.db)
            .await?;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::IdempotencyKey.eq(key))
            .one(&*self.db)
            .await?;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn get_orders_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(orders)
    }

    /// Lists orders newest-first with optional status filtering.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Partial update of the payment axis. Writes an absolute target state,
    /// so re-applying the same transition is a no-op in effect.
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
        payment_id: Option<String>,
    ) -> Result<(), ServiceError> {
        let mut active = order::ActiveModel {
            id: Set(order_id),
            payment_status: Set(status.to_string()),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        if let Some(payment_id) = payment_id {
            active.payment_id = Set(Some(payment_id));
        }
        active.update(&*self.db).await?;

        info!(order_id = %order_id, payment_status = %status, "Payment status updated");
        Ok(())
    }

    /// Partial update of the fulfillment axis.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<(), ServiceError> {
        order::ActiveModel {
            id: Set(order_id),
            status: Set(status.to_string()),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .update(&*self.db)
        .await?;

        info!(order_id = %order_id, status = %status, "Order status updated");
        Ok(())
    }

    /// Records shipment provider correlation fields after registration or a
    /// courier webhook. Each field is written only when present, so an AWB
    /// can land before the provider has assigned a shipment id, and only
    /// shipment columns are touched, never a concurrent payment-status write.
    #[instrument(skip(self))]
    pub async fn update_shipment_details(
        &self,
        order_id: Uuid,
        shipment_id: Option<String>,
        awb_code: Option<String>,
        courier_name: Option<String>,
    ) -> Result<(), ServiceError> {
        let mut active = order::ActiveModel {
            id: Set(order_id),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        if let Some(shipment_id) = shipment_id {
            active.shipment_id = Set(Some(shipment_id));
        }
        if let Some(awb) = awb_code {
            active.tracking_url = Set(Some(format!(
                "https://shiprocket.co/tracking/{}",
                awb
            )));
            active.awb_code = Set(Some(awb));
        }
        if let Some(courier) = courier_name {
            active.courier_name = Set(Some(courier));
        }
        active.update(&*self.db).await?;

        info!(order_id = %order_id, "Shipment details updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_round_trips_through_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn american_spelling_of_cancelled_is_accepted() {
        assert_eq!(
            "canceled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn unknown_order_status_is_rejected() {
        assert!("teleported".parse::<OrderStatus>().is_err());
    }
}
