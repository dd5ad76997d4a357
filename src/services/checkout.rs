use crate::{
    config::AppConfig,
    db::DbPool,
    entities::order,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::coupons::CouponService;
use super::orders::{
    OrderDraft, OrderItemDraft, OrderService, OrderStatus, PaymentStatus,
};
use super::payment_gateway::{verify_hmac_hex, PaymentGatewayClient};
use super::shipping::{map_courier_status, ShipmentClient, ShipmentItem, ShipmentRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Online,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Cod => "cod",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" | "prepaid" => Ok(Self::Online),
            "cod" | "cash_on_delivery" => Ok(Self::Cod),
            other => Err(ServiceError::ValidationError(format!(
                "Unknown payment method: {other}"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckoutItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ShippingAddressRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 4, max = 10))]
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 7, max = 20))]
    pub customer_phone: String,
    #[validate(length(min = 1))]
    pub items: Vec<CheckoutItemRequest>,
    #[validate]
    pub shipping_address: ShippingAddressRequest,
    /// `online` or `cod`.
    pub payment_method: String,
    pub coupon_code: Option<String>,
    /// Client-supplied key for safe retries. Two checkouts with the same
    /// key return the same order.
    #[validate(length(min = 8, max = 128))]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub cod_surcharge: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    /// Present for online payments; the client hands this to the gateway SDK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_key_id: Option<String>,
    /// True when an existing order was returned for a repeated
    /// idempotency key.
    pub idempotent_replay: bool,
}

impl CheckoutResponse {
    fn from_order(order: &order::Model, gateway_key_id: Option<String>, replay: bool) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            status: order.status.clone(),
            payment_status: order.payment_status.clone(),
            subtotal: order.subtotal,
            discount: order.discount,
            shipping_cost: order.shipping_cost,
            tax: order.tax,
            cod_surcharge: order.cod_surcharge,
            total_amount: order.total_amount,
            currency: order.currency.clone(),
            gateway_order_id: order.gateway_order_id.clone(),
            gateway_key_id: if order.gateway_order_id.is_some() {
                gateway_key_id
            } else {
                None
            },
            idempotent_replay: replay,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1))]
    pub gateway_order_id: String,
    #[validate(length(min = 1))]
    pub payment_id: String,
    #[validate(length(min = 1))]
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
}

#[derive(Debug, Deserialize)]
struct PaymentWebhookEnvelope {
    event: String,
    payload: PaymentWebhookPayload,
}

#[derive(Debug, Deserialize)]
struct PaymentWebhookPayload {
    payment: PaymentWebhookEntityWrapper,
}

#[derive(Debug, Deserialize)]
struct PaymentWebhookEntityWrapper {
    entity: PaymentWebhookEntity,
}

#[derive(Debug, Deserialize)]
struct PaymentWebhookEntity {
    id: String,
    order_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShipmentWebhookRequest {
    /// Our order number, echoed back by the courier aggregator.
    pub order_id: String,
    pub current_status: String,
    pub awb_code: Option<String>,
    pub courier_name: Option<String>,
    pub shipment_id: Option<i64>,
}

/// Pricing knobs snapshotted from configuration at startup.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    pub cod_surcharge: Decimal,
    pub tax_rate: Decimal,
}

impl PricingConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            free_shipping_threshold: decimal_from_f64(cfg.free_shipping_threshold),
            flat_shipping_fee: decimal_from_f64(cfg.flat_shipping_fee),
            cod_surcharge: decimal_from_f64(cfg.cod_surcharge),
            tax_rate: decimal_from_f64(cfg.tax_rate),
        }
    }
}

fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub cod_surcharge: Decimal,
    pub total: Decimal,
}

/// Computes the order charge breakdown. Shipping is waived when the
/// undiscounted subtotal reaches the free-shipping threshold; tax applies to
/// the discounted subtotal and is rounded to two decimal places.
pub fn compute_totals(
    pricing: &PricingConfig,
    subtotal: Decimal,
    discount: Decimal,
    payment_method: PaymentMethod,
) -> OrderTotals {
    let shipping_cost = if subtotal >= pricing.free_shipping_threshold {
        Decimal::ZERO
    } else {
        pricing.flat_shipping_fee
    };

    let taxable = subtotal - discount;
    let tax = (taxable * pricing.tax_rate).round_dp(2);

    let cod_surcharge = match payment_method {
        PaymentMethod::Cod => pricing.cod_surcharge,
        PaymentMethod::Online => Decimal::ZERO,
    };

    let total = subtotal - discount + shipping_cost + tax + cod_surcharge;

    OrderTotals {
        subtotal,
        discount,
        shipping_cost,
        tax,
        cod_surcharge,
        total,
    }
}

/// Orchestrates the order lifecycle: repricing, coupon redemption, gateway
/// order creation, persistence, payment verification, and both webhook
/// ingestion paths.
pub struct CheckoutService {
    db: Arc<DbPool>,
    orders: Arc<OrderService>,
    coupons: Arc<CouponService>,
    gateway: Arc<PaymentGatewayClient>,
    shipping: Arc<ShipmentClient>,
    event_sender: Arc<EventSender>,
    pricing: PricingConfig,
    currency: String,
    webhook_secret: Option<String>,
    pickup_location: String,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DbPool>,
        orders: Arc<OrderService>,
        coupons: Arc<CouponService>,
        gateway: Arc<PaymentGatewayClient>,
        shipping: Arc<ShipmentClient>,
        event_sender: Arc<EventSender>,
        cfg: &AppConfig,
    ) -> Self {
        Self {
            db,
            orders,
            coupons,
            gateway,
            shipping,
            event_sender,
            pricing: PricingConfig::from_app_config(cfg),
            currency: cfg.default_currency.clone(),
            webhook_secret: cfg.payment_webhook_secret.clone(),
            pickup_location: cfg.shipment_pickup_location.clone(),
        }
    }

    /// Places an order. Online orders come back `pending` with a gateway
    /// order id for the client to pay against; cash-on-delivery orders are
    /// confirmed immediately and handed to the shipment provider.
    #[instrument(skip(self, req), fields(customer_id = %req.customer_id))]
    pub async fn checkout(&self, req: CheckoutRequest) -> Result<CheckoutResponse, ServiceError> {
        req.validate()?;
        let payment_method: PaymentMethod = req.payment_method.parse()?;

        if let Some(key) = req.idempotency_key.as_deref() {
            if let Some(existing) = self.orders.find_by_idempotency_key(key).await? {
                info!(order_number = %existing.order_number, "Idempotent checkout replay");
                return Ok(CheckoutResponse::from_order(
                    &existing,
                    Some(self.gateway.key_id().to_string()),
                    true,
                ));
            }
        }

        let items = self.reprice_items(&req.items).await?;
        let subtotal: Decimal = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();

        // An invalid coupon degrades to no discount instead of failing the
        // checkout. Redeeming before the gateway call keeps the limited-use
        // window closed while the order is in flight; a downstream failure
        // gives the use back.
        let mut discount = Decimal::ZERO;
        let mut redeemed: Option<(Uuid, String)> = None;
        if let Some(code) = req.coupon_code.as_deref() {
            match self.coupons.validate(code, req.customer_id, subtotal).await {
                Ok((coupon, amount)) => match self.coupons.redeem(coupon.id).await {
                    Ok(()) => {
                        discount = amount;
                        redeemed = Some((coupon.id, coupon.code));
                    }
                    Err(e) => {
                        warn!(code = %code, error = %e, "Coupon lost redemption race, proceeding without discount");
                    }
                },
                Err(ServiceError::ValidationError(reason)) => {
                    warn!(code = %code, reason = %reason, "Coupon rejected, proceeding without discount");
                }
                Err(e) => return Err(e),
            }
        }

        let totals = compute_totals(&self.pricing, subtotal, discount, payment_method);
        if totals.total <= Decimal::ZERO {
            if let Some((coupon_id, _)) = redeemed {
                self.coupons.release(coupon_id).await;
            }
            return Err(ServiceError::ValidationError(
                "Order total must be positive".to_string(),
            ));
        }

        let order_number = match self.orders.generate_order_number().await {
            Ok(n) => n,
            Err(e) => {
                if let Some((coupon_id, _)) = redeemed {
                    self.coupons.release(coupon_id).await;
                }
                return Err(e);
            }
        };

        let gateway_order_id = if payment_method == PaymentMethod::Online {
            match self
                .gateway
                .create_order(totals.total, &self.currency, &order_number)
                .await
            {
                Ok(gw) => Some(gw.id),
                Err(e) => {
                    error!(order_number = %order_number, error = %e, "Gateway order creation failed");
                    if let Some((coupon_id, _)) = redeemed {
                        self.coupons.release(coupon_id).await;
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };

        let (status, payment_status) = match payment_method {
            PaymentMethod::Online => (OrderStatus::Pending, PaymentStatus::Pending),
            PaymentMethod::Cod => (OrderStatus::Confirmed, PaymentStatus::Pending),
        };

        let draft = OrderDraft {
            order_number: order_number.clone(),
            customer_id: req.customer_id,
            customer_name: req.customer_name,
            customer_email: req.customer_email,
            customer_phone: req.customer_phone,
            items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping_cost: totals.shipping_cost,
            tax: totals.tax,
            cod_surcharge: totals.cod_surcharge,
            total_amount: totals.total,
            currency: self.currency.clone(),
            coupon_code: redeemed.as_ref().map(|(_, code)| code.clone()),
            payment_method: payment_method.to_string(),
            payment_status,
            status,
            gateway_order_id,
            shipping_name: req.shipping_address.name,
            shipping_phone: req.shipping_address.phone,
            shipping_address: req.shipping_address.address,
            shipping_city: req.shipping_address.city,
            shipping_state: req.shipping_address.state,
            shipping_pincode: req.shipping_address.pincode,
            shipping_country: req.shipping_address.country,
            idempotency_key: req.idempotency_key,
        };

        let order = match self.orders.create_order(draft).await {
            Ok(order) => order,
            Err(e) => {
                if let Some((coupon_id, _)) = redeemed {
                    self.coupons.release(coupon_id).await;
                }
                return Err(e);
            }
        };

        if let Some((coupon_id, _)) = redeemed {
            if let Err(e) = self
                .coupons
                .record_usage(coupon_id, order.id, order.customer_id, discount)
                .await
            {
                warn!(order_id = %order.id, error = %e, "Failed to record coupon usage");
            }
        }

        // COD orders skip payment and ship straight away. Registration
        // failures are logged, never surfaced; the order stands.
        if payment_method == PaymentMethod::Cod {
            if let Err(e) = self.register_shipment_for_order(&order).await {
                warn!(order_number = %order.order_number, error = %e, "Shipment registration failed, order remains confirmed");
            }
        }

        let order = self
            .orders
            .get_by_order_number(&order.order_number)
            .await?
            .unwrap_or(order);

        Ok(CheckoutResponse::from_order(
            &order,
            Some(self.gateway.key_id().to_string()),
            false,
        ))
    }

    /// Client-side payment confirmation. A bad signature is rejected without
    /// touching the order; the gateway webhook remains the fallback path.
    #[instrument(skip(self, req))]
    pub async fn verify_payment(
        &self,
        req: VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, ServiceError> {
        req.validate()?;

        let order = self
            .orders
            .find_by_gateway_order_id(&req.gateway_order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No order for gateway order {}",
                    req.gateway_order_id
                ))
            })?;

        if !self
            .gateway
            .verify_signature(&req.gateway_order_id, &req.payment_id, &req.signature)
        {
            warn!(order_number = %order.order_number, "Payment signature mismatch");
            return Err(ServiceError::PaymentFailed(
                "Payment signature verification failed".to_string(),
            ));
        }

        self.mark_payment_captured(&order, &req.payment_id).await?;

        let order = self
            .orders
            .get_by_order_number(&order.order_number)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Order vanished after update".to_string())
            })?;

        Ok(VerifyPaymentResponse {
            order_number: order.order_number,
            status: order.status,
            payment_status: order.payment_status,
        })
    }

    /// Ingests a payment gateway webhook. The raw body is authenticated with
    /// the webhook secret before parsing. Replays land on the same target
    /// state, so handling is idempotent.
    #[instrument(skip(self, body, signature))]
    pub async fn handle_payment_webhook(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<(), ServiceError> {
        let secret = self.webhook_secret.as_deref().ok_or_else(|| {
            ServiceError::Unauthorized("Webhook secret not configured".to_string())
        })?;

        if !verify_hmac_hex(secret.as_bytes(), body, signature) {
            return Err(ServiceError::Unauthorized(
                "Invalid webhook signature".to_string(),
            ));
        }

        let envelope: PaymentWebhookEnvelope = serde_json::from_slice(body)?;
        let payment = &envelope.payload.payment.entity;

        let order = match self
            .orders
            .find_by_gateway_order_id(&payment.order_id)
            .await?
        {
            Some(order) => order,
            None => {
                // Webhooks can outrun order persistence or describe orders
                // from another environment. Acknowledge and move on.
                warn!(gateway_order_id = %payment.order_id, "Webhook for unknown order, ignoring");
                return Ok(());
            }
        };

        match envelope.event.as_str() {
            "payment.captured" => {
                self.mark_payment_captured(&order, &payment.id).await?;
            }
            "payment.failed" => {
                self.orders
                    .update_payment_status(order.id, PaymentStatus::Failed, Some(payment.id.clone()))
                    .await?;
                self.event_sender
                    .send_best_effort(Event::PaymentFailed { order_id: order.id })
                    .await;
            }
            "refund.created" => {
                self.orders
                    .update_payment_status(order.id, PaymentStatus::Refunded, None)
                    .await?;
                self.event_sender
                    .send_best_effort(Event::PaymentRefunded { order_id: order.id })
                    .await;
            }
            other => {
                info!(event = %other, "Ignoring unhandled webhook event");
            }
        }

        Ok(())
    }

    /// Ingests a courier tracking webhook and moves the order's fulfillment
    /// state accordingly.
    #[instrument(skip(self, req), fields(order_number = %req.order_id))]
    pub async fn handle_shipment_webhook(
        &self,
        req: ShipmentWebhookRequest,
    ) -> Result<(), ServiceError> {
        let order = self
            .orders
            .get_by_order_number(&req.order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", req.order_id))
            })?;

        let new_status = map_courier_status(&req.current_status);
        let old_status = order.status.clone();

        if req.awb_code.is_some() || req.courier_name.is_some() || req.shipment_id.is_some() {
            self.orders
                .update_shipment_details(
                    order.id,
                    req.shipment_id.map(|id| id.to_string()),
                    req.awb_code,
                    req.courier_name,
                )
                .await?;
        }

        if old_status != new_status.to_string() {
            self.orders.update_order_status(order.id, new_status).await?;
            self.event_sender
                .send_best_effort(Event::OrderStatusChanged {
                    order_id: order.id,
                    old_status,
                    new_status: new_status.to_string(),
                })
                .await;
        }

        Ok(())
    }

    /// Applies the paid target state and kicks off fulfillment. Safe to call
    /// more than once for the same order; the shipment guard makes replays
    /// single-shot.
    async fn mark_payment_captured(
        &self,
        order: &order::Model,
        payment_id: &str,
    ) -> Result<(), ServiceError> {
        self.orders
            .update_payment_status(order.id, PaymentStatus::Paid, Some(payment_id.to_string()))
            .await?;

        if order.status == OrderStatus::Pending.to_string() {
            self.orders
                .update_order_status(order.id, OrderStatus::Confirmed)
                .await?;
        }

        self.event_sender
            .send_best_effort(Event::PaymentCaptured {
                order_id: order.id,
                payment_id: payment_id.to_string(),
            })
            .await;

        let order = self
            .orders
            .get_by_order_number(&order.order_number)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Order vanished after update".to_string())
            })?;

        if let Err(e) = self.register_shipment_for_order(&order).await {
            warn!(order_number = %order.order_number, error = %e, "Shipment registration failed, payment state stands");
        }

        Ok(())
    }

    /// Registers the order with the shipment provider unless it already has
    /// a shipment. The guard is what makes duplicate payment webhooks
    /// produce exactly one shipment.
    async fn register_shipment_for_order(
        &self,
        order: &order::Model,
    ) -> Result<(), ServiceError> {
        if order.shipment_id.is_some() {
            info!(order_number = %order.order_number, "Shipment already registered, skipping");
            return Ok(());
        }

        let items = self.orders.get_order_items(order.id).await?;
        let request = ShipmentRequest {
            order_id: order.order_number.clone(),
            order_date: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            pickup_location: self.pickup_location.clone(),
            billing_customer_name: order.shipping_name.clone(),
            billing_address: order.shipping_address.clone(),
            billing_city: order.shipping_city.clone(),
            billing_pincode: order.shipping_pincode.clone(),
            billing_state: order.shipping_state.clone(),
            billing_country: order.shipping_country.clone(),
            billing_email: order.customer_email.clone(),
            billing_phone: order.shipping_phone.clone(),
            order_items: items
                .into_iter()
                .map(|i| ShipmentItem {
                    name: i.name,
                    sku: i.sku,
                    units: i.quantity,
                    selling_price: i.unit_price,
                })
                .collect(),
            payment_method: match order.payment_method.parse::<PaymentMethod>() {
                Ok(PaymentMethod::Cod) => "COD".to_string(),
                _ => "Prepaid".to_string(),
            },
            sub_total: order.total_amount,
        };

        let shipment = self.shipping.register_shipment(&request).await?;

        self.orders
            .update_shipment_details(
                order.id,
                Some(shipment.shipment_id.to_string()),
                shipment.awb_code,
                shipment.courier_name,
            )
            .await?;
        self.orders
            .update_order_status(order.id, OrderStatus::Processing)
            .await?;

        self.event_sender
            .send_best_effort(Event::ShipmentRegistered {
                order_id: order.id,
                shipment_id: shipment.shipment_id.to_string(),
            })
            .await;

        Ok(())
    }

    /// Reprices each line from the catalog. Unknown or inactive products
    /// fail the whole checkout.
    async fn reprice_items(
        &self,
        items: &[CheckoutItemRequest],
    ) -> Result<Vec<OrderItemDraft>, ServiceError> {
        let mut drafts = Vec::with_capacity(items.len());
        for item in items {
            let product = ProductEntity::find()
                .filter(product::Column::Id.eq(item.product_id))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "Product {} not found",
                        item.product_id
                    ))
                })?;

            if !product.is_active {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} is unavailable",
                    product.name
                )));
            }

            drafts.push(OrderItemDraft {
                product_id: product.id,
                name: product.name,
                sku: product.sku,
                unit_price: product.price,
                quantity: item.quantity,
                size: item.size.clone(),
                color: item.color.clone(),
                image_url: product.image_url,
            });
        }
        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pricing() -> PricingConfig {
        PricingConfig {
            free_shipping_threshold: dec!(999),
            flat_shipping_fee: dec!(99),
            cod_surcharge: dec!(10),
            tax_rate: dec!(0),
        }
    }

    #[test]
    fn subtotal_below_threshold_pays_flat_shipping() {
        let t = compute_totals(&pricing(), dec!(500), dec!(0), PaymentMethod::Online);
        assert_eq!(t.shipping_cost, dec!(99));
        assert_eq!(t.total, dec!(599));
    }

    #[test]
    fn subtotal_at_threshold_ships_free() {
        let t = compute_totals(&pricing(), dec!(999), dec!(0), PaymentMethod::Online);
        assert_eq!(t.shipping_cost, dec!(0));
        assert_eq!(t.total, dec!(999));
    }

    #[test]
    fn free_shipping_is_judged_on_undiscounted_subtotal() {
        // Discount pulls the payable below the threshold, shipping stays free.
        let t = compute_totals(&pricing(), dec!(1000), dec!(200), PaymentMethod::Online);
        assert_eq!(t.shipping_cost, dec!(0));
        assert_eq!(t.total, dec!(800));
    }

    #[test]
    fn cod_orders_carry_the_surcharge() {
        let t = compute_totals(&pricing(), dec!(500), dec!(0), PaymentMethod::Cod);
        assert_eq!(t.cod_surcharge, dec!(10));
        assert_eq!(t.total, dec!(609));
    }

    #[test]
    fn tax_applies_to_the_discounted_subtotal() {
        let mut p = pricing();
        p.tax_rate = dec!(0.05);
        let t = compute_totals(&p, dec!(1000), dec!(100), PaymentMethod::Online);
        assert_eq!(t.tax, dec!(45.00));
        assert_eq!(t.total, dec!(945.00));
    }

    #[test]
    fn tax_is_rounded_to_two_decimals() {
        let mut p = pricing();
        p.tax_rate = dec!(0.0333);
        let t = compute_totals(&p, dec!(1001), dec!(0), PaymentMethod::Online);
        assert_eq!(t.tax, dec!(33.33));
    }

    #[test]
    fn checkout_request_with_no_items_fails_validation() {
        let req = CheckoutRequest {
            customer_id: Uuid::new_v4(),
            customer_name: "Asha Rao".to_string(),
            customer_email: "asha@example.com".to_string(),
            customer_phone: "9876543210".to_string(),
            items: Vec::new(),
            shipping_address: ShippingAddressRequest {
                name: "Asha Rao".to_string(),
                phone: "9876543210".to_string(),
                address: "14 MG Road".to_string(),
                city: "Bengaluru".to_string(),
                state: "Karnataka".to_string(),
                pincode: "560001".to_string(),
                country: "India".to_string(),
            },
            payment_method: "cod".to_string(),
            coupon_code: None,
            idempotency_key: None,
        };

        assert!(req.validate().is_err());
    }

    #[test]
    fn payment_method_parses_aliases() {
        assert_eq!("prepaid".parse::<PaymentMethod>().unwrap(), PaymentMethod::Online);
        assert_eq!(
            "cash_on_delivery".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Cod
        );
        assert!("barter".parse::<PaymentMethod>().is_err());
    }
}
