use crate::{config::AppConfig, errors::ServiceError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use super::orders::OrderStatus;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// One line of a shipment registration.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentItem {
    pub name: String,
    pub sku: String,
    pub units: i32,
    pub selling_price: Decimal,
}

/// Everything the provider needs to create an adhoc shipment order.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentRequest {
    pub order_id: String,
    pub order_date: String,
    pub pickup_location: String,
    pub billing_customer_name: String,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_pincode: String,
    pub billing_state: String,
    pub billing_country: String,
    pub billing_email: String,
    pub billing_phone: String,
    pub order_items: Vec<ShipmentItem>,
    /// `Prepaid` or `COD`.
    pub payment_method: String,
    pub sub_total: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentResponse {
    pub shipment_id: i64,
    pub order_id: Option<i64>,
    pub awb_code: Option<String>,
    pub courier_name: Option<String>,
    pub status: Option<String>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// HTTP client for the shipment provider. Authenticates with email and
/// password, caching the bearer token until shortly before its TTL runs out.
pub struct ShipmentClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    token_ttl: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl ShipmentClient {
    pub fn new(
        base_url: String,
        email: String,
        password: String,
        token_ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("Failed to build shipment HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            password,
            token_ttl,
            token: Mutex::new(None),
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            cfg.shipment_base_url.clone(),
            cfg.shipment_email.clone(),
            cfg.shipment_password.clone(),
            Duration::from_secs(cfg.shipment_token_ttl_secs),
            Duration::from_secs(cfg.shipment_timeout_secs),
        )
    }

    /// Returns a valid bearer token, logging in again if the cached one has
    /// aged out. The mutex spans the whole refresh so concurrent callers do
    /// not stampede the login endpoint.
    async fn bearer_token(&self) -> Result<String, ServiceError> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let url = format!("{}/auth/login", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&LoginRequest {
                email: &self.email,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Shipment provider login request failed");
                ServiceError::ExternalServiceError(format!("Shipment provider unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "Shipment provider login rejected");
            return Err(ServiceError::ExternalServiceError(format!(
                "Shipment provider login failed with status {status}"
            )));
        }

        let body = response.json::<LoginResponse>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed login response: {e}"))
        })?;

        // Refresh a minute early so an in-flight request never carries a
        // token that expires mid-call.
        let ttl = self.token_ttl.saturating_sub(Duration::from_secs(60));
        *guard = Some(CachedToken {
            token: body.token.clone(),
            expires_at: Instant::now() + ttl,
        });

        info!("Shipment provider token refreshed");
        Ok(body.token)
    }

    /// Registers a shipment for a placed order.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn register_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<ShipmentResponse, ServiceError> {
        let token = self.bearer_token().await?;

        let url = format!("{}/orders/create/adhoc", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Shipment registration request failed");
                ServiceError::ExternalServiceError(format!("Shipment provider unreachable: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "Shipment registration rejected");
            return Err(ServiceError::ExternalServiceError(format!(
                "Shipment registration failed with status {status}"
            )));
        }

        let shipment = response.json::<ShipmentResponse>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed shipment response: {e}"))
        })?;

        info!(shipment_id = shipment.shipment_id, "Shipment registered");
        Ok(shipment)
    }
}

/// Maps a courier tracking status onto the order's fulfillment state.
/// Unrecognized statuses are treated as still in processing rather than
/// rejected, since couriers add intermediate states without notice.
pub fn map_courier_status(courier_status: &str) -> OrderStatus {
    let normalized = courier_status.trim().to_lowercase();
    match normalized.as_str() {
        "pickup scheduled" | "pickup generated" | "manifest generated" => OrderStatus::Processing,
        "picked up" | "shipped" | "in transit" | "out for delivery" => OrderStatus::Shipped,
        "delivered" => OrderStatus::Delivered,
        "cancelled" | "canceled" | "rto initiated" | "rto delivered" => OrderStatus::Cancelled,
        other => {
            warn!(courier_status = %other, "Unrecognized courier status, keeping order in processing");
            OrderStatus::Processing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Pickup Scheduled", OrderStatus::Processing)]
    #[case("Pickup Generated", OrderStatus::Processing)]
    #[case("Picked Up", OrderStatus::Shipped)]
    #[case("In Transit", OrderStatus::Shipped)]
    #[case("Out For Delivery", OrderStatus::Shipped)]
    #[case("Delivered", OrderStatus::Delivered)]
    #[case("Cancelled", OrderStatus::Cancelled)]
    #[case("RTO Initiated", OrderStatus::Cancelled)]
    #[case("RTO Delivered", OrderStatus::Cancelled)]
    fn courier_statuses_map_to_fulfillment_states(
        #[case] courier: &str,
        #[case] expected: OrderStatus,
    ) {
        assert_eq!(map_courier_status(courier), expected);
    }

    #[test]
    fn unknown_courier_status_stays_in_processing() {
        assert_eq!(
            map_courier_status("Lost In Warehouse"),
            OrderStatus::Processing
        );
    }
}
