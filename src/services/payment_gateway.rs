use crate::{config::AppConfig, errors::ServiceError};
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{error, info, instrument};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct CreateGatewayOrderRequest<'a> {
    /// Amount in minor currency units (paise for INR).
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: Option<GatewayErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    description: Option<String>,
}

/// HTTP client for the payment gateway. Creates gateway-side orders ahead of
/// local persistence and verifies the signatures the gateway attaches to
/// client callbacks and webhooks.
#[derive(Clone)]
pub struct PaymentGatewayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl PaymentGatewayClient {
    pub fn new(
        base_url: String,
        key_id: String,
        key_secret: String,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("Failed to build gateway HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            cfg.payment_gateway_base_url.clone(),
            cfg.payment_gateway_key_id.clone(),
            cfg.payment_gateway_key_secret.clone(),
            Duration::from_secs(cfg.payment_gateway_timeout_secs),
        )
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Registers the order with the gateway and returns its id. Amounts are
    /// converted from major to minor units here and nowhere else.
    #[instrument(skip(self), fields(receipt = %receipt))]
    pub async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        let minor_units = (amount * Decimal::from(100)).to_i64().ok_or_else(|| {
            ServiceError::ValidationError(format!("Amount {amount} is not representable"))
        })?;
        if minor_units <= 0 {
            return Err(ServiceError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }

        let url = format!("{}/orders", self.base_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateGatewayOrderRequest {
                amount: minor_units,
                currency,
                receipt,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Payment gateway request failed");
                ServiceError::ExternalServiceError(format!("Payment gateway unreachable: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<GatewayErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.description)
                .unwrap_or_else(|| format!("status {status}"));
            error!(%status, detail = %detail, "Payment gateway rejected order");
            return Err(ServiceError::ExternalServiceError(format!(
                "Payment gateway rejected order: {detail}"
            )));
        }

        let order = response.json::<GatewayOrder>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed gateway response: {e}"))
        })?;

        info!(gateway_order_id = %order.id, "Gateway order created");
        Ok(order)
    }

    /// Checks a payment signature: HMAC-SHA256 of
    /// `"{gateway_order_id}|{payment_id}"` keyed with the API secret, hex
    /// encoded. The comparison does not short-circuit on the first
    /// mismatching byte.
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        verify_hmac_hex(
            self.key_secret.as_bytes(),
            format!("{gateway_order_id}|{payment_id}").as_bytes(),
            signature,
        )
    }
}

/// Computes HMAC-SHA256 over `payload` and compares its hex encoding to
/// `expected_hex` in constant time.
pub fn verify_hmac_hex(secret: &[u8], payload: &[u8], expected_hex: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    let computed = hex::encode(mac.finalize().into_bytes());

    let a = computed.as_bytes();
    let b = expected_hex.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn client() -> PaymentGatewayClient {
        PaymentGatewayClient::new(
            "https://gateway.test".to_string(),
            "key_id".to_string(),
            "key_secret".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn valid_signature_is_accepted() {
        let client = client();
        let sig = sign("key_secret", "order_abc|pay_xyz");
        assert!(client.verify_signature("order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn tampered_payment_id_is_rejected() {
        let client = client();
        let sig = sign("key_secret", "order_abc|pay_xyz");
        assert!(!client.verify_signature("order_abc", "pay_other", &sig));
    }

    #[test]
    fn signature_with_wrong_secret_is_rejected() {
        let client = client();
        let sig = sign("wrong_secret", "order_abc|pay_xyz");
        assert!(!client.verify_signature("order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let client = client();
        let mut sig = sign("key_secret", "order_abc|pay_xyz");
        sig.truncate(10);
        assert!(!client.verify_signature("order_abc", "pay_xyz", &sig));
    }
}
