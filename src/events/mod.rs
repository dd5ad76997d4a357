use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the order workflow. Sends are best-effort: a full or
/// closed channel is logged and never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
    },
    PaymentCaptured {
        order_id: Uuid,
        payment_id: String,
    },
    PaymentFailed {
        order_id: Uuid,
    },
    PaymentRefunded {
        order_id: Uuid,
    },
    CouponRedeemed {
        coupon_id: Uuid,
        order_id: Uuid,
    },
    ShipmentRegistered {
        order_id: Uuid,
        shipment_id: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging failures instead of propagating them.
    pub async fn send_best_effort(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Consumes events from the channel and logs them. Runs until every sender
/// has been dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                order_number,
            } => {
                info!(order_id = %order_id, order_number = %order_number, "Order created");
            }
            Event::PaymentCaptured {
                order_id,
                payment_id,
            } => {
                info!(order_id = %order_id, payment_id = %payment_id, "Payment captured");
            }
            Event::PaymentFailed { order_id } => {
                warn!(order_id = %order_id, "Payment failed");
            }
            Event::PaymentRefunded { order_id } => {
                info!(order_id = %order_id, "Payment refunded");
            }
            Event::CouponRedeemed {
                coupon_id,
                order_id,
            } => {
                info!(coupon_id = %coupon_id, order_id = %order_id, "Coupon redeemed");
            }
            Event::ShipmentRegistered {
                order_id,
                shipment_id,
            } => {
                info!(order_id = %order_id, shipment_id = %shipment_id, "Shipment registered");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = %order_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Order status changed"
                );
            }
        }
    }
}
