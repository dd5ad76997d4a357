pub mod checkout;
pub mod coupons;
pub mod orders;
pub mod webhooks;

use crate::services::{CheckoutService, CouponService, OrderService};
use std::sync::Arc;

/// Service handles shared by every request handler.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub coupons: Arc<CouponService>,
    pub checkout: Arc<CheckoutService>,
}
