pub mod checkout;
pub mod coupons;
pub mod orders;
pub mod payment_gateway;
pub mod shipping;

pub use checkout::CheckoutService;
pub use coupons::CouponService;
pub use orders::OrderService;
pub use payment_gateway::PaymentGatewayClient;
pub use shipping::ShipmentClient;
