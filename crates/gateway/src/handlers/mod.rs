//! HTTP request handlers.

pub mod account_handler;
pub mod admin_handler;
pub mod contract_handler;
pub mod health_handler;
pub mod maintenance_handler;
pub mod notification_handler;
pub mod request_handler;

pub use account_handler::{account_routes, session_routes, wallet_routes};
pub use admin_handler::admin_routes;
pub use contract_handler::{contract_routes, offer_routes};
pub use health_handler::health_routes;
pub use maintenance_handler::maintenance_routes;
pub use notification_handler::notification_routes;
pub use request_handler::request_routes;
