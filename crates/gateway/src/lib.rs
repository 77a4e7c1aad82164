// Gateway clippy configuration
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shopbridge Webhook Gateway
//!
//! The single externally reachable entry point: receives Shopify webhook
//! deliveries, verifies their HMAC signature against the raw body, records an
//! audit trail, and synchronizes `orders/create` events into vTiger.

pub mod config;
pub mod idempotency;
pub mod routes;
pub mod state;
pub mod verify;
