//! Shopify domain types
//!
//! Webhook topics and the slice of the `orders/*` payload the CRM
//! synchronizer consumes. Payload structs are deliberately permissive: every
//! nested field is optional so partial payloads still deserialize, and the
//! synchronizer enforces what it actually needs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The webhook topics this bridge subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    OrdersCreate,
    OrdersCancelled,
    OrdersEdited,
    OrdersFulfilled,
    OrdersPaid,
    OrdersUpdated,
}

impl Topic {
    /// Every topic the registrar subscribes, in registration order
    pub const ALL: [Topic; 6] = [
        Topic::OrdersCreate,
        Topic::OrdersCancelled,
        Topic::OrdersEdited,
        Topic::OrdersFulfilled,
        Topic::OrdersPaid,
        Topic::OrdersUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::OrdersCreate => "orders/create",
            Topic::OrdersCancelled => "orders/cancelled",
            Topic::OrdersEdited => "orders/edited",
            Topic::OrdersFulfilled => "orders/fulfilled",
            Topic::OrdersPaid => "orders/paid",
            Topic::OrdersUpdated => "orders/updated",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header value did not match any subscribed topic. The gateway treats this
/// as "no synchronization", not as a rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown webhook topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// Customer block of an order payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Billing or shipping address block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub phone: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// One order line item. Shopify sends money amounts as decimal strings;
/// they are passed through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub title: Option<String>,
    pub quantity: u32,
    pub price: Option<String>,
}

/// The slice of an `orders/*` webhook payload used for CRM synchronization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderEvent {
    pub id: Option<u64>,
    pub order_number: Option<u64>,
    pub financial_status: Option<String>,
    pub total_price: Option<String>,
    pub currency: Option<String>,
    pub customer: Option<Customer>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub line_items: Vec<LineItem>,
}
