// Shared crate clippy configuration
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shopbridge shared building blocks
//!
//! Types used by every shopbridge binary: the append-only audit log and the
//! Shopify domain types (webhook topics, order payloads).

pub mod audit;
pub mod shopify;

// Audit
pub use audit::{AuditCategory, AuditLog, AuditRecord, AuditStatus, MemorySink};

// Shopify
pub use shopify::{Address, Customer, LineItem, OrderEvent, Topic, UnknownTopic};
