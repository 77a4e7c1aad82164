// CRM crate clippy configuration
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vTiger CRM integration
//!
//! Client library for the vTiger web-service API (`webservice.php`):
//!
//! - **Session management**: challenge/response login (challenge token →
//!   md5 login key → session name), one fresh session per attempt
//! - **Entity synchronization**: maps a Shopify order event into a Contacts
//!   element and a SalesOrder element, created in that order
//!
//! Every RPC response is an envelope with an explicit `success` flag; any
//! step that comes back without it aborts with the CRM's own error payload
//! attached for diagnostics.

pub mod client;
pub mod error;
pub mod session;
pub mod sync;

// Client
pub use client::{RpcResponse, VtigerClient, VtigerConfig};

// Error
pub use error::{AuthError, SyncError};

// Session
pub use session::CrmSession;

// Sync
pub use sync::SyncOutcome;
