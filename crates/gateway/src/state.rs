//! Application state

use std::sync::Arc;

use shopbridge_crm::VtigerClient;
use shopbridge_shared::AuditLog;

use crate::config::Config;
use crate::idempotency::{DeliveryTracker, NoopTracker};

/// Shared application state. Per-request handling is stateless; the only
/// cross-request pieces are the CRM client's connection pool, the audit
/// queue, and the (optional) delivery tracker.
#[derive(Clone)]
pub struct AppState {
    pub shopify_api_secret: String,
    pub crm: VtigerClient,
    pub audit: AuditLog,
    pub tracker: Arc<dyn DeliveryTracker>,
}

impl AppState {
    pub fn new(config: &Config, audit: AuditLog) -> Self {
        Self {
            shopify_api_secret: config.shopify_api_secret.clone(),
            crm: VtigerClient::new(config.vtiger.clone()),
            audit,
            tracker: Arc::new(NoopTracker),
        }
    }

    /// Swap in a dedup policy (default is no dedup)
    pub fn with_tracker(mut self, tracker: Arc<dyn DeliveryTracker>) -> Self {
        self.tracker = tracker;
        self
    }
}
