//! Error types for the vTiger integration

use thiserror::Error;

/// Challenge/response login failure. Rejections carry the CRM's own error
/// payload so the audit trail can show what the server actually said.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("challenge request rejected by CRM: {0}")]
    ChallengeRejected(String),

    #[error("login rejected by CRM: {0}")]
    LoginRejected(String),

    #[error("challenge response missing token")]
    MissingToken,

    #[error("login response missing session name")]
    MissingSession,

    #[error("transport error during {stage}: {source}")]
    Transport {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Entity synchronization failure. The two create steps are sequential and
/// non-transactional: an order rejection after a successful contact create
/// names the orphaned contact so an operator can reconcile it.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("order payload unusable for synchronization: {0}")]
    InvalidPayload(String),

    #[error("contact create rejected by CRM: {0}")]
    ContactRejected(String),

    #[error("sales order create rejected by CRM (contact {contact_id} already created): {response}")]
    OrderRejected {
        contact_id: String,
        response: String,
    },

    #[error("create response for {element_type} missing record id")]
    MissingId { element_type: &'static str },

    #[error("transport error during {stage}: {source}")]
    Transport {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl SyncError {
    /// Id of the contact that was created before the failure, if any
    pub fn created_contact_id(&self) -> Option<&str> {
        match self {
            SyncError::OrderRejected { contact_id, .. } => Some(contact_id),
            _ => None,
        }
    }
}
