//! Webhook endpoint controller
//!
//! Single `POST /webhook` entry point. The body arrives as raw `Bytes` so
//! signature verification runs on the wire bytes before anything parses
//! them. Verification and parse failures are the sender's problem and map
//! to 401/400. CRM failures are ours and never change the response: once a
//! delivery is verified and recorded, Shopify gets its 200 so it does not
//! retry-storm the endpoint over a downstream outage.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use shopbridge_crm::SyncOutcome;
use shopbridge_shared::{
    AuditCategory, AuditRecord, AuditStatus, OrderEvent, Topic,
};

use crate::state::AppState;
use crate::verify;

/// Headers Shopify attaches to every delivery
struct DeliveryHeaders {
    topic: Option<String>,
    shop: Option<String>,
    signature: Option<String>,
    webhook_id: Option<String>,
}

impl DeliveryHeaders {
    fn read(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            topic: get("X-Shopify-Topic"),
            shop: get("X-Shopify-Shop-Domain"),
            signature: get("X-Shopify-Hmac-Sha256"),
            webhook_id: get("X-Shopify-Webhook-Id"),
        }
    }
}

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = DeliveryHeaders::read(&headers);

    match process_delivery(&state, &delivery, &body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, webhook_id = ?delivery.webhook_id, "webhook handler failed");
            state.audit.record(webhook_record(
                &delivery,
                AuditStatus::Error,
                format!("unexpected handler error: {e:#}"),
            ));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn process_delivery(
    state: &AppState,
    delivery: &DeliveryHeaders,
    body: &Bytes,
) -> anyhow::Result<Response> {
    // Gate: constant-time HMAC check over the raw body
    if let Err(rejection) =
        verify::check_signature(body, delivery.signature.as_deref(), &state.shopify_api_secret)
    {
        tracing::warn!(
            reason = %rejection,
            webhook_id = ?delivery.webhook_id,
            shop = ?delivery.shop,
            "webhook signature rejected"
        );
        state.audit.record(webhook_record(
            delivery,
            AuditStatus::Error,
            format!("invalid HMAC signature: {rejection}"),
        ));
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid HMAC signature" })),
        )
            .into_response());
    }

    let data: Value = match serde_json::from_slice(body) {
        Ok(data) => data,
        Err(e) => {
            state.audit.record(webhook_record(
                delivery,
                AuditStatus::Error,
                format!("body parse failed: {e}"),
            ));
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "malformed JSON body" })),
            )
                .into_response());
        }
    };

    let order_id = order_id_of(&data);
    tracing::info!(
        topic = ?delivery.topic,
        shop = ?delivery.shop,
        order_id = ?order_id,
        webhook_id = ?delivery.webhook_id,
        "webhook received"
    );

    let mut receipt = webhook_record(delivery, AuditStatus::Success, "webhook received");
    if let Some(id) = &order_id {
        receipt = receipt.with_order_id(id);
    }
    state.audit.record(receipt);

    let topic = delivery.topic.as_deref().and_then(|t| t.parse::<Topic>().ok());
    if topic == Some(Topic::OrdersCreate) {
        // Dedup applies only to deliveries that would synchronize, and an id
        // counts as seen only once its sync succeeded, so a failed sync gets
        // retried on redelivery.
        if let Some(webhook_id) = &delivery.webhook_id {
            if state.tracker.seen_before(webhook_id) {
                state.audit.record(webhook_record(
                    delivery,
                    AuditStatus::Success,
                    "duplicate delivery, synchronization skipped",
                ));
                return Ok(acknowledged());
            }
        }

        let mut outcome_record = match synchronize(state, &data).await {
            Ok(outcome) => {
                if let Some(webhook_id) = &delivery.webhook_id {
                    state.tracker.mark_seen(webhook_id);
                }
                AuditRecord::new(
                    AuditCategory::Crm,
                    AuditStatus::Success,
                    format!(
                        "contact {} and sales order {} created",
                        outcome.contact_id, outcome.sales_order_id
                    ),
                )
            }
            Err(details) => {
                tracing::error!(details = %details, order_id = ?order_id, "CRM synchronization failed");
                AuditRecord::new(AuditCategory::Crm, AuditStatus::Error, details)
            }
        };
        if let Some(id) = &order_id {
            outcome_record = outcome_record.with_order_id(id);
        }
        if let Some(webhook_id) = &delivery.webhook_id {
            outcome_record = outcome_record.with_webhook_id(webhook_id);
        }
        state.audit.record(outcome_record);
    }

    Ok(acknowledged())
}

/// Full synchronization attempt: deserialize, authenticate, create. Returns
/// the audit detail line on failure; failures here never surface to the
/// sender.
async fn synchronize(state: &AppState, data: &Value) -> Result<SyncOutcome, String> {
    let event: OrderEvent = serde_json::from_value(data.clone())
        .map_err(|e| format!("order payload did not deserialize: {e}"))?;

    let session = state
        .crm
        .authenticate()
        .await
        .map_err(|e| format!("CRM authentication failed: {e}"))?;

    state.crm.sync_order(&session, &event).await.map_err(|e| {
        if e.created_contact_id().is_some() {
            format!("partial synchronization: {e}")
        } else {
            format!("CRM synchronization failed: {e}")
        }
    })
}

fn acknowledged() -> Response {
    (StatusCode::OK, "webhook processed").into_response()
}

fn webhook_record(
    delivery: &DeliveryHeaders,
    status: AuditStatus,
    details: impl Into<String>,
) -> AuditRecord {
    let mut record = AuditRecord::new(AuditCategory::Webhook, status, details);
    if let Some(topic) = &delivery.topic {
        record = record.with_topic(topic);
    }
    if let Some(shop) = &delivery.shop {
        record = record.with_shop(shop);
    }
    if let Some(webhook_id) = &delivery.webhook_id {
        record = record.with_webhook_id(webhook_id);
    }
    record
}

/// Shopify order ids are numeric, but tolerate strings too
fn order_id_of(data: &Value) -> Option<String> {
    match data.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
