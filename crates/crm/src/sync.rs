//! Order synchronization
//!
//! Maps a Shopify order event into vTiger elements and creates them with the
//! generic `create` operation, contact first, then the sales order referencing
//! the contact. The two writes are not transactional: if the order create
//! fails the contact stays behind, and the error names it so the audit trail
//! gives an operator something to reconcile.

use serde_json::{json, Value};
use shopbridge_shared::shopify::{Address, Customer, OrderEvent};

use crate::client::{RpcResponse, VtigerClient, VtigerConfig};
use crate::error::SyncError;
use crate::session::CrmSession;

/// Ids issued by the CRM for a fully synchronized order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub contact_id: String,
    pub sales_order_id: String,
}

impl VtigerClient {
    /// Synchronize one order: contact, then sales order.
    ///
    /// The sales order create is never attempted if the contact create did
    /// not succeed.
    pub async fn sync_order(
        &self,
        session: &CrmSession,
        event: &OrderEvent,
    ) -> Result<SyncOutcome, SyncError> {
        let customer = event
            .customer
            .as_ref()
            .ok_or_else(|| SyncError::InvalidPayload("order has no customer".to_string()))?;
        let billing = event.billing_address.as_ref().ok_or_else(|| {
            SyncError::InvalidPayload("order has no billing address".to_string())
        })?;

        let contact_id = self.create_contact(session, customer, billing).await?;
        let sales_order_id = self
            .create_sales_order(session, event, &contact_id)
            .await?;

        tracing::info!(
            contact_id = %contact_id,
            sales_order_id = %sales_order_id,
            order_number = ?event.order_number,
            "order synchronized to vTiger"
        );

        Ok(SyncOutcome {
            contact_id,
            sales_order_id,
        })
    }

    /// Create a Contacts element from the order's customer and billing
    /// address; returns the CRM-issued contact id.
    pub async fn create_contact(
        &self,
        session: &CrmSession,
        customer: &Customer,
        address: &Address,
    ) -> Result<String, SyncError> {
        let element = contact_element(customer, address, &self.config().assigned_user_id);
        let resp = self
            .create_element(session, "Contacts", &element)
            .await
            .map_err(|source| SyncError::Transport {
                stage: "create contact",
                source,
            })?;
        if !resp.success {
            return Err(SyncError::ContactRejected(resp.error_payload()));
        }
        created_id(&resp, "Contacts")
    }

    /// Create a SalesOrder element referencing an already-created contact;
    /// returns the CRM-issued order id.
    pub async fn create_sales_order(
        &self,
        session: &CrmSession,
        event: &OrderEvent,
        contact_id: &str,
    ) -> Result<String, SyncError> {
        let element = sales_order_element(event, contact_id, self.config());
        let resp = self
            .create_element(session, "SalesOrder", &element)
            .await
            .map_err(|source| SyncError::Transport {
                stage: "create sales order",
                source,
            })?;
        if !resp.success {
            return Err(SyncError::OrderRejected {
                contact_id: contact_id.to_string(),
                response: resp.error_payload(),
            });
        }
        created_id(&resp, "SalesOrder")
    }

    async fn create_element(
        &self,
        session: &CrmSession,
        element_type: &str,
        element: &Value,
    ) -> Result<RpcResponse, reqwest::Error> {
        let element = element.to_string();
        self.post_form(&[
            ("operation", "create"),
            ("sessionName", session.session_name()),
            ("elementType", element_type),
            ("element", &element),
        ])
        .await
    }
}

fn created_id(resp: &RpcResponse, element_type: &'static str) -> Result<String, SyncError> {
    resp.result_str("id")
        .map(str::to_string)
        .ok_or(SyncError::MissingId { element_type })
}

fn opt(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("")
}

/// Street lines 1 and 2 joined into the single vTiger mailing-street field
fn mailing_street(address: &Address) -> String {
    format!("{} {}", opt(&address.address1), opt(&address.address2))
        .trim()
        .to_string()
}

pub(crate) fn contact_element(
    customer: &Customer,
    address: &Address,
    assigned_user_id: &str,
) -> Value {
    json!({
        "firstname": opt(&customer.first_name),
        "lastname": opt(&customer.last_name),
        "email": opt(&customer.email),
        "phone": opt(&address.phone),
        "mailingstreet": mailing_street(address),
        "mailingcity": opt(&address.city),
        "mailingzip": opt(&address.zip),
        "mailingcountry": opt(&address.country),
        "assigned_user_id": assigned_user_id,
    })
}

/// `paid` maps to an approved order; everything else starts as created
pub(crate) fn order_status(financial_status: Option<&str>) -> &'static str {
    match financial_status {
        Some("paid") => "Approved",
        _ => "Created",
    }
}

pub(crate) fn sales_order_element(
    event: &OrderEvent,
    contact_id: &str,
    config: &VtigerConfig,
) -> Value {
    let empty = Address::default();
    let billing = event.billing_address.as_ref().unwrap_or(&empty);
    let shipping = event.shipping_address.as_ref().unwrap_or(&empty);
    let order_number = event
        .order_number
        .or(event.id)
        .map(|n| n.to_string())
        .unwrap_or_default();

    let lineitems: Vec<Value> = event
        .line_items
        .iter()
        .map(|item| {
            json!({
                "productid": config.product_id,
                "quantity": item.quantity,
                "listprice": opt(&item.price),
            })
        })
        .collect();

    json!({
        "subject": format!("Order #{order_number}"),
        "bill_street": opt(&billing.address1),
        "ship_street": opt(&shipping.address1),
        "bill_city": opt(&billing.city),
        "ship_city": opt(&shipping.city),
        "bill_code": opt(&billing.zip),
        "ship_code": opt(&shipping.zip),
        "bill_country": opt(&billing.country),
        "ship_country": opt(&shipping.country),
        "sostatus": order_status(event.financial_status.as_deref()),
        "currency_id": config.currency_id,
        "conversion_rate": 1,
        "grand_total": opt(&event.total_price),
        "assigned_user_id": config.assigned_user_id,
        "contact_id": contact_id,
        "lineitems": lineitems,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VtigerConfig;
    use mockito::Matcher;
    use shopbridge_shared::shopify::LineItem;

    fn sample_event() -> OrderEvent {
        OrderEvent {
            id: Some(9001),
            order_number: Some(1234),
            financial_status: Some("paid".to_string()),
            total_price: Some("254.98".to_string()),
            currency: Some("EUR".to_string()),
            customer: Some(Customer {
                first_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
                email: Some("jane@example.com".to_string()),
            }),
            billing_address: Some(Address {
                phone: Some("+33 1 23 45 67 89".to_string()),
                address1: Some("1 Rue de Rivoli".to_string()),
                address2: Some("Apt 4".to_string()),
                city: Some("Paris".to_string()),
                zip: Some("75001".to_string()),
                country: Some("France".to_string()),
            }),
            shipping_address: Some(Address {
                address1: Some("2 Avenue Foch".to_string()),
                city: Some("Lyon".to_string()),
                zip: Some("69000".to_string()),
                country: Some("France".to_string()),
                ..Address::default()
            }),
            line_items: vec![
                LineItem {
                    title: Some("Widget".to_string()),
                    quantity: 2,
                    price: Some("99.99".to_string()),
                },
                LineItem {
                    title: Some("Gadget".to_string()),
                    quantity: 1,
                    price: Some("55.00".to_string()),
                },
            ],
        }
    }

    fn client_for(server: &mockito::Server) -> VtigerClient {
        VtigerClient::new(VtigerConfig::new(server.url(), "admin", "secretkey"))
    }

    #[test]
    fn contact_element_maps_the_flat_schema() {
        let event = sample_event();
        let element = contact_element(
            event.customer.as_ref().unwrap(),
            event.billing_address.as_ref().unwrap(),
            "19x1",
        );
        assert_eq!(element["firstname"], "Jane");
        assert_eq!(element["lastname"], "Doe");
        assert_eq!(element["email"], "jane@example.com");
        assert_eq!(element["phone"], "+33 1 23 45 67 89");
        assert_eq!(element["mailingstreet"], "1 Rue de Rivoli Apt 4");
        assert_eq!(element["mailingcity"], "Paris");
        assert_eq!(element["mailingzip"], "75001");
        assert_eq!(element["mailingcountry"], "France");
        assert_eq!(element["assigned_user_id"], "19x1");
    }

    #[test]
    fn mailing_street_trims_missing_lines() {
        let address = Address {
            address1: Some("1 Main St".to_string()),
            ..Address::default()
        };
        assert_eq!(mailing_street(&address), "1 Main St");
        assert_eq!(mailing_street(&Address::default()), "");
    }

    #[test]
    fn financial_status_maps_to_order_status() {
        assert_eq!(order_status(Some("paid")), "Approved");
        assert_eq!(order_status(Some("pending")), "Created");
        assert_eq!(order_status(Some("refunded")), "Created");
        assert_eq!(order_status(None), "Created");
    }

    #[test]
    fn sales_order_element_maps_addresses_status_and_lineitems() {
        let event = sample_event();
        let config = VtigerConfig::new("https://crm.example.com", "admin", "k");
        let element = sales_order_element(&event, "12x77", &config);

        assert_eq!(element["subject"], "Order #1234");
        assert_eq!(element["bill_street"], "1 Rue de Rivoli");
        assert_eq!(element["ship_street"], "2 Avenue Foch");
        assert_eq!(element["bill_city"], "Paris");
        assert_eq!(element["ship_city"], "Lyon");
        assert_eq!(element["sostatus"], "Approved");
        assert_eq!(element["grand_total"], "254.98");
        assert_eq!(element["contact_id"], "12x77");
        assert_eq!(element["currency_id"], "21x1");

        let items = element["lineitems"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["quantity"], 2);
        assert_eq!(items[0]["listprice"], "99.99");
        assert_eq!(items[0]["productid"], "14x1");
    }

    #[tokio::test]
    async fn sync_creates_contact_then_sales_order() {
        let mut server = mockito::Server::new_async().await;

        let contact = server
            .mock("POST", "/webservice.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("operation".into(), "create".into()),
                Matcher::UrlEncoded("sessionName".into(), "sess-1".into()),
                Matcher::UrlEncoded("elementType".into(), "Contacts".into()),
            ]))
            .with_body(r#"{"success": true, "result": {"id": "12x101"}}"#)
            .create_async()
            .await;

        let order = server
            .mock("POST", "/webservice.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("elementType".into(), "SalesOrder".into()),
            ]))
            .with_body(r#"{"success": true, "result": {"id": "13x55"}}"#)
            .create_async()
            .await;

        let session = CrmSession::for_tests("sess-1");
        let outcome = client_for(&server)
            .sync_order(&session, &sample_event())
            .await
            .unwrap();

        assert_eq!(outcome.contact_id, "12x101");
        assert_eq!(outcome.sales_order_id, "13x55");
        contact.assert_async().await;
        order.assert_async().await;
    }

    #[tokio::test]
    async fn failed_contact_create_never_attempts_the_order() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/webservice.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("elementType".into(), "Contacts".into()),
            ]))
            .with_body(
                r#"{"success": false, "error": {"code": "DATABASE_QUERY_ERROR", "message": "dup"}}"#,
            )
            .create_async()
            .await;

        let order = server
            .mock("POST", "/webservice.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("elementType".into(), "SalesOrder".into()),
            ]))
            .expect(0)
            .create_async()
            .await;

        let session = CrmSession::for_tests("sess-1");
        let err = client_for(&server)
            .sync_order(&session, &sample_event())
            .await
            .unwrap_err();

        match &err {
            SyncError::ContactRejected(payload) => {
                assert!(payload.contains("DATABASE_QUERY_ERROR"));
            }
            other => panic!("expected ContactRejected, got {other:?}"),
        }
        assert_eq!(err.created_contact_id(), None);
        order.assert_async().await;
    }

    #[tokio::test]
    async fn order_failure_after_contact_success_names_the_orphaned_contact() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/webservice.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("elementType".into(), "Contacts".into()),
            ]))
            .with_body(r#"{"success": true, "result": {"id": "12x101"}}"#)
            .create_async()
            .await;

        server
            .mock("POST", "/webservice.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("elementType".into(), "SalesOrder".into()),
            ]))
            .with_body(r#"{"success": false, "error": {"message": "mandatory field missing"}}"#)
            .create_async()
            .await;

        let session = CrmSession::for_tests("sess-1");
        let err = client_for(&server)
            .sync_order(&session, &sample_event())
            .await
            .unwrap_err();

        assert_eq!(err.created_contact_id(), Some("12x101"));
    }

    #[tokio::test]
    async fn payload_without_customer_is_rejected_before_any_rpc() {
        let mut server = mockito::Server::new_async().await;
        let any_create = server
            .mock("POST", "/webservice.php")
            .expect(0)
            .create_async()
            .await;

        let mut event = sample_event();
        event.customer = None;

        let session = CrmSession::for_tests("sess-1");
        let err = client_for(&server)
            .sync_order(&session, &event)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::InvalidPayload(_)));
        any_create.assert_async().await;
    }
}
