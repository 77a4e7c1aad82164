//! Low-level vTiger web-service client
//!
//! All operations go to a single `webservice.php` endpoint; the operation is
//! selected by a form/query parameter and every response is a JSON envelope
//! with an explicit `success` flag.

use serde::Deserialize;
use serde_json::Value;

/// Connection settings plus the vTiger record ids stamped onto created
/// elements. The id defaults match a stock vTiger install (admin user,
/// primary currency, placeholder product) and are expected to be overridden
/// per deployment.
#[derive(Debug, Clone)]
pub struct VtigerConfig {
    pub base_url: String,
    pub username: String,
    pub access_key: String,
    pub assigned_user_id: String,
    pub currency_id: String,
    pub product_id: String,
}

impl VtigerConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            access_key: access_key.into(),
            assigned_user_id: "19x1".to_string(),
            currency_id: "21x1".to_string(),
            product_id: "14x1".to_string(),
        }
    }
}

/// Response envelope shared by every web-service operation
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl RpcResponse {
    /// The CRM's own error payload, for diagnostics
    pub fn error_payload(&self) -> String {
        match &self.error {
            Some(error) => error.to_string(),
            None => "(no error detail in response)".to_string(),
        }
    }

    /// String field from the `result` object, if present
    pub fn result_str(&self, key: &str) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.get(key))
            .and_then(Value::as_str)
    }
}

/// Cloneable handle to one vTiger instance. Holds a shared `reqwest::Client`;
/// sessions are not cached here, callers authenticate per attempt.
#[derive(Debug, Clone)]
pub struct VtigerClient {
    http: reqwest::Client,
    config: VtigerConfig,
}

impl VtigerClient {
    pub fn new(config: VtigerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &VtigerConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/webservice.php",
            self.config.base_url.trim_end_matches('/')
        )
    }

    pub(crate) async fn get(
        &self,
        query: &[(&str, &str)],
    ) -> Result<RpcResponse, reqwest::Error> {
        self.http
            .get(self.endpoint())
            .query(query)
            .send()
            .await?
            .json()
            .await
    }

    pub(crate) async fn post_form(
        &self,
        form: &[(&str, &str)],
    ) -> Result<RpcResponse, reqwest::Error> {
        self.http
            .post(self.endpoint())
            .form(form)
            .send()
            .await?
            .json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let with_slash =
            VtigerClient::new(VtigerConfig::new("https://crm.example.com/", "u", "k"));
        let without =
            VtigerClient::new(VtigerConfig::new("https://crm.example.com", "u", "k"));
        assert_eq!(with_slash.endpoint(), "https://crm.example.com/webservice.php");
        assert_eq!(without.endpoint(), "https://crm.example.com/webservice.php");
    }

    #[test]
    fn error_payload_prefers_the_crm_error_body() {
        let resp: RpcResponse = serde_json::from_str(
            r#"{"success": false, "error": {"code": "INVALID_AUTH_TOKEN", "message": "expired"}}"#,
        )
        .unwrap();
        assert!(!resp.success);
        assert!(resp.error_payload().contains("INVALID_AUTH_TOKEN"));

        let empty: RpcResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(empty.error_payload(), "(no error detail in response)");
    }
}
