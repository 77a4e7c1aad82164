// Registrar clippy configuration
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shopbridge webhook registrar
//!
//! One-shot administrative tool that reconciles Shopify webhook
//! subscriptions against the gateway endpoint:
//!
//! - `list`: print the store's current subscriptions
//! - `clear`: delete every existing subscription
//! - `sync` (the default): delete existing subscriptions, then create one
//!   per order topic pointing at `WEBHOOK_ADDRESS`
//!
//! Plain request/response glue over the Shopify admin REST API; no state of
//! its own. The gateway never calls this at runtime.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::json;

use shopbridge_shared::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Clear,
    Sync,
}

#[derive(Debug, Deserialize)]
struct WebhookSubscription {
    id: u64,
    topic: String,
    address: String,
}

#[derive(Debug, Deserialize)]
struct WebhookList {
    webhooks: Vec<WebhookSubscription>,
}

struct ShopifyAdmin {
    http: reqwest::Client,
    store_domain: String,
    access_token: String,
    api_version: String,
}

impl ShopifyAdmin {
    fn from_env() -> anyhow::Result<Self> {
        let store_domain = require_env("SHOPIFY_STORE_DOMAIN")?;
        let access_token = require_env("SHOPIFY_ADMIN_ACCESS_TOKEN")?;
        let api_version = std::env::var("SHOPIFY_API_VERSION")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "2025-04".to_string());
        Ok(Self {
            http: reqwest::Client::new(),
            store_domain,
            access_token,
            api_version,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "https://{}/admin/api/{}/{path}",
            self.store_domain, self.api_version
        )
    }

    async fn list_subscriptions(&self) -> anyhow::Result<Vec<WebhookSubscription>> {
        let response = self
            .http
            .get(self.url("webhooks.json"))
            .header("X-Shopify-Access-Token", &self.access_token)
            .send()
            .await
            .context("listing webhook subscriptions")?;
        if !response.status().is_success() {
            bail!(
                "listing webhook subscriptions failed: {} {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        let list: WebhookList = response
            .json()
            .await
            .context("decoding webhook subscription list")?;
        Ok(list.webhooks)
    }

    async fn delete_subscription(&self, id: u64) -> anyhow::Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("webhooks/{id}.json")))
            .header("X-Shopify-Access-Token", &self.access_token)
            .send()
            .await
            .with_context(|| format!("deleting webhook subscription {id}"))?;
        if !response.status().is_success() {
            bail!(
                "deleting webhook subscription {id} failed: {} {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        tracing::info!(id = id, "webhook subscription deleted");
        Ok(())
    }

    async fn create_subscription(&self, topic: Topic, address: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .post(self.url("webhooks.json"))
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&json!({
                "webhook": {
                    "topic": topic.as_str(),
                    "address": address,
                    "format": "json",
                }
            }))
            .send()
            .await
            .with_context(|| format!("creating webhook subscription for {topic}"))?;
        if !response.status().is_success() {
            bail!(
                "creating webhook subscription for {topic} failed: {} {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        tracing::info!(topic = %topic, address = address, "webhook subscription created");
        Ok(())
    }
}

fn require_env(name: &'static str) -> anyhow::Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("required environment variable {name} is not set"))
}

fn parse_command(arg: Option<&str>) -> anyhow::Result<Command> {
    match arg {
        None | Some("sync") => Ok(Command::Sync),
        Some("list") => Ok(Command::List),
        Some("clear") => Ok(Command::Clear),
        Some(other) => bail!("unknown command: {other} (expected list, clear, or sync)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_command(args.get(1).map(String::as_str))?;

    let admin = ShopifyAdmin::from_env()?;

    match command {
        Command::List => {
            let subscriptions = admin.list_subscriptions().await?;
            if subscriptions.is_empty() {
                println!("no webhook subscriptions");
            }
            for sub in subscriptions {
                println!("{}\t{}\t{}", sub.id, sub.topic, sub.address);
            }
        }
        Command::Clear => {
            for sub in admin.list_subscriptions().await? {
                admin.delete_subscription(sub.id).await?;
            }
        }
        Command::Sync => {
            let address = require_env("WEBHOOK_ADDRESS")?;
            // start from a clean slate so stale endpoints never linger
            for sub in admin.list_subscriptions().await? {
                admin.delete_subscription(sub.id).await?;
            }
            for topic in Topic::ALL {
                admin.create_subscription(topic, &address).await?;
            }
            tracing::info!(
                count = Topic::ALL.len(),
                address = %address,
                "webhook subscriptions synchronized"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_defaults_to_sync() {
        assert_eq!(parse_command(None).unwrap(), Command::Sync);
        assert_eq!(parse_command(Some("list")).unwrap(), Command::List);
        assert_eq!(parse_command(Some("clear")).unwrap(), Command::Clear);
        assert!(parse_command(Some("frobnicate")).is_err());
    }

    #[test]
    fn subscription_list_decodes() {
        let list: WebhookList = serde_json::from_str(
            r#"{"webhooks": [
                {"id": 1001, "topic": "orders/create", "address": "https://bridge.example.com/webhook", "format": "json"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(list.webhooks.len(), 1);
        assert_eq!(list.webhooks[0].id, 1001);
        assert_eq!(list.webhooks[0].topic, "orders/create");
    }
}
