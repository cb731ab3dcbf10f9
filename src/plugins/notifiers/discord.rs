use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::DiscordConfig;
use crate::plugins::traits::{NotificationReport, NotifierPlugin, StockAlert};

const EMBED_COLOR: u32 = 0x00ff00;

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: String,
    avatar_url: Option<String>,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>, config: &DiscordConfig) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
            username: config.username.clone(),
            avatar_url: config.avatar_url.clone(),
        }
    }

    fn create_embed(&self, alert: &StockAlert) -> serde_json::Value {
        json!({
            "title": format!("🟢 {}", alert.name),
            "url": alert.url,
            "color": EMBED_COLOR,
            "timestamp": alert.timestamp.to_rfc3339(),
            "fields": [
                {
                    "name": "💰 Price",
                    "value": alert.formatted_price(),
                    "inline": true
                },
                {
                    "name": "🏪 Retailer",
                    "value": format!("[{}]({})", alert.retailer, alert.url),
                    "inline": true
                },
                {
                    "name": "📦 Family",
                    "value": alert.product_family,
                    "inline": true
                }
            ],
            "footer": { "text": "Restock Watcher" }
        })
    }

    pub fn create_webhook_payload(&self, alert: &StockAlert) -> serde_json::Value {
        let mut payload = json!({
            "username": self.username,
            "embeds": [self.create_embed(alert)]
        });

        if let Some(avatar_url) = &self.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        payload
    }
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &str {
        "discord"
    }

    fn description(&self) -> &str {
        "Posts restock alerts to a Discord channel through a webhook"
    }

    async fn notify(&self, alert: &StockAlert) -> NotificationReport {
        let payload = self.create_webhook_payload(alert);

        match self.client.post(&self.webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => NotificationReport::delivered_to("discord"),
            Ok(response) => NotificationReport::failed_for(
                "discord",
                format!("webhook returned status {}", response.status()),
            ),
            Err(e) => NotificationReport::failed_for("discord", e),
        }
    }
}
