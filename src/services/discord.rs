use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{Value, json};

use crate::{config::Settings, error::DispatchError, models::WatchedItem};

const ALERT_COLOR: u32 = 0x00FF00;

/// Outbound notification channel for triggered items.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, item: &WatchedItem, price: f64) -> Result<(), DispatchError>;
}

#[derive(Clone)]
pub struct DiscordWebhook {
    http: Client,
    webhook_url: String,
    listing_base_url: String,
    timeout: Duration,
}

impl DiscordWebhook {
    pub fn new(webhook_url: String, listing_base_url: String, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            webhook_url,
            listing_base_url: listing_base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.discord_webhook_url.clone(),
            settings.buff_base_url.clone(),
            settings.request_timeout,
        )
    }

    fn has_url(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }

    pub fn listing_url(&self, item: &WatchedItem) -> String {
        format!("{}/goods/{}", self.listing_base_url, item.id)
    }

    pub fn payload(&self, item: &WatchedItem, price: f64) -> Value {
        let link = self.listing_url(item);
        json!({
            "embeds": [{
                "title": format!("🚨 Price Alert: {}", item.display_name()),
                "color": ALERT_COLOR,
                "description": format!("**Price: ¥{}** (Target: ¥{})", price, item.max_price),
                "url": link,
                "fields": [{ "name": "Link", "value": format!("[Buy Now]({link})") }],
                "timestamp": Utc::now().to_rfc3339(),
            }]
        })
    }
}

#[async_trait]
impl AlertSink for DiscordWebhook {
    async fn send(&self, item: &WatchedItem, price: f64) -> Result<(), DispatchError> {
        if !self.has_url() {
            return Err(DispatchError::NotConfigured);
        }

        let res = self
            .http
            .post(&self.webhook_url)
            .json(&self.payload(item, price))
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(DispatchError::Status { status, body });
        }

        Ok(())
    }
}
