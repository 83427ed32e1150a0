use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    Client,
    header::{COOKIE, USER_AGENT},
};
use serde::Deserialize;
use serde_json::Value;

use crate::{config::Settings, error::FetchError};

// The feed rejects requests that do not look like they come from a browser.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Anything that can quote the best current sell price for an item id.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, item_id: &str) -> Result<f64, FetchError>;
}

#[derive(Clone)]
pub struct BuffClient {
    http: Client,
    base_url: String,
    game: String,
    cookie: String,
    timeout: Duration,
}

impl BuffClient {
    pub fn new(base_url: String, game: String, cookie: String, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            game,
            cookie,
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.buff_base_url.clone(),
            settings.buff_game.clone(),
            settings.buff_cookie.clone(),
            settings.request_timeout,
        )
    }

    async fn sell_orders(&self, item_id: &str) -> Result<SellOrderResponse, FetchError> {
        let url = format!("{}/api/market/goods/sell_order", self.base_url);
        let cache_buster = Utc::now().timestamp_millis().to_string();

        let res = self
            .http
            .get(url)
            .query(&[
                ("game", self.game.as_str()),
                ("goods_id", item_id),
                ("page_num", "1"),
                ("sort_by", "default"),
                ("mode", ""),
                ("allow_tradable_cooldown", "1"),
                ("_", cache_buster.as_str()),
            ])
            .header(COOKIE, &self.cookie)
            .header(USER_AGENT, BROWSER_UA)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(FetchError::Transient(format!("sell_order returned {}", res.status())));
        }

        res.json::<SellOrderResponse>().await.map_err(FetchError::from)
    }
}

#[async_trait]
impl PriceSource for BuffClient {
    async fn fetch_price(&self, item_id: &str) -> Result<f64, FetchError> {
        let body = match self.sell_orders(item_id).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(item_id, error = %e, "price fetch failed");
                return Err(e);
            }
        };

        body.best_price()
    }
}

#[derive(Debug, Deserialize)]
pub struct SellOrderResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub data: Option<SellOrderData>,
}

#[derive(Debug, Deserialize)]
pub struct SellOrderData {
    #[serde(default)]
    pub items: Vec<SellOrder>,
}

#[derive(Debug, Deserialize)]
pub struct SellOrder {
    // "12.5" on the wire, occasionally a bare number
    pub price: Value,
}

impl SellOrderResponse {
    /// First listed sell order, which is the cheapest under `sort_by=default`.
    pub fn best_price(&self) -> Result<f64, FetchError> {
        if self.code != "OK" {
            return Err(FetchError::NoData);
        }
        let Some(first) = self.data.as_ref().and_then(|d| d.items.first()) else {
            return Err(FetchError::NoData);
        };

        let price = match &first.price {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        };

        match price {
            Some(p) if p.is_finite() => Ok(p),
            _ => Err(FetchError::Transient(format!("unparseable price {}", first.price))),
        }
    }
}
