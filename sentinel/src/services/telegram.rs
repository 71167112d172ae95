use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use sentinel_network_watcher::Notifier;

const API_URL: &str = "https://api.telegram.org";

/// Minimal Telegram Bot API client used for admin alerts.
pub struct TelegramNotifier {
    http: reqwest::Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct Reply<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_api_url(API_URL, token)
    }

    pub fn with_api_url(api_url: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build Telegram HTTP client")?;
        Ok(Self {
            http,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    /// Checks the token and returns the bot account.
    pub async fn get_me(&self) -> Result<BotUser> {
        self.call("getMe", &serde_json::json!({})).await
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // the url embeds the token, keep it out of error messages
        let response = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("telegram {} failed: {}", method, e.without_url()))?;

        let reply: Reply<T> = response
            .json()
            .await
            .map_err(|e| anyhow!("telegram {} returned invalid body: {}", method, e.without_url()))?;

        match (reply.ok, reply.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(anyhow!(
                "telegram {} rejected: {}",
                method,
                reply.description.unwrap_or_else(|| "no description".to_string())
            )),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id: recipient,
                    text,
                },
            )
            .await?;
        Ok(())
    }
}
