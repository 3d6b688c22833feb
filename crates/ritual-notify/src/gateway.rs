use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Fire-and-forget send primitive into the messaging platform. The
/// dispatcher only needs this one call; protocol details live behind it.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str) -> Result<()>;
}

/// Telegram Bot API gateway. Each send is a single `sendMessage` POST with
/// a short timeout so one unreachable endpoint cannot stall a whole tick.
pub struct TelegramGateway {
    client: reqwest::Client,
    token: String,
}

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

impl TelegramGateway {
    pub fn new(token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("building telegram client")?;
        Ok(Self { client, token })
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);

        let response = self
            .client
            .post(&url)
            .form(&[("chat_id", chat_id), ("text", text)])
            .send()
            .await
            .context("telegram request failed")?;

        response
            .error_for_status()
            .context("telegram rejected sendMessage")?;

        Ok(())
    }
}
