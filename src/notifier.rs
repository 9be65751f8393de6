use crate::error::{FuelError, Result};
use serde::Serialize;
use std::time::Duration;

pub trait Notifier {
    fn notify(&self, message: &str) -> Result<()>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts messages to a Slack-style incoming webhook.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|err| FuelError::Notify(format!("Failed to create HTTP client: {}", err)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { text: message })
            .send()
            .map_err(|err| FuelError::Notify(err.to_string()))?;

        if !response.status().is_success() {
            return Err(FuelError::Notify(format!(
                "webhook answered {}",
                response.status()
            )));
        }
        log::debug!("notification sent");
        Ok(())
    }
}
