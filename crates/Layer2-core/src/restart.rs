//! Restart gate - fire-and-forget request to the local supervisor

use flagbridge_foundation::Notifier;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default loopback address of the restart gate
pub const DEFAULT_RESTART_GATE: &str = "127.0.0.1:7331";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// 호스트 환경 재시작 요청
pub struct RestartGate {
    address: String,
    client: Client,
    notifier: Arc<dyn Notifier>,
}

impl RestartGate {
    pub fn new(address: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client ({}), using defaults", e);
                Client::new()
            });
        Self {
            address: address.into(),
            client,
            notifier,
        }
    }

    pub fn url(&self) -> String {
        let address = self.address.trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            format!("{}/restart", address)
        } else {
            format!("http://{}/restart", address)
        }
    }

    /// Send the request in the background
    ///
    /// The user is told a restart was requested whatever the network says.
    /// The returned handle resolves to whether the gate answered 2xx.
    pub fn request(&self) -> JoinHandle<bool> {
        let url = self.url();
        let client = self.client.clone();
        self.notifier.info("flagbridge: restart requested");

        tokio::spawn(async move {
            match client
                .post(&url)
                .json(&serde_json::json!({ "source": "flagbridge" }))
                .send()
                .await
            {
                Ok(response) => {
                    debug!("Restart gate answered {}", response.status());
                    response.status().is_success()
                }
                Err(e) => {
                    debug!("Restart gate unreachable at {}: {}", url, e);
                    false
                }
            }
        })
    }
}
