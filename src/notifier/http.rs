use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::NotificationConfig;
use super::Notifier;

/// Outcome of the most recent notification attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub fired_at: DateTime<Utc>,
    pub status: Option<u16>,
    pub body: String,
    pub error: Option<String>,
}

/// Shared, read-only view of the last notification outcome for diagnostics
#[derive(Clone, Default)]
pub struct NotificationState {
    inner: Arc<RwLock<Option<NotificationRecord>>>,
}

impl NotificationState {
    pub fn latest(&self) -> Option<NotificationRecord> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, record: NotificationRecord) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(record);
    }
}

/// Plain HTTP GET to a fixed endpoint; the receiving server does the
/// actual mailing.
pub struct HttpNotifier {
    url: String,
    state_file: Option<String>,
    state: NotificationState,
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url(),
            state_file: config.state_file.clone(),
            state: NotificationState::default(),
            client,
        })
    }

    pub fn url(&self) -> &str { &self.url }

    pub fn state(&self) -> NotificationState {
        self.state.clone()
    }

    async fn persist(&self, record: &NotificationRecord) {
        let Some(ref path) = self.state_file else { return };

        let result = match serde_json::to_vec_pretty(record) {
            Ok(bytes) => tokio::fs::write(path, bytes).await.map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(path = %path, error = %e, "Failed to write notification state");
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    fn name(&self) -> &str { "http" }

    async fn notify(&self) -> Result<()> {
        let fired_at = Utc::now();
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "*/*")
            .send()
            .await;

        let record = match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                match resp.text().await {
                    Ok(body) => NotificationRecord { fired_at, status: Some(status), body, error: None },
                    Err(e) => NotificationRecord {
                        fired_at,
                        status: Some(status),
                        body: String::new(),
                        error: Some(e.to_string()),
                    },
                }
            }
            Err(e) => NotificationRecord {
                fired_at,
                status: None,
                body: String::new(),
                error: Some(e.to_string()),
            },
        };

        debug!(status = ?record.status, body_len = record.body.len(), "Notification response");
        self.state.record(record.clone());
        self.persist(&record).await;

        if let Some(ref e) = record.error {
            bail!("notification request to {} failed: {}", self.url, e);
        }
        match record.status {
            Some(status) if !(200..300).contains(&status) => {
                bail!("notification endpoint {} returned status {}", self.url, status)
            }
            _ => Ok(()),
        }
    }
}
