pub mod http;
pub mod indicator;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::sampling::Wait;

/// Outbound notification channel.
///
/// The result is only logged by the caller; it never changes what the
/// control loop does next.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Send a single notification
    async fn notify(&self) -> Result<()>;
}

/// Binary visual output (e.g. an LED)
#[async_trait]
pub trait Indicator: Send + Sync {
    fn name(&self) -> &str;

    async fn set(&self, on: bool) -> Result<()>;
}

/// Sends the notification and holds the indicator on for a fixed period.
///
/// The hold is awaited on the caller's flow of control, so no detection
/// cycle can start until the whole sequence is done.
pub struct NotificationTrigger {
    notifier: Box<dyn Notifier>,
    indicator: Box<dyn Indicator>,
    hold: Duration,
}

impl NotificationTrigger {
    pub fn new(notifier: Box<dyn Notifier>, indicator: Box<dyn Indicator>, hold: Duration) -> Self {
        Self { notifier, indicator, hold }
    }

    pub fn hold(&self) -> Duration { self.hold }

    /// Notify, indicator on, hold, indicator off. Failures are logged and
    /// the sequence always runs to completion.
    pub async fn fire(&self, wait: &dyn Wait) {
        match self.notifier.notify().await {
            Ok(()) => info!(channel = self.notifier.name(), "Mail notification sent"),
            Err(e) => error!(
                channel = self.notifier.name(),
                error = %e,
                "Failed to send mail notification"
            ),
        }

        if let Err(e) = self.indicator.set(true).await {
            warn!(indicator = self.indicator.name(), error = %e, "Failed to switch indicator on");
        }

        wait.wait(self.hold).await;

        if let Err(e) = self.indicator.set(false).await {
            warn!(indicator = self.indicator.name(), error = %e, "Failed to switch indicator off");
        }
    }
}

/// Create the notification trigger from configuration
pub fn create_trigger(config: &Config) -> Result<(NotificationTrigger, http::NotificationState)> {
    let notifier = http::HttpNotifier::new(&config.notification)?;
    let state = notifier.state();

    let indicator: Box<dyn Indicator> = match config.indicator.led {
        Some(ref path) => Box::new(indicator::SysfsLed::new(path)),
        None => Box::new(indicator::LogIndicator),
    };

    info!(
        url = %notifier.url(),
        indicator = indicator.name(),
        hold_ms = config.notification.hold_ms,
        "Initialized notification trigger"
    );

    Ok((
        NotificationTrigger::new(Box::new(notifier), indicator, config.notification.hold()),
        state,
    ))
}
