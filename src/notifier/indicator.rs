use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use super::Indicator;

/// LED driven through a sysfs `brightness` file
pub struct SysfsLed {
    path: PathBuf,
}

impl SysfsLed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Indicator for SysfsLed {
    fn name(&self) -> &str { "sysfs-led" }

    async fn set(&self, on: bool) -> Result<()> {
        let value = if on { "1" } else { "0" };
        tokio::fs::write(&self.path, value)
            .await
            .with_context(|| format!("Failed to write LED state to {}", self.path.display()))?;
        Ok(())
    }
}

/// Indicator for boards without a usable LED; state changes only go to the log
pub struct LogIndicator;

#[async_trait]
impl Indicator for LogIndicator {
    fn name(&self) -> &str { "log" }

    async fn set(&self, on: bool) -> Result<()> {
        tracing::info!(on, "Indicator");
        Ok(())
    }
}
