pub mod iio;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::types::Channel;

/// Source of raw analog readings.
///
/// Implementations return the value exactly as the hardware reports it,
/// negative or otherwise; no range checking or unit conversion happens at
/// this boundary.
#[async_trait]
pub trait SensorReader: Send + Sync {
    /// Human-readable name for this reader (e.g., "iio")
    fn name(&self) -> &str;

    /// Read one raw value from `channel`
    async fn read(&self, channel: Channel) -> Result<i32>;
}

/// Create the sensor reader bound to the configured inputs
pub fn create_sensor_reader(config: &Config) -> Result<Box<dyn SensorReader>> {
    let reader = iio::IioSensorReader::new(&config.sensor)?;
    tracing::info!(
        reader = reader.name(),
        device = %config.sensor.device,
        channels = ?config.sensor.channels,
        "Initialized sensor reader"
    );
    Ok(Box::new(reader))
}
