use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::SensorConfig;
use crate::types::{Channel, ChannelMap};
use super::SensorReader;

/// Reads ADC channels through the Linux IIO sysfs interface
/// (`<device>/in_voltage<N>_raw`).
pub struct IioSensorReader {
    paths: ChannelMap<PathBuf>,
}

impl IioSensorReader {
    pub fn new(config: &SensorConfig) -> Result<Self> {
        let device = Path::new(&config.device);
        let [a, b, c] = config.channels;
        let paths = ChannelMap::new([
            device.join(format!("in_voltage{}_raw", a)),
            device.join(format!("in_voltage{}_raw", b)),
            device.join(format!("in_voltage{}_raw", c)),
        ]);
        Ok(Self { paths })
    }

    pub fn path(&self, channel: Channel) -> &Path {
        &self.paths[channel]
    }
}

#[async_trait]
impl SensorReader for IioSensorReader {
    fn name(&self) -> &str { "iio" }

    async fn read(&self, channel: Channel) -> Result<i32> {
        let path = self.path(channel);
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {} from {}", channel, path.display()))?;
        let value = content
            .trim()
            .parse::<i32>()
            .with_context(|| format!("Invalid {} reading: {:?}", channel, content.trim()))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_for(dir: &Path) -> IioSensorReader {
        IioSensorReader::new(&SensorConfig {
            device: dir.to_string_lossy().to_string(),
            channels: [0, 1, 4],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn reads_bound_channel_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in_voltage0_raw"), "512\n").unwrap();
        std::fs::write(dir.path().join("in_voltage4_raw"), "4095\n").unwrap();

        let reader = reader_for(dir.path());
        assert_eq!(reader.read(Channel::Ch0).await.unwrap(), 512);
        assert_eq!(reader.read(Channel::Ch2).await.unwrap(), 4095);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let reader = reader_for(dir.path());
        let err = reader.read(Channel::Ch1).await.unwrap_err();
        assert!(err.to_string().contains("ch1"));
    }

    #[tokio::test]
    async fn negative_raw_value_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in_voltage1_raw"), "-3\n").unwrap();
        let reader = reader_for(dir.path());
        assert_eq!(reader.read(Channel::Ch1).await.unwrap(), -3);
    }

    #[tokio::test]
    async fn garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in_voltage0_raw"), "n/a").unwrap();
        let reader = reader_for(dir.path());
        assert!(reader.read(Channel::Ch0).await.is_err());
    }
}
