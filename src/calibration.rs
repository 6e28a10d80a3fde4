use anyhow::Result;

use crate::sampling::{Averager, Wait};
use crate::sensor::SensorReader;
use crate::types::{Baseline, Channel, ChannelMap};

/// Conditions that make a calibrated baseline unusable for some channels
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalibrationError {
    #[error("calibration degenerate: zero baseline on {}", fmt_channels(.channels))]
    Degenerate { channels: Vec<Channel> },
}

fn fmt_channels(channels: &[Channel]) -> String {
    channels
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Establishes the per-channel reference average at startup.
pub struct BaselineCalibrator {
    averager: Averager,
}

impl BaselineCalibrator {
    pub fn new(averager: Averager) -> Self {
        Self { averager }
    }

    /// Average each channel once, in channel order. The values are returned
    /// unvalidated; see [`check_baseline`].
    pub async fn calibrate(&self, reader: &dyn SensorReader, wait: &dyn Wait) -> Result<Baseline> {
        let mut values = [0i32; 3];
        for channel in Channel::ALL {
            values[channel.index()] = self.averager.average(reader, wait, channel).await?;
        }
        Ok(Baseline::from(ChannelMap::new(values)))
    }
}

/// Fails when any channel's baseline is zero, since no relative deviation
/// can be computed against it.
pub fn check_baseline(baseline: &Baseline) -> std::result::Result<(), CalibrationError> {
    let channels = baseline.degenerate_channels();
    if channels.is_empty() {
        Ok(())
    } else {
        Err(CalibrationError::Degenerate { channels })
    }
}
