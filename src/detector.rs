use anyhow::Result;
use serde::Serialize;

use crate::config::DetectorConfig;
use crate::sampling::{Averager, Wait};
use crate::sensor::SensorReader;
use crate::types::{Baseline, Channel, ChannelMap, CurrentReading, Deviation};

/// Outcome of one detection cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub current: CurrentReading,
    pub deviations: ChannelMap<Deviation>,
    pub triggered: bool,
}

impl CycleReport {
    /// Channels whose deviation strictly exceeded alpha
    pub fn exceeding(&self, alpha: f64) -> Vec<Channel> {
        self.deviations
            .iter()
            .filter(|(_, d)| d.exceeds(alpha))
            .map(|(ch, _)| ch)
            .collect()
    }

    /// Channels skipped because their baseline is zero
    pub fn degenerate(&self) -> Vec<Channel> {
        self.deviations
            .iter()
            .filter(|(_, d)| matches!(d, Deviation::Degenerate))
            .map(|(ch, _)| ch)
            .collect()
    }
}

/// Relative-delta threshold detection across all three channels.
///
/// A cycle triggers when any single channel's absolute relative deviation
/// from baseline is strictly greater than `alpha`. There is no hysteresis.
pub struct DeviationDetector {
    averager: Averager,
    alpha: f64,
}

impl DeviationDetector {
    pub fn new(averager: Averager, config: &DetectorConfig) -> Self {
        Self {
            averager,
            alpha: config.alpha,
        }
    }

    pub fn alpha(&self) -> f64 { self.alpha }

    /// Re-average every channel and evaluate against `baseline`. All three
    /// channels are read before the decision is made.
    pub async fn detect_cycle(
        &self,
        reader: &dyn SensorReader,
        wait: &dyn Wait,
        baseline: &Baseline,
    ) -> Result<CycleReport> {
        let mut values = [0i32; 3];
        for channel in Channel::ALL {
            values[channel.index()] = self.averager.average(reader, wait, channel).await?;
        }
        Ok(self.evaluate(baseline, &ChannelMap::new(values)))
    }

    /// Pure decision step over already-averaged readings
    pub fn evaluate(&self, baseline: &Baseline, current: &CurrentReading) -> CycleReport {
        let deviations = current.map(|ch, value| Deviation::between(baseline.get(ch), *value));
        let triggered = deviations.iter().any(|(_, d)| d.exceeds(self.alpha));

        CycleReport {
            current: *current,
            deviations,
            triggered,
        }
    }
}
