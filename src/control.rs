use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::calibration::{check_baseline, BaselineCalibrator};
use crate::config::Config;
use crate::detector::{CycleReport, DeviationDetector};
use crate::notifier::NotificationTrigger;
use crate::sampling::{Averager, Wait};
use crate::sensor::SensorReader;
use crate::types::{Baseline, Channel};

const MIN_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Control loop state. `Calibrating` is left exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopState {
    Calibrating,
    Monitoring { baseline: Baseline },
}

/// What a single [`ControlLoop::step`] did
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Calibrated(Baseline),
    Cycle(CycleReport),
}

/// Calibrates once, then runs detection cycles forever, firing the
/// notification trigger whenever a cycle reports a deviation.
pub struct ControlLoop {
    reader: Box<dyn SensorReader>,
    wait: Box<dyn Wait>,
    calibrator: BaselineCalibrator,
    detector: DeviationDetector,
    trigger: NotificationTrigger,
    retry_pause: Duration,
    state: LoopState,
}

impl ControlLoop {
    pub fn new(
        config: &Config,
        reader: Box<dyn SensorReader>,
        wait: Box<dyn Wait>,
        trigger: NotificationTrigger,
    ) -> Self {
        // calibration and detection must sample under identical conditions
        let averager = Averager::from_config(&config.sampling);

        Self {
            reader,
            wait,
            calibrator: BaselineCalibrator::new(averager),
            detector: DeviationDetector::new(averager, &config.detector),
            trigger,
            retry_pause: averager.period().max(MIN_RETRY_PAUSE),
            state: LoopState::Calibrating,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Run forever. Failed steps are logged and retried after one sampling
    /// period (at least a second); nothing here ends the loop.
    pub async fn run(&mut self) {
        info!(reader = self.reader.name(), "Control loop started");
        loop {
            if let Err(e) = self.step().await {
                warn!(error = %format!("{:#}", e), state = ?self.state, "Control loop step failed");
                self.wait.wait(self.retry_pause).await;
            }
        }
    }

    /// Advance the state machine by one unit of work: calibration while
    /// `Calibrating`, otherwise one detection cycle plus the trigger action.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        match self.state {
            LoopState::Calibrating => {
                let baseline = self
                    .calibrator
                    .calibrate(&*self.reader, &*self.wait)
                    .await
                    .context("calibration failed")?;

                info!(
                    ch0 = baseline.get(Channel::Ch0),
                    ch1 = baseline.get(Channel::Ch1),
                    ch2 = baseline.get(Channel::Ch2),
                    "Calibration complete"
                );
                if let Err(e) = check_baseline(&baseline) {
                    error!(error = %e, "Degenerate channels will not be monitored");
                }

                self.state = LoopState::Monitoring { baseline };
                Ok(StepOutcome::Calibrated(baseline))
            }
            LoopState::Monitoring { baseline } => {
                let report = self
                    .detector
                    .detect_cycle(&*self.reader, &*self.wait, &baseline)
                    .await
                    .context("detection cycle failed")?;

                debug!(
                    ch0 = report.current[Channel::Ch0],
                    ch1 = report.current[Channel::Ch1],
                    ch2 = report.current[Channel::Ch2],
                    dev0 = %report.deviations[Channel::Ch0],
                    dev1 = %report.deviations[Channel::Ch1],
                    dev2 = %report.deviations[Channel::Ch2],
                    triggered = report.triggered,
                    "Detection cycle"
                );

                if report.triggered {
                    info!(
                        channels = ?report.exceeding(self.detector.alpha()),
                        alpha = self.detector.alpha(),
                        "Mail detected"
                    );
                    self.trigger.fire(&*self.wait).await;
                }

                Ok(StepOutcome::Cycle(report))
            }
        }
    }
}
