use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::SamplingConfig;
use crate::sensor::SensorReader;
use crate::types::Channel;

/// Blocking pause on the single flow of control.
///
/// Every delay in the agent goes through this trait so a harness can
/// substitute simulated time.
#[async_trait]
pub trait Wait: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real-time wait backed by the tokio timer
pub struct TokioWait;

#[async_trait]
impl Wait for TokioWait {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Reduces a batch of raw samples to one integer average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Averager {
    sample_count: u32,
    inter_sample_delay: Duration,
}

impl Averager {
    /// `sample_count` is clamped to at least one sample.
    pub fn new(sample_count: u32, inter_sample_delay: Duration) -> Self {
        Self {
            sample_count: sample_count.max(1),
            inter_sample_delay,
        }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::new(config.sample_count, config.inter_sample_delay())
    }

    pub fn sample_count(&self) -> u32 { self.sample_count }

    /// Wall time consumed by one call to [`Averager::average`]
    pub fn period(&self) -> Duration {
        self.inter_sample_delay * self.sample_count
    }

    /// Take `sample_count` readings from `channel`, waiting after each one,
    /// and return the floored mean. Raw values are accepted as-is, negative
    /// ones included.
    pub async fn average(
        &self,
        reader: &dyn SensorReader,
        wait: &dyn Wait,
        channel: Channel,
    ) -> Result<i32> {
        let mut sum: i64 = 0;
        for _ in 0..self.sample_count {
            sum += reader.read(channel).await? as i64;
            wait.wait(self.inter_sample_delay).await;
        }
        Ok(floor_mean(sum, self.sample_count))
    }
}

/// `floor(sum / count)`. The mean of i32 samples always fits back in an i32.
fn floor_mean(sum: i64, count: u32) -> i32 {
    sum.div_euclid(count as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct SequenceReader {
        values: Mutex<VecDeque<i32>>,
    }

    impl SequenceReader {
        fn new(values: &[i32]) -> Self {
            Self { values: Mutex::new(values.iter().copied().collect()) }
        }
    }

    #[async_trait]
    impl SensorReader for SequenceReader {
        fn name(&self) -> &str { "sequence" }

        async fn read(&self, _channel: Channel) -> Result<i32> {
            self.values
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("sequence exhausted"))
        }
    }

    #[derive(Default)]
    struct CountingWait {
        calls: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Wait for CountingWait {
        async fn wait(&self, duration: Duration) {
            self.calls.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn truncates_toward_zero() {
        let reader = SequenceReader::new(&[1, 2, 2, 2]);
        let averager = Averager::new(4, Duration::ZERO);
        // 7 / 4 = 1.75
        assert_eq!(averager.average(&reader, &TokioWait, Channel::Ch0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn waits_after_every_sample() {
        let reader = SequenceReader::new(&[10; 20]);
        let wait = CountingWait::default();
        let averager = Averager::new(20, Duration::from_millis(20));

        let avg = averager.average(&reader, &wait, Channel::Ch1).await.unwrap();

        assert_eq!(avg, 10);
        let calls = wait.calls.lock().unwrap();
        assert_eq!(calls.len(), 20);
        assert_eq!(calls.iter().sum::<Duration>(), averager.period());
        assert_eq!(averager.period(), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn out_of_range_values_are_averaged() {
        let reader = SequenceReader::new(&[0, i32::MAX, i32::MAX]);
        let averager = Averager::new(3, Duration::ZERO);
        let expected = (2 * i32::MAX as i64 / 3) as i32;
        assert_eq!(averager.average(&reader, &TokioWait, Channel::Ch2).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn negative_samples_are_averaged() {
        let reader = SequenceReader::new(&[-3, 500, 502, -3]);
        let averager = Averager::new(4, Duration::ZERO);
        // 996 / 4
        assert_eq!(averager.average(&reader, &TokioWait, Channel::Ch0).await.unwrap(), 249);

        let reader = SequenceReader::new(&[-3, -4]);
        let averager = Averager::new(2, Duration::ZERO);
        // -3.5 floors to -4
        assert_eq!(averager.average(&reader, &TokioWait, Channel::Ch0).await.unwrap(), -4);
    }

    #[tokio::test]
    async fn read_failure_propagates() {
        let reader = SequenceReader::new(&[5]);
        let averager = Averager::new(2, Duration::ZERO);
        assert!(averager.average(&reader, &TokioWait, Channel::Ch0).await.is_err());
    }

    #[test]
    fn zero_sample_count_is_clamped() {
        assert_eq!(Averager::new(0, Duration::ZERO).sample_count(), 1);
    }

    proptest! {
        #[test]
        fn average_is_floor_of_mean(samples in prop::collection::vec(-4096i32..=4095, 1..64)) {
            let reader = SequenceReader::new(&samples);
            let averager = Averager::new(samples.len() as u32, Duration::ZERO);
            let wait = CountingWait::default();
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let avg = rt.block_on(averager.average(&reader, &wait, Channel::Ch0)).unwrap();

            let sum: i64 = samples.iter().map(|v| *v as i64).sum();
            let expected = (sum as f64 / samples.len() as f64).floor() as i64;
            prop_assert_eq!(avg as i64, expected);
        }
    }
}
