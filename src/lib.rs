pub mod calibration;
pub mod config;
pub mod control;
pub mod detector;
pub mod notifier;
pub mod sampling;
pub mod sensor;

/// Common types used across modules
pub mod types {
    use serde::{Deserialize, Serialize};
    use std::ops::Index;

    /// One of the three proximity sensor inputs
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Channel {
        Ch0,
        Ch1,
        Ch2,
    }

    impl Channel {
        /// All channels in evaluation order
        pub const ALL: [Channel; 3] = [Channel::Ch0, Channel::Ch1, Channel::Ch2];

        pub fn index(self) -> usize {
            match self {
                Channel::Ch0 => 0,
                Channel::Ch1 => 1,
                Channel::Ch2 => 2,
            }
        }
    }

    impl std::fmt::Display for Channel {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let s = match self {
                Channel::Ch0 => "ch0",
                Channel::Ch1 => "ch1",
                Channel::Ch2 => "ch2",
            };
            write!(f, "{}", s)
        }
    }

    /// A value for each of the three channels
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
    pub struct ChannelMap<T>([T; 3]);

    impl<T> ChannelMap<T> {
        pub const fn new(values: [T; 3]) -> Self {
            Self(values)
        }

        pub fn get(&self, channel: Channel) -> &T {
            &self.0[channel.index()]
        }

        pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
            Channel::ALL.into_iter().zip(self.0.iter())
        }

        pub fn map<U>(&self, mut f: impl FnMut(Channel, &T) -> U) -> ChannelMap<U> {
            let [a, b, c] = &self.0;
            ChannelMap([f(Channel::Ch0, a), f(Channel::Ch1, b), f(Channel::Ch2, c)])
        }
    }

    impl<T> Index<Channel> for ChannelMap<T> {
        type Output = T;

        fn index(&self, channel: Channel) -> &T {
            self.get(channel)
        }
    }

    /// Averaged readings taken during one detection cycle
    pub type CurrentReading = ChannelMap<i32>;

    /// Reference average per channel, established once at startup.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub struct Baseline(ChannelMap<i32>);

    impl Baseline {
        pub const fn new(values: [i32; 3]) -> Self {
            Self(ChannelMap::new(values))
        }

        pub fn get(&self, channel: Channel) -> i32 {
            *self.0.get(channel)
        }

        pub fn values(&self) -> &ChannelMap<i32> {
            &self.0
        }

        /// Channels whose baseline is zero and cannot anchor a relative deviation
        pub fn degenerate_channels(&self) -> Vec<Channel> {
            self.0
                .iter()
                .filter(|(_, v)| **v == 0)
                .map(|(ch, _)| ch)
                .collect()
        }
    }

    impl From<ChannelMap<i32>> for Baseline {
        fn from(values: ChannelMap<i32>) -> Self {
            Self(values)
        }
    }

    /// Relative change of a channel's current average from its baseline
    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub enum Deviation {
        /// `|current - baseline| / |baseline|`
        Ratio(f64),
        /// Baseline is zero; no ratio exists
        Degenerate,
    }

    impl Deviation {
        pub fn between(baseline: i32, current: i32) -> Self {
            if baseline == 0 {
                return Deviation::Degenerate;
            }
            let baseline = baseline as f64;
            Deviation::Ratio((current as f64 - baseline).abs() / baseline.abs())
        }

        /// Strictly greater than `alpha`. Degenerate channels never exceed.
        pub fn exceeds(&self, alpha: f64) -> bool {
            match self {
                Deviation::Ratio(r) => *r > alpha,
                Deviation::Degenerate => false,
            }
        }

        pub fn ratio(&self) -> Option<f64> {
            match self {
                Deviation::Ratio(r) => Some(*r),
                Deviation::Degenerate => None,
            }
        }
    }

    impl std::fmt::Display for Deviation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Deviation::Ratio(r) => write!(f, "{:.3}", r),
                Deviation::Degenerate => write!(f, "degenerate"),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn channel_display_and_index() {
            assert_eq!(Channel::Ch1.to_string(), "ch1");
            assert_eq!(Channel::ALL.map(Channel::index), [0, 1, 2]);
        }

        #[test]
        fn increase_and_decrease_are_symmetric() {
            assert_eq!(Deviation::between(500, 560), Deviation::Ratio(0.12));
            assert_eq!(Deviation::between(500, 440), Deviation::Ratio(0.12));
        }

        #[test]
        fn zero_baseline_is_degenerate() {
            let d = Deviation::between(0, 500);
            assert_eq!(d, Deviation::Degenerate);
            assert!(!d.exceeds(0.0));
            assert_eq!(d.ratio(), None);
        }

        #[test]
        fn negative_baseline_still_gives_a_magnitude() {
            assert_eq!(Deviation::between(-500, -560), Deviation::Ratio(0.12));
            assert!(Deviation::between(-500, -560).exceeds(0.10));
        }

        #[test]
        fn exceeds_is_strict() {
            assert!(!Deviation::Ratio(0.10).exceeds(0.10));
            assert!(Deviation::Ratio(0.1001).exceeds(0.10));
        }

        #[test]
        fn baseline_reports_zero_channels() {
            let baseline = Baseline::new([0, 500, 0]);
            assert_eq!(baseline.degenerate_channels(), vec![Channel::Ch0, Channel::Ch2]);
            assert!(Baseline::new([1, 1, 1]).degenerate_channels().is_empty());
        }

        proptest! {
            #[test]
            fn deviation_magnitude_matches_relative_offset(b in 1i32..4096, k in 1i32..100) {
                // offset chosen as an exact integer fraction of the baseline
                let delta = b / 100 * k;
                prop_assume!(delta < b);
                let up = Deviation::between(b, b + delta).ratio().unwrap();
                let down = Deviation::between(b, b - delta).ratio().unwrap();
                prop_assert!((up - down).abs() < 1e-12);
                prop_assert!((up - delta as f64 / b as f64).abs() < 1e-12);
            }
        }
    }
}
