use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            log_level: default_log_level(),
        }
    }
}

/// Averaging parameters shared by calibration and detection
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
    #[serde(default = "default_inter_sample_delay")]
    pub inter_sample_delay_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            inter_sample_delay_ms: default_inter_sample_delay(),
        }
    }
}

impl SamplingConfig {
    pub fn inter_sample_delay(&self) -> Duration {
        Duration::from_millis(self.inter_sample_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self { alpha: default_alpha() }
    }
}

/// Binding of the three logical channels to IIO ADC inputs
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_iio_device")]
    pub device: String,
    #[serde(default = "default_channels")]
    pub channels: [u32; 3],
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device: default_iio_device(),
            channels: default_channels(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_hold")]
    pub hold_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    pub state_file: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            path: default_path(),
            hold_ms: default_hold(),
            timeout_secs: default_timeout(),
            state_file: None,
        }
    }
}

impl NotificationConfig {
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("http://{}:{}{}", self.address, self.port, path)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndicatorConfig {
    /// sysfs LED brightness file; log-only indicator when unset
    pub led: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        content.parse()
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampling.sample_count == 0 {
            bail!("sampling.sample_count must be at least 1");
        }
        if !self.detector.alpha.is_finite() || self.detector.alpha < 0.0 {
            bail!("detector.alpha must be a non-negative number, got {}", self.detector.alpha);
        }
        if self.notification.address.is_empty() {
            bail!("notification.address must not be empty");
        }
        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> Result<Self> {
        // Expand environment variables
        let expanded = expand_env_vars(content);

        let config: Config = toml::from_str(&expanded)
            .with_context(|| "Failed to parse configuration")?;
        config.validate()?;

        Ok(config)
    }
}

/// Expand ${ENV_VAR} references in config string
fn expand_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .to_string()
}

// Default value functions
fn default_device_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "mailbox".to_string())
}
fn default_log_level() -> String { "info".to_string() }
fn default_sample_count() -> u32 { 20 }
fn default_inter_sample_delay() -> u64 { 20 }
fn default_alpha() -> f64 { 0.10 }
fn default_iio_device() -> String { "/sys/bus/iio/devices/iio:device0".to_string() }
fn default_channels() -> [u32; 3] { [0, 1, 2] }
fn default_address() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 80 }
fn default_path() -> String { "/".to_string() }
fn default_hold() -> u64 { 5000 }
fn default_timeout() -> u64 { 10 }
