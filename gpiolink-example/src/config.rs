//! TOML configuration of the example binaries.
//!
//! ```toml
//! [lines]
//! clock = "/dev/gpio22"
//! master_out = "/dev/gpio27"
//! slave_out = "/dev/gpio17"
//!
//! [timing]
//! bit_period_us = 10000
//! stabilize_delay_us = 500
//! edge_poll_interval_us = 5
//! edge_timeout_ms = 100
//!
//! [session]
//! message = "HELLO"
//! reply = "ALOHA"
//! ```
//!
//! Every section and every key is optional. Missing line paths fall back to the default wiring of
//! the endpoint role.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gpiolink::hal::std::chardev::LinePaths;
use gpiolink::timing::TimingError;
use gpiolink::{EndpointRole, TimingPolicy};

pub const DEFAULT_MESSAGE: &str = "HELLO";
pub const DEFAULT_REPLY: &str = "ALOHA";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {path:?} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file failed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid timing configuration: {0}")]
    Timing(#[from] TimingError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub lines: LinesConfig,
    pub timing: TimingConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct LinesConfig {
    pub clock: Option<PathBuf>,
    pub master_out: Option<PathBuf>,
    pub slave_out: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub bit_period_us: u64,
    pub stabilize_delay_us: u64,
    pub edge_poll_interval_us: u64,
    pub edge_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let policy = TimingPolicy::default();
        Self {
            bit_period_us: policy.bit_period().as_micros() as u64,
            stabilize_delay_us: policy.stabilize_delay().as_micros() as u64,
            edge_poll_interval_us: policy.edge_poll_interval().as_micros() as u64,
            edge_timeout_ms: policy.edge_timeout().as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub message: String,
    pub reply: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE.to_string(),
            reply: DEFAULT_REPLY.to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_str = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&toml_str)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn line_paths(&self, role: EndpointRole) -> LinePaths {
        let defaults = match role {
            EndpointRole::Master => LinePaths::default_master(),
            EndpointRole::Slave => LinePaths::default_slave(),
        };
        LinePaths {
            clock: self.lines.clock.clone().unwrap_or(defaults.clock),
            master_out: self.lines.master_out.clone().unwrap_or(defaults.master_out),
            slave_out: self.lines.slave_out.clone().unwrap_or(defaults.slave_out),
        }
    }

    pub fn timing_policy(&self) -> Result<TimingPolicy, ConfigError> {
        let timing = &self.timing;
        Ok(TimingPolicy::new(
            Duration::from_micros(timing.bit_period_us),
            Duration::from_micros(timing.stabilize_delay_us),
            Duration::from_micros(timing.edge_poll_interval_us),
            Duration::from_millis(timing.edge_timeout_ms),
        )?)
    }
}
