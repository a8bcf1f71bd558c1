//! Daemon configuration: TOML file, overridden by CLI flags and environment.

use anyhow::{anyhow, bail, Context, Result};
use avrtrim_core::{
    ChannelPartition, CoordinatorConfig, TrimError, Volume, DEFAULT_FULL_RESPONSE,
    DEFAULT_HALF_RESPONSE,
};
use avrtrim_device_denon::{ConnectOptions, DEFAULT_TELNET_PORT};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "avrtrim",
    version,
    about = "Keeps surround and height trims matched to room calibration as the main volume changes"
)]
pub struct Cli {
    /// Receiver IP address or hostname
    #[arg(long, env = "RECEIVER_IP")]
    pub receiver_host: Option<String>,

    /// Receiver telnet port
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the manualREW*.ady calibration export
    #[arg(long, env = "CONFIG_PATH")]
    pub calibration_dir: Option<PathBuf>,

    /// Configuration file (defaults to <config dir>/avrtrim/config.toml when present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Reference volume in dB, overriding the calibration title
    #[arg(long)]
    pub reference_volume: Option<f64>,

    /// Seconds the main volume must stay still before trims are sent
    #[arg(long)]
    pub debounce_secs: Option<f64>,

    /// Also write logs to daily files in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub host: Option<String>,
    pub port: u16,
    pub connect_timeout_secs: u64,
    pub command_spacing_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_TELNET_PORT,
            connect_timeout_secs: 5,
            command_spacing_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub dir: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("config"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Overrides the reference volume found in the calibration
    pub reference_volume: Option<f64>,
    pub debounce_secs: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            reference_volume: None,
            debounce_secs: 5.0,
        }
    }
}

/// Channel sets as written in the file; validated by [`ChannelsConfig::partition`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub full_response: Vec<String>,
    pub half_response: Vec<String>,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            full_response: DEFAULT_FULL_RESPONSE.iter().map(|c| c.to_string()).collect(),
            half_response: DEFAULT_HALF_RESPONSE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ChannelsConfig {
    pub fn partition(&self) -> Result<ChannelPartition, TrimError> {
        ChannelPartition::new(self.full_response.iter().cloned(), self.half_response.iter().cloned())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub receiver: ReceiverConfig,
    pub calibration: CalibrationConfig,
    pub trim: TrimConfig,
    pub channels: ChannelsConfig,
}

impl AppConfig {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Load the file (if any) and apply CLI/environment overrides
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli.config.clone().or_else(|| {
            default_config_path().filter(|path| path.exists())
        });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.receiver_host {
            self.receiver.host = Some(host.clone());
        }
        if let Some(port) = cli.port {
            self.receiver.port = port;
        }
        if let Some(dir) = &cli.calibration_dir {
            self.calibration.dir = dir.clone();
        }
        if let Some(reference) = cli.reference_volume {
            self.trim.reference_volume = Some(reference);
        }
        if let Some(debounce) = cli.debounce_secs {
            self.trim.debounce_secs = debounce;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.receiver_host().is_err() {
            bail!(
                "Receiver IP is required but not provided. Pass --receiver-host, \
                 set RECEIVER_IP or add host under [receiver] in the config file"
            );
        }
        self.debounce_window()?;
        if let Some(reference) = self.trim.reference_volume {
            if !reference.is_finite() {
                bail!("reference_volume must be a finite number of dB, got {}", reference);
            }
        }
        Ok(())
    }

    pub fn debounce_window(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.trim.debounce_secs).with_context(|| {
            format!(
                "debounce_secs must be a non-negative number of seconds, got {}",
                self.trim.debounce_secs
            )
        })
    }

    pub fn receiver_host(&self) -> Result<&str> {
        self.receiver
            .host
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| anyhow!("receiver host is not configured"))
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            port: self.receiver.port,
            connect_timeout: Duration::from_secs(self.receiver.connect_timeout_secs),
            command_spacing: Duration::from_millis(self.receiver.command_spacing_ms),
            ..Default::default()
        }
    }

    /// Coordinator settings; without a configured reference volume the
    /// calibration's is used
    pub fn coordinator_config(&self, partition: ChannelPartition) -> Result<CoordinatorConfig> {
        Ok(CoordinatorConfig {
            reference_volume: self.trim.reference_volume.map(Volume::from_db),
            debounce_window: self.debounce_window()?,
            partition,
        })
    }
}

/// `<platform config dir>/avrtrim/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("avrtrim").join("config.toml"))
}
