//! Room correction calibration export (`.ady` JSON).

use anyhow::{Context, Result};
use avrtrim_core::{Baselines, CalibrationStore, LevelUnits, Volume};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Channels the trim never touches: front mains, center and subwoofers
const FIXED_CHANNELS: &[&str] = &["FL", "FR", "C"];
const SUBWOOFER_PREFIX: &str = "SW";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalibrationDocument {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detected_channels: Vec<DetectedChannel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectedChannel {
    #[serde(default)]
    command_id: Option<String>,
    #[serde(default)]
    custom_level: Option<Value>,
}

/// Parsed calibration: reference volume and per-channel baselines
#[derive(Clone, Debug)]
pub struct Calibration {
    source: Option<PathBuf>,
    title: String,
    reference_volume: Option<Volume>,
    baselines: Baselines,
}

impl Calibration {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("Calibration file is not valid JSON")?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let document: CalibrationDocument =
            serde_json::from_value(value).context("Unexpected calibration document layout")?;

        let title = document.title.unwrap_or_default();
        let reference_volume = reference_volume_from_title(&title);
        let baselines = baselines_from_channels(&document.detected_channels);

        Ok(Self {
            source: None,
            title,
            reference_volume,
            baselines,
        })
    }

    pub(crate) fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    /// File the calibration was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn reference_volume(&self) -> Option<Volume> {
        self.reference_volume
    }

    pub fn speaker_baselines(&self) -> &Baselines {
        &self.baselines
    }
}

impl CalibrationStore for Calibration {
    fn reference_volume(&self) -> Option<Volume> {
        self.reference_volume
    }

    fn speaker_baselines(&self) -> Baselines {
        self.baselines.clone()
    }
}

/// Extract the volume from a title such as "Living room MV 65dB"
pub fn reference_volume_from_title(title: &str) -> Option<Volume> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"MV\s*(-?\d+)\s*dB").expect("reference volume pattern is valid")
    });

    let captures = pattern.captures(title)?;
    let db: i32 = captures.get(1)?.as_str().parse().ok()?;
    Some(Volume::from_tenths(db.checked_mul(10)?))
}

fn is_adjustable(channel: &str) -> bool {
    !FIXED_CHANNELS.contains(&channel) && !channel.starts_with(SUBWOOFER_PREFIX)
}

/// Some exports name the surrounds "SLA"/"SRA"; the receiver expects "SL"/"SR"
fn receiver_channel_name(command_id: &str) -> &str {
    match command_id {
        "SLA" => "SL",
        "SRA" => "SR",
        other => other,
    }
}

fn custom_level_db(value: &Value) -> Option<f64> {
    let db = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    // "NaN" and "inf" parse as f64 but are not levels
    db.filter(|db| db.is_finite())
}

fn baselines_from_channels(channels: &[DetectedChannel]) -> Baselines {
    let mut baselines = Baselines::new();

    for channel in channels {
        let (Some(command_id), Some(custom_level)) = (&channel.command_id, &channel.custom_level) else {
            continue;
        };
        let name = receiver_channel_name(command_id);
        if !is_adjustable(name) {
            continue;
        }

        match custom_level_db(custom_level) {
            Some(db) => {
                let rounded = (db * 10.0).round() / 10.0;
                baselines.insert(name.to_string(), LevelUnits::ZERO_TRIM.plus_db(rounded));
            }
            None => {
                tracing::warn!("Invalid custom level for {}: {}", name, custom_level);
            }
        }
    }

    baselines
}
