//! Receiver wire formats for volumes and channel levels.
//!
//! The receiver encodes dB values as two digits for whole numbers ("50") and
//! three digits for half steps ("505" = 50.5).

use crate::error::TrimError;
use crate::models::{Command, LevelUnits, Volume};
use std::fmt;
use std::str::FromStr;

/// Prefix of a channel level command
pub const LEVEL_COMMAND_PREFIX: &str = "SSLEV";

fn parse_tenths(raw: &str) -> Option<i32> {
    let digits = raw.trim();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let value: i32 = digits.parse().ok()?;
    match digits.len() {
        3 => Some(value),
        2 => Some(value * 10),
        _ => None,
    }
}

/// Parse a raw main volume parameter ("50" -> 50 dB, "505" -> 50.5 dB)
pub fn parse_volume(raw: &str) -> Result<Volume, TrimError> {
    parse_tenths(raw)
        .map(Volume::from_tenths)
        .ok_or_else(|| TrimError::MalformedVolume(raw.to_string()))
}

/// Parse a level in the receiver's 2/3 digit form
pub fn parse_level(raw: &str) -> Result<LevelUnits, TrimError> {
    parse_tenths(raw)
        .map(|tenths| LevelUnits::new(f64::from(tenths) / 10.0))
        .ok_or_else(|| TrimError::MalformedCommand(raw.to_string()))
}

/// Format a level for the receiver (50.0 -> "50", 50.5 -> "505")
pub fn format_level(level: LevelUnits) -> String {
    let value = level.value();
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value).replace('.', "")
    }
}

impl Command {
    pub fn new(channel: impl Into<String>, level: LevelUnits) -> Self {
        Self {
            channel: channel.into(),
            level,
        }
    }

    /// Wire form: `SSLEV<channel> <level>`
    pub fn to_wire(&self) -> String {
        format!("{}{} {}", LEVEL_COMMAND_PREFIX, self.channel, format_level(self.level))
    }

    /// Parse a level command or status echo such as `SSLEVSL 51`
    pub fn parse(wire: &str) -> Result<Self, TrimError> {
        let malformed = || TrimError::MalformedCommand(wire.to_string());

        let body = wire.trim().strip_prefix(LEVEL_COMMAND_PREFIX).ok_or_else(malformed)?;
        let (channel, level) = body.split_once(' ').ok_or_else(malformed)?;

        if channel.is_empty()
            || !channel
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let level = parse_level(level).map_err(|_| malformed())?;
        Ok(Self::new(channel, level))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for Command {
    type Err = TrimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}
