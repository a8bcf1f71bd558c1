use std::collections::BTreeMap;
use std::fmt;

/// Zone name the receiver reports for the main listening zone
pub const MAIN_ZONE: &str = "Main";

/// Event code for a main volume change
pub const MAIN_VOLUME_EVENT: &str = "MV";

/// Speaker channel identifier as the receiver names it (e.g. "SL", "TFL")
pub type ChannelId = String;

/// Calibrated starting level for every adjustable channel
pub type Baselines = BTreeMap<ChannelId, LevelUnits>;

/// A main volume in dB, kept as tenths so band comparisons are exact
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Volume {
    tenths: i32,
}

impl Volume {
    pub const fn from_tenths(tenths: i32) -> Self {
        Self { tenths }
    }

    /// Create a volume from a dB value, rounded to one decimal
    pub fn from_db(db: f64) -> Self {
        Self {
            tenths: (db * 10.0).round() as i32,
        }
    }

    pub fn tenths(self) -> i32 {
        self.tenths
    }

    pub fn db(self) -> f64 {
        f64::from(self.tenths) / 10.0
    }
}

impl From<f64> for Volume {
    fn from(db: f64) -> Self {
        Self::from_db(db)
    }
}

impl From<Volume> for f64 {
    fn from(volume: Volume) -> Self {
        volume.db()
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}dB", self.db())
    }
}

/// Common trim before per-class scaling, counted in 0.5 dB steps
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrimAmount {
    half_steps: u32,
}

impl TrimAmount {
    pub const ZERO: TrimAmount = TrimAmount { half_steps: 0 };

    pub const fn from_half_steps(half_steps: u32) -> Self {
        Self { half_steps }
    }

    pub fn half_steps(self) -> u32 {
        self.half_steps
    }

    pub fn db(self) -> f64 {
        f64::from(self.half_steps) / 2.0
    }

    /// Half of this trim, rounded half-up to the nearest 0.5 dB
    pub fn halved(self) -> Self {
        Self {
            half_steps: (self.half_steps + 1) / 2,
        }
    }

    pub fn is_zero(self) -> bool {
        self.half_steps == 0
    }
}

impl fmt::Display for TrimAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}dB", self.db())
    }
}

/// Receiver channel level where 50 units is 0 dB of trim
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct LevelUnits(f64);

impl LevelUnits {
    /// Lowest level the receiver accepts (-12 dB)
    pub const MIN: LevelUnits = LevelUnits(38.0);
    /// Highest level the receiver accepts (+12 dB)
    pub const MAX: LevelUnits = LevelUnits(62.0);
    /// Level that corresponds to 0 dB of trim
    pub const ZERO_TRIM: LevelUnits = LevelUnits(50.0);

    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Offset in dB relative to 0 dB of trim
    pub fn offset_db(self) -> f64 {
        self.0 - Self::ZERO_TRIM.0
    }

    pub fn plus_db(self, db: f64) -> Self {
        Self(self.0 + db)
    }

    /// Round half-up to the nearest 0.5 and clamp into [MIN, MAX].
    ///
    /// NaN has no place in the range and settles to [`LevelUnits::ZERO_TRIM`].
    pub fn settle(self) -> Self {
        if self.0.is_nan() {
            return Self::ZERO_TRIM;
        }
        let rounded = crate::trim::round_half_step(self.0);
        Self(rounded.clamp(Self::MIN.0, Self::MAX.0))
    }
}

impl fmt::Display for LevelUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single channel level command destined for the receiver
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub channel: ChannelId,
    pub level: LevelUnits,
}

/// Inbound notification from the receiver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiverEvent {
    pub zone: String,
    pub event: String,
    pub parameter: String,
}

impl ReceiverEvent {
    pub fn new(zone: impl Into<String>, event: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            event: event.into(),
            parameter: parameter.into(),
        }
    }

    /// Whether this notification reports the main zone volume
    pub fn is_main_volume(&self) -> bool {
        self.zone == MAIN_ZONE && self.event == MAIN_VOLUME_EVENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_from_db() {
        assert_eq!(Volume::from_db(50.5).tenths(), 505);
        assert_eq!(Volume::from_db(65.0), Volume::from_tenths(650));
        assert_eq!(Volume::from_tenths(495).db(), 49.5);
        assert_eq!(Volume::from_db(50.5).to_string(), "50.5dB");
    }

    #[test]
    fn test_trim_halved_rounds_up() {
        assert_eq!(TrimAmount::from_half_steps(2).halved().db(), 0.5);
        assert_eq!(TrimAmount::from_half_steps(3).halved().db(), 1.0);
        assert_eq!(TrimAmount::from_half_steps(1).halved().db(), 0.5);
        assert_eq!(TrimAmount::ZERO.halved(), TrimAmount::ZERO);
    }

    #[test]
    fn test_level_settle() {
        assert_eq!(LevelUnits::new(48.3).settle(), LevelUnits::new(48.5));
        assert_eq!(LevelUnits::new(50.25).settle(), LevelUnits::new(50.5));
        assert_eq!(LevelUnits::new(70.0).settle(), LevelUnits::MAX);
        assert_eq!(LevelUnits::new(30.0).settle(), LevelUnits::MIN);
        assert_eq!(LevelUnits::new(47.0).offset_db(), -3.0);
    }

    #[test]
    fn test_level_settle_non_finite() {
        assert_eq!(LevelUnits::new(f64::NAN).settle(), LevelUnits::ZERO_TRIM);
        assert_eq!(LevelUnits::new(f64::NAN).plus_db(1.0).settle(), LevelUnits::ZERO_TRIM);
        assert_eq!(LevelUnits::new(f64::INFINITY).settle(), LevelUnits::MAX);
        assert_eq!(LevelUnits::new(f64::NEG_INFINITY).settle(), LevelUnits::MIN);
    }

    #[test]
    fn test_main_volume_event() {
        assert!(ReceiverEvent::new("Main", "MV", "505").is_main_volume());
        assert!(!ReceiverEvent::new("Zone2", "MV", "505").is_main_volume());
        assert!(!ReceiverEvent::new("Main", "PW", "ON").is_main_volume());
    }
}
