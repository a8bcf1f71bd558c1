use crate::error::TrimError;
use std::collections::BTreeSet;

/// How a channel responds to the common trim
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseClass {
    /// Receives the full trim
    FullResponse,
    /// Receives half the trim, rounded to 0.5 dB
    HalfResponse,
    /// Never adjusted outside of a reset
    Excluded,
}

/// Surround channels that take the full trim
pub const DEFAULT_FULL_RESPONSE: &[&str] = &["SL", "SR", "SBL", "SBR", "SB"];

/// Height and wide channels that take half the trim
pub const DEFAULT_HALF_RESPONSE: &[&str] = &[
    "FHL", "FHR", "FWL", "FWR", "TFL", "TFR", "TML", "TMR", "TRL", "TRR", "RHL", "RHR", "FDL",
    "FDR", "SDL", "SDR", "BDL", "BDR", "SHL", "SHR", "TS", "CH",
];

/// Two disjoint channel sets; anything outside both is excluded
///
/// Only constructible through [`ChannelPartition::new`], which rejects
/// overlapping sets, so every instance is valid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelPartition {
    full_response: BTreeSet<String>,
    half_response: BTreeSet<String>,
}

impl ChannelPartition {
    pub fn new<F, H>(full_response: F, half_response: H) -> Result<Self, TrimError>
    where
        F: IntoIterator,
        F::Item: Into<String>,
        H: IntoIterator,
        H::Item: Into<String>,
    {
        let full_response: BTreeSet<String> = full_response.into_iter().map(Into::into).collect();
        let half_response: BTreeSet<String> = half_response.into_iter().map(Into::into).collect();

        let overlap: Vec<&str> = full_response
            .intersection(&half_response)
            .map(String::as_str)
            .collect();
        if !overlap.is_empty() {
            return Err(TrimError::Configuration(format!(
                "channels listed as both full and half response: {}",
                overlap.join(", ")
            )));
        }

        Ok(Self {
            full_response,
            half_response,
        })
    }

    pub fn classify(&self, channel: &str) -> ResponseClass {
        if self.full_response.contains(channel) {
            ResponseClass::FullResponse
        } else if self.half_response.contains(channel) {
            ResponseClass::HalfResponse
        } else {
            ResponseClass::Excluded
        }
    }

    pub fn full_response(&self) -> impl Iterator<Item = &str> {
        self.full_response.iter().map(String::as_str)
    }

    pub fn half_response(&self) -> impl Iterator<Item = &str> {
        self.half_response.iter().map(String::as_str)
    }
}

impl Default for ChannelPartition {
    fn default() -> Self {
        Self {
            full_response: DEFAULT_FULL_RESPONSE.iter().map(|c| c.to_string()).collect(),
            half_response: DEFAULT_HALF_RESPONSE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_partition_classifies() {
        let partition = ChannelPartition::default();
        assert_eq!(partition.classify("SL"), ResponseClass::FullResponse);
        assert_eq!(partition.classify("SBR"), ResponseClass::FullResponse);
        assert_eq!(partition.classify("TFL"), ResponseClass::HalfResponse);
        assert_eq!(partition.classify("CH"), ResponseClass::HalfResponse);
        assert_eq!(partition.classify("FL"), ResponseClass::Excluded);
        assert_eq!(partition.classify("sl"), ResponseClass::Excluded);
    }

    #[test]
    fn test_default_sets_are_disjoint() {
        let default = ChannelPartition::default();
        let rebuilt = ChannelPartition::new(
            DEFAULT_FULL_RESPONSE.iter().copied(),
            DEFAULT_HALF_RESPONSE.iter().copied(),
        )
        .unwrap();
        assert_eq!(default, rebuilt);
    }

    #[test]
    fn test_overlap_is_configuration_error() {
        let err = ChannelPartition::new(["SL", "TFL"], ["TFL", "TFR"]).unwrap_err();
        match err {
            TrimError::Configuration(message) => assert!(message.contains("TFL")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_custom_partition() {
        let partition = ChannelPartition::new(["TFL"], ["SL"]).unwrap();
        assert_eq!(partition.classify("TFL"), ResponseClass::FullResponse);
        assert_eq!(partition.classify("SL"), ResponseClass::HalfResponse);
        assert_eq!(partition.classify("SR"), ResponseClass::Excluded);
    }
}
