use crate::models::{Baselines, Volume};
use anyhow::Result;
use async_trait::async_trait;

/// Connection to a receiver that accepts ordered batches of text commands
#[async_trait]
pub trait ReceiverTransport: Send + Sync {
    /// Identifier for log output (host or label)
    fn id(&self) -> &str;

    /// Send a batch of commands in order
    async fn send_commands(&self, commands: &[String]) -> Result<()>;
}

/// Source of the room calibration the trims are relative to
pub trait CalibrationStore: Send + Sync {
    /// Main volume the calibration was measured at, if recorded
    fn reference_volume(&self) -> Option<Volume>;

    /// Calibrated level of every adjustable channel
    fn speaker_baselines(&self) -> Baselines;
}
