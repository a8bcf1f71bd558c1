//! Turns main volume notifications into settled channel trims.
//!
//! A [`ChangeCoordinator`] owns the last applied trim and the debounce timer
//! and runs as a single task, so neither needs a lock.

use crate::applicator::apply_trim;
use crate::classifier::ChannelPartition;
use crate::codec::parse_volume;
use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE_WINDOW};
use crate::error::TrimError;
use crate::models::{Baselines, Command, ReceiverEvent, TrimAmount, Volume};
use crate::traits::{CalibrationStore, ReceiverTransport};
use crate::trim::calculate_trim;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Values the coordinator needs from configuration
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Volume the calibration was made at; `None` disables adjustment
    pub reference_volume: Option<Volume>,
    pub debounce_window: Duration,
    pub partition: ChannelPartition,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            reference_volume: None,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            partition: ChannelPartition::default(),
        }
    }
}

/// Result of acting on a settled volume
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Commands were sent and the trim recorded
    Applied { trim: TrimAmount, commands: usize },
    /// Trim matched the last applied one, nothing sent
    Unchanged(TrimAmount),
    /// No channel is adjustable, trim recorded without a send
    NothingToSend(TrimAmount),
}

pub struct ChangeCoordinator {
    transport: Arc<dyn ReceiverTransport>,
    baselines: Baselines,
    partition: ChannelPartition,
    reference_volume: Option<Volume>,
    last_applied: Option<TrimAmount>,
    debouncer: Debouncer,
}

impl ChangeCoordinator {
    pub fn new(
        transport: Arc<dyn ReceiverTransport>,
        baselines: Baselines,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            transport,
            baselines,
            partition: config.partition,
            reference_volume: config.reference_volume,
            last_applied: None,
            debouncer: Debouncer::new(config.debounce_window),
        }
    }

    /// Take baselines from `calibration`, and its reference volume unless
    /// `config` already names one
    pub fn from_calibration(
        transport: Arc<dyn ReceiverTransport>,
        calibration: &dyn CalibrationStore,
        mut config: CoordinatorConfig,
    ) -> Self {
        config.reference_volume = config.reference_volume.or_else(|| calibration.reference_volume());
        Self::new(transport, calibration.speaker_baselines(), config)
    }

    pub fn reference_volume(&self) -> Option<Volume> {
        self.reference_volume
    }

    pub fn last_applied(&self) -> Option<TrimAmount> {
        self.last_applied
    }

    pub fn is_debouncing(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Feed a receiver notification into the debounce window.
    ///
    /// Returns the scheduled volume, or `None` when the event is not a main
    /// volume change.
    pub fn handle_event(&mut self, event: &ReceiverEvent) -> Result<Option<Volume>, TrimError> {
        if !event.is_main_volume() {
            tracing::trace!("Ignoring {} {} {}", event.zone, event.event, event.parameter);
            return Ok(None);
        }

        let volume = parse_volume(&event.parameter)?;
        if let Some(superseded) = self.debouncer.schedule(volume) {
            tracing::debug!("Main volume {} superseded by {}", superseded, volume);
        } else {
            tracing::debug!("Main volume {}, waiting {:?} for it to settle", volume, self.debouncer.window());
        }

        Ok(Some(volume))
    }

    /// Compute and send the trim for a settled main volume
    pub async fn apply_volume(&mut self, volume: Volume) -> Result<ApplyOutcome, TrimError> {
        let reference = self
            .reference_volume
            .ok_or(TrimError::MissingReferenceVolume)?;

        let trim = calculate_trim(volume, reference);

        if self.last_applied == Some(trim) {
            tracing::info!(
                "No adjustment needed, trim for main volume {} is unchanged at {}",
                volume,
                trim
            );
            return Ok(ApplyOutcome::Unchanged(trim));
        }

        tracing::info!(
            "Applying surround/height correction {} for main volume {} (reference {})",
            trim,
            volume,
            reference
        );

        let commands = apply_trim(&self.baselines, &self.partition, trim, false);
        if commands.is_empty() {
            tracing::warn!("No adjustable channels in calibration, nothing to send");
            self.last_applied = Some(trim);
            return Ok(ApplyOutcome::NothingToSend(trim));
        }

        self.send(&commands).await?;
        self.last_applied = Some(trim);

        Ok(ApplyOutcome::Applied {
            trim,
            commands: commands.len(),
        })
    }

    /// Cancel any pending window and put every channel back at its baseline.
    ///
    /// Returns the number of commands sent. The last applied trim is left as
    /// is since this only runs on the way out.
    pub async fn restore(&mut self) -> Result<usize, TrimError> {
        if let Some(volume) = self.debouncer.cancel() {
            tracing::debug!("Cancelled pending adjustment for main volume {}", volume);
        }

        tracing::info!("Resetting speaker levels to calibration");

        let commands = apply_trim(&self.baselines, &self.partition, TrimAmount::ZERO, true);
        if commands.is_empty() {
            return Ok(0);
        }

        self.send(&commands).await?;
        Ok(commands.len())
    }

    /// Process notifications until `shutdown` resolves or the event stream
    /// closes, then restore calibrated levels.
    pub async fn run<S>(mut self, mut events: mpsc::Receiver<ReceiverEvent>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            "Monitoring main volume on {} (reference: {})",
            self.transport.id(),
            self.reference_volume
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_event(&event) {
                            tracing::warn!("Dropping notification: {}", e);
                        }
                    }
                    None => {
                        tracing::warn!("Receiver notification stream closed");
                        break;
                    }
                },
                volume = self.debouncer.settled() => {
                    match self.apply_volume(volume).await {
                        Ok(outcome) => tracing::debug!("Settled main volume {}: {:?}", volume, outcome),
                        Err(e) => tracing::warn!("Skipping adjustment for main volume {}: {}", volume, e),
                    }
                }
            }
        }

        match self.restore().await {
            Ok(count) => tracing::info!("Restored {} channel(s) to calibration", count),
            Err(e) => tracing::error!("Failed to restore calibrated levels: {}", e),
        }
    }

    async fn send(&self, commands: &[Command]) -> Result<(), TrimError> {
        let wire: Vec<String> = commands.iter().map(Command::to_wire).collect();

        tracing::info!("Sending {} adjustment(s) to {}", wire.len(), self.transport.id());
        self.transport
            .send_commands(&wire)
            .await
            .map_err(|e| TrimError::TransportSend {
                count: wire.len(),
                reason: format!("{:#}", e),
            })
    }
}
