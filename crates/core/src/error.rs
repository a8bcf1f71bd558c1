use thiserror::Error;

/// Errors raised by the trim engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrimError {
    /// Raw volume parameter was not a 2 or 3 digit number
    #[error("malformed volume parameter '{0}'")]
    MalformedVolume(String),

    /// Level command text did not match `SSLEV<channel> <level>`
    #[error("malformed level command '{0}'")]
    MalformedCommand(String),

    #[error("no reference volume configured or found in calibration")]
    MissingReferenceVolume,

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to send {count} command(s) to receiver: {reason}")]
    TransportSend { count: usize, reason: String },
}
