//! Loudness compensation curve.
//!
//! Everything is computed in hundredths of a dB from the volume's tenths so the
//! band edges (55, 50, 49 dB) and half-step rounding never suffer float drift.

use crate::models::{TrimAmount, Volume};

/// Round half-up to the nearest 0.5
pub fn round_half_step(value: f64) -> f64 {
    (value * 2.0 + 0.5).floor() / 2.0
}

/// `0.2 * (reference - 55) + 3.5`, in hundredths of a dB
fn reference_correction_hundredths(reference: Volume) -> i64 {
    2 * i64::from(reference.tenths()) - 750
}

/// Compensation already provided by the current volume, in hundredths of a dB
fn band_offset_hundredths(current: Volume) -> i64 {
    let tenths = i64::from(current.tenths());
    match tenths {
        t if t >= 550 => 2 * t - 750,
        t if t >= 500 => 5 * t - 2400,
        t if t > 490 => 50,
        _ => 0,
    }
}

/// Maximum boost available for a calibration made at `reference`
pub fn reference_correction(reference: Volume) -> f64 {
    reference_correction_hundredths(reference) as f64 / 100.0
}

/// Common surround/height trim for `current` when calibrated at `reference`.
///
/// Zero at or above the reference volume, otherwise the reference correction
/// minus the band offset, rounded half-up to 0.5 dB and floored at zero.
pub fn calculate_trim(current: Volume, reference: Volume) -> TrimAmount {
    if current >= reference {
        return TrimAmount::ZERO;
    }

    let hundredths = reference_correction_hundredths(reference) - band_offset_hundredths(current);
    let half_steps = (2 * hundredths + 50).div_euclid(100);

    TrimAmount::from_half_steps(half_steps.max(0) as u32)
}
