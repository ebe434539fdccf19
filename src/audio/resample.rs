//! Anti-aliased PCM downsampling.
//!
//! The speech synthesizer produces 24 kHz audio; the avatar renderer
//! consumes a lower rate (16 kHz by default).  [`resample`] performs that
//! conversion in two steps:
//!
//! 1. low-pass the input with a [`FirKernel`](crate::audio::FirKernel)
//!    (cutoff `0.45 × target_rate`, designed at the input rate) so content
//!    above the output Nyquist limit cannot alias, then
//! 2. pick output samples by linear interpolation at positions
//!    `p = i · R_in/R_out`, for an output of `floor(len / (R_in/R_out))`
//!    samples.
//!
//! ## Numeric policy
//!
//! All intermediate arithmetic is `f64`.  Final samples are rounded **half
//! away from zero** (`f64::round`) and converted with `as i16`, which
//! saturates at the i16 bounds; no explicit clamp is applied.  The kernel
//! has unit DC gain, so saturation is not expected for in-range input.
//!
//! Upsampling is not supported: the renderer never asks for a rate above
//! the synthesizer's, and an interpolation-only upsampler would need a
//! different filter design.

use thiserror::Error;

use super::filter::FirKernel;
use super::pcm::PcmBuffer;

// ---------------------------------------------------------------------------
// ResampleError
// ---------------------------------------------------------------------------

/// Errors from the resampling stage.
#[derive(Debug, Clone, Error)]
pub enum ResampleError {
    /// The requested conversion would raise the sample rate.
    #[error("unsupported operation: cannot upsample from {from} Hz to {to} Hz")]
    UnsupportedUpsample {
        /// Input rate in Hz.
        from: u32,
        /// Requested output rate in Hz.
        to: u32,
    },
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Convert `input` to `target_rate` Hz.
///
/// * Equal rates: the input is returned unchanged (identity, no filtering).
/// * `target_rate` above the input rate: [`ResampleError::UnsupportedUpsample`].
/// * Otherwise: anti-alias filter + linear interpolation as described in the
///   module docs.
///
/// # Example
///
/// ```rust
/// use avatar_voice::audio::{resample, PcmBuffer};
///
/// // 1 s at 24 kHz → 1 s at 16 kHz
/// let input = PcmBuffer::new(vec![0_i16; 24_000], 24_000);
/// let out = resample(input, 16_000).unwrap();
/// assert_eq!(out.len(), 16_000);
/// assert_eq!(out.sample_rate(), 16_000);
/// ```
pub fn resample(input: PcmBuffer, target_rate: u32) -> Result<PcmBuffer, ResampleError> {
    let source_rate = input.sample_rate();

    if source_rate == target_rate {
        return Ok(input);
    }

    if source_rate < target_rate {
        return Err(ResampleError::UnsupportedUpsample {
            from: source_rate,
            to: target_rate,
        });
    }

    if input.is_empty() {
        return Ok(PcmBuffer::new(Vec::new(), target_rate));
    }

    // Anti-alias: cutoff just below the output Nyquist limit, evaluated at
    // the input rate.
    let kernel = FirKernel::low_pass(0.45 * target_rate as f64, source_rate);
    let filtered = kernel.apply(input.samples());

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (input.len() as f64 / ratio).floor() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let p = i as f64 * ratio;
        let idx = p as usize;
        let frac = p - idx as f64;

        let value = if idx + 1 < filtered.len() {
            filtered[idx] * (1.0 - frac) + filtered[idx + 1] * frac
        } else {
            // Hold the final filtered sample when p lands on the last index.
            filtered[idx]
        };

        output.push(quantize(value));
    }

    Ok(PcmBuffer::new(output, target_rate))
}

/// Round half away from zero and convert to i16.  The `as` conversion
/// saturates at the i16 bounds, which stands in for an explicit clamp.
fn quantize(value: f64) -> i16 {
    value.round() as i16
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
