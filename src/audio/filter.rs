//! Windowed-sinc FIR low-pass filter used for anti-aliasing.
//!
//! Before a buffer is downsampled, frequency content above the target
//! Nyquist limit has to be removed or it folds back into the output band as
//! distortion.  [`FirKernel::low_pass`] builds a 31-tap finite-impulse-
//! response kernel for that job:
//!
//! 1. ideal sinc response for the cutoff frequency, evaluated at the
//!    *input* sample rate,
//! 2. Hamming window (`0.54 − 0.46·cos(2πi/(N−1))`) to bound the ripple of
//!    the truncated sinc,
//! 3. normalisation so the coefficients sum to exactly 1.0 (unit DC gain —
//!    a constant signal passes through unchanged).
//!
//! [`FirKernel::apply`] convolves the kernel with a sample slice using
//! zero-padding at the boundaries, producing an output of the same length.

// ---------------------------------------------------------------------------
// FirKernel
// ---------------------------------------------------------------------------

/// Number of filter taps.  Odd, so the kernel has a well-defined centre and
/// introduces no fractional group delay.
pub const KERNEL_TAPS: usize = 31;

/// A normalised low-pass FIR kernel.
///
/// # Example
///
/// ```rust
/// use avatar_voice::audio::FirKernel;
///
/// // Anti-alias filter for a 24 kHz → 16 kHz conversion:
/// // cutoff at 0.45 × 16 000 Hz, designed at the 24 kHz input rate.
/// let kernel = FirKernel::low_pass(0.45 * 16_000.0, 24_000);
/// let sum: f64 = kernel.taps().iter().sum();
/// assert!((sum - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct FirKernel {
    taps: Vec<f64>,
}

impl FirKernel {
    /// Design a low-pass kernel with the given `cutoff_hz`, evaluated at
    /// `sample_rate` Hz.
    ///
    /// # Panics
    ///
    /// Panics if `sample_rate == 0` or `cutoff_hz <= 0.0`.
    pub fn low_pass(cutoff_hz: f64, sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "FirKernel sample_rate must be > 0");
        assert!(cutoff_hz > 0.0, "FirKernel cutoff must be > 0");

        let n = KERNEL_TAPS;
        let mid = (n - 1) / 2;
        // Cutoff in cycles per sample at the evaluation rate.
        let fc = cutoff_hz / sample_rate as f64;

        let mut taps = Vec::with_capacity(n);
        for i in 0..n {
            let x = i as f64 - mid as f64;
            let ideal = 2.0 * fc * sinc(2.0 * fc * x);
            let window = 0.54
                - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
            taps.push(ideal * window);
        }

        // Normalise to unit DC gain.
        let sum: f64 = taps.iter().sum();
        for t in &mut taps {
            *t /= sum;
        }

        Self { taps }
    }

    /// The normalised coefficients, in tap order.
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Number of taps (always [`KERNEL_TAPS`]).
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Never true; present for parity with the usual slice API.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Convolve `input` with the kernel.
    ///
    /// Samples outside the input range contribute zero, so the output has
    /// the same length as the input.  Results stay in `f64`; rounding back
    /// to `i16` is the resampler's job.
    pub fn apply(&self, input: &[i16]) -> Vec<f64> {
        let mid = (self.taps.len() - 1) as isize / 2;
        let len = input.len() as isize;

        (0..len)
            .map(|n| {
                self.taps
                    .iter()
                    .enumerate()
                    .map(|(k, &tap)| {
                        let idx = n + k as isize - mid;
                        if idx >= 0 && idx < len {
                            tap * input[idx as usize] as f64
                        } else {
                            0.0
                        }
                    })
                    .sum()
            })
            .collect()
    }
}

/// Normalised sinc: `sin(πx)/(πx)`, with `sinc(0) = 1`.
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
