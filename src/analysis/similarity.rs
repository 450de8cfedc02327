//! Peak signal-to-noise ratio over 8-bit samples.
//!
//! Higher scores mean the two buffers are more alike. Identical samples
//! score `+inf`.

/// Peak sample value squared (255²).
pub const PEAK_SQUARED: f64 = 65025.0;

/// Score of one plane/channel pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelScore {
    /// Plane index.
    pub plane: usize,
    /// Component index inside the pixel.
    pub channel: usize,
    /// Mean squared error of the sampled bytes.
    pub mse: f64,
    /// Similarity in decibels.
    pub psnr: f64,
}

/// Converts a mean squared error into a PSNR in decibels.
///
/// `mse == 0` maps to `+inf` instead of dividing by zero.
pub fn psnr(mse: f64) -> f64 {
    if mse == 0.0 {
        return f64::INFINITY;
    }
    10.0 * (PEAK_SQUARED / mse).log10()
}

/// Sums squared differences of every `step`-th byte starting at `offset`.
///
/// Both slices are read only up to the shorter of the two.
pub fn squared_error(reference: &[u8], candidate: &[u8], offset: usize, step: usize) -> u64 {
    let len = reference.len().min(candidate.len());
    (offset..len)
        .step_by(step.max(1))
        .map(|i| {
            let diff = reference[i] as i64 - candidate[i] as i64;
            (diff * diff) as u64
        })
        .sum()
}

/// Mean squared error of one channel across `lines` rows of `stride` bytes.
///
/// The divisor is the number of pixels in the compared region, counted as
/// `lines * (stride / components)`.
pub fn channel_mse(
    reference: &[u8],
    candidate: &[u8],
    channel: usize,
    components: usize,
    stride: usize,
    lines: usize,
) -> f64 {
    let sad = squared_error(reference, candidate, channel, components);
    let samples = lines * (stride / components.max(1));
    if samples == 0 {
        return 0.0;
    }
    sad as f64 / samples as f64
}
