//! Amplitude-gate suppression stages and their threshold storage.
//!
//! Both stages are placeholders: per-sample amplitude scaling against a
//! threshold, applied in place. They preserve the exact behavior of the
//! shipped gates so output is bit-comparable across ports.
//! TODO: replace both gates with a real spectral suppression pass once an
//! algorithm is chosen.

use std::sync::atomic::{AtomicU32, Ordering};

/// Gain applied to samples below the noise threshold.
const QUIET_GAIN: f32 = 0.1;

/// Gain applied to samples above the voice threshold.
const LOUD_GAIN: f32 = 0.5;

/// Suppression thresholds, shared between a control thread and the audio
/// thread.
///
/// Stored as f32 bit patterns in atomics so a level change from the
/// control thread lands between stage invocations without locking the hot
/// path. Relaxed ordering is enough: the values are independent scalars
/// and a buffer processed with the previous level is acceptable.
#[derive(Debug)]
pub struct SuppressionLevels {
    noise: AtomicU32,
    voice: AtomicU32,
}

impl SuppressionLevels {
    /// Both thresholds start at 0.5.
    pub fn new() -> Self {
        Self {
            noise: AtomicU32::new(0.5f32.to_bits()),
            voice: AtomicU32::new(0.5f32.to_bits()),
        }
    }

    /// Set the noise threshold, clamped into `[0.0, 1.0]`.
    pub fn set_noise(&self, level: f32) {
        self.noise
            .store(level.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// Set the voice threshold, clamped into `[0.0, 1.0]`.
    pub fn set_voice(&self, level: f32) {
        self.voice
            .store(level.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn noise(&self) -> f32 {
        f32::from_bits(self.noise.load(Ordering::Relaxed))
    }

    pub fn voice(&self) -> f32 {
        f32::from_bits(self.voice.load(Ordering::Relaxed))
    }
}

impl Default for SuppressionLevels {
    fn default() -> Self {
        Self::new()
    }
}

/// Noise stage: attenuate every sample whose magnitude is strictly below
/// `threshold` to a tenth. Samples at or above the threshold pass
/// unchanged. Note this gates quiet content, not noise per se.
pub fn apply_noise_suppression(samples: &mut [f32], threshold: f32) {
    for sample in samples {
        if sample.abs() < threshold {
            *sample *= QUIET_GAIN;
        }
    }
}

/// Voice stage: halve every sample whose magnitude is strictly above
/// `threshold`. Samples at or below the threshold pass unchanged.
pub fn apply_voice_suppression(samples: &mut [f32], threshold: f32) {
    for sample in samples {
        if sample.abs() > threshold {
            *sample *= LOUD_GAIN;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn levels_default_to_half() {
        let levels = SuppressionLevels::new();
        assert_relative_eq!(levels.noise(), 0.5);
        assert_relative_eq!(levels.voice(), 0.5);
    }

    #[test]
    fn levels_clamp_out_of_range() {
        let levels = SuppressionLevels::new();

        levels.set_noise(1.7);
        assert_relative_eq!(levels.noise(), 1.0);
        levels.set_noise(-0.3);
        assert_relative_eq!(levels.noise(), 0.0);

        levels.set_voice(42.0);
        assert_relative_eq!(levels.voice(), 1.0);
        levels.set_voice(-f32::INFINITY);
        assert_relative_eq!(levels.voice(), 0.0);
    }

    #[test]
    fn levels_store_in_range_values_exactly() {
        let levels = SuppressionLevels::new();
        levels.set_noise(0.35);
        levels.set_voice(0.25);
        assert_relative_eq!(levels.noise(), 0.35);
        assert_relative_eq!(levels.voice(), 0.25);
    }

    #[test]
    fn noise_stage_attenuates_below_threshold() {
        let mut samples = [0.3, -0.2, 0.6, -0.7];
        apply_noise_suppression(&mut samples, 0.5);

        assert_relative_eq!(samples[0], 0.03, epsilon = 1e-6);
        assert_relative_eq!(samples[1], -0.02, epsilon = 1e-6);
        assert_relative_eq!(samples[2], 0.6);
        assert_relative_eq!(samples[3], -0.7);
    }

    #[test]
    fn noise_stage_boundary_is_exclusive() {
        // |s| == threshold is not below it.
        let mut samples = [0.5, -0.5];
        apply_noise_suppression(&mut samples, 0.5);
        assert_relative_eq!(samples[0], 0.5);
        assert_relative_eq!(samples[1], -0.5);
    }

    #[test]
    fn voice_stage_attenuates_above_threshold() {
        let mut samples = [0.3, 0.6, -0.7];
        apply_voice_suppression(&mut samples, 0.5);

        assert_relative_eq!(samples[0], 0.3);
        assert_relative_eq!(samples[1], 0.3);
        assert_relative_eq!(samples[2], -0.35);
    }

    #[test]
    fn voice_stage_boundary_is_exclusive() {
        let mut samples = [0.5, -0.5];
        apply_voice_suppression(&mut samples, 0.5);
        assert_relative_eq!(samples[0], 0.5);
        assert_relative_eq!(samples[1], -0.5);
    }

    #[test]
    fn zero_threshold_gates_nothing_in_noise_stage() {
        // No magnitude is strictly below 0.0.
        let mut samples = [0.0, 0.1, -0.1];
        apply_noise_suppression(&mut samples, 0.0);
        assert_relative_eq!(samples[0], 0.0);
        assert_relative_eq!(samples[1], 0.1);
        assert_relative_eq!(samples[2], -0.1);
    }
}
