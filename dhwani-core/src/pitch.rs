//! # Pitch Detection Module
//!
//! This module implements time-domain fundamental frequency estimation for a
//! monophonic vocal signal.
//!
//! ## Features
//! - YIN pitch detection with cumulative mean normalized difference
//! - Amplitude gating to filter out silence before any heavy work
//! - Parabolic interpolation for sub-sample accuracy
//! - Guards against non-finite intermediates (zero running sums, empty dips)
//! - A cruder autocorrelation estimator kept as a separately tested fallback

/// A YIN fundamental frequency estimator.
///
/// Holds the detection thresholds plus a scratch buffer so the O(N²)
/// difference function does not allocate on every frame. One instance per
/// tuning session; `estimate` is called once per audio frame.
#[derive(Debug)]
pub struct YinEstimator {
    /// Absolute threshold on the normalized difference, in (0, 1).
    /// Lower is stricter (more "no pitch" results).
    threshold: f32,
    /// Minimum RMS amplitude; frames below this are treated as silence.
    amplitude_threshold: f32,
    /// Scratch buffer holding the difference function, then the CMNDF.
    buffer: Vec<f32>,
}

impl YinEstimator {
    pub fn new(threshold: f32, amplitude_threshold: f32) -> Self {
        YinEstimator {
            threshold,
            amplitude_threshold,
            buffer: Vec::new(),
        }
    }

    /// Estimates the fundamental frequency of one audio frame.
    ///
    /// # Arguments
    /// * `signal` - Input audio samples, nominally in [-1, 1]
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `Some(frequency)` - Detected fundamental frequency in Hz
    /// * `None` - No pitch detected (silence, noise, or no dip under threshold)
    pub fn estimate(&mut self, signal: &[f32], sample_rate: u32) -> Option<f32> {
        let frame_size = signal.len();
        let half = frame_size / 2;
        if half < 2 {
            return None;
        }

        // --- Noise gate: skip the O(N²) work for silent frames ---
        let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / frame_size as f32).sqrt();
        if rms < self.amplitude_threshold {
            return None;
        }

        // --- Step 1: Difference function d(tau) ---
        // The comparison window is a constant half frame. Letting the window
        // shrink with tau instead would drive d(tau) toward zero near the end
        // of the buffer and fake a deep dip on any input, noise included.
        self.buffer.clear();
        self.buffer.resize(half, 0.0);
        for tau in 1..half {
            let mut diff = 0.0;
            for i in 0..half {
                let delta = signal[i] - signal[i + tau];
                diff += delta * delta;
            }
            self.buffer[tau] = diff;
        }

        // --- Step 2: Cumulative mean normalized difference, in place ---
        // cmndf(0) is 1 by convention and never selected. A zero running sum
        // means the signal matched itself perfectly so far (e.g. DC); pinning
        // cmndf to 1 there records "no dip" instead of dividing by zero.
        let mut running_sum = 0.0;
        self.buffer[0] = 1.0;
        for tau in 1..half {
            running_sum += self.buffer[tau];
            if running_sum > 0.0 {
                self.buffer[tau] *= tau as f32 / running_sum;
            } else {
                self.buffer[tau] = 1.0;
            }
        }

        // --- Step 3: Absolute threshold search ---
        // Take the first dip under the threshold, then walk down to its
        // trough so we report the bottom of the dip, not its leading edge.
        let mut period = None;
        for mut tau in 2..half {
            if self.buffer[tau] < self.threshold {
                while tau + 1 < half && self.buffer[tau + 1] < self.buffer[tau] {
                    tau += 1;
                }
                period = Some(tau);
                break;
            }
        }
        let period = period?;

        // --- Step 4: Parabolic interpolation for sub-sample accuracy ---
        let better_period = parabolic_interpolation(&self.buffer, period);

        let frequency = sample_rate as f32 / better_period;
        if frequency.is_finite() && frequency > 0.0 {
            Some(frequency)
        } else {
            None
        }
    }
}

/// Refines an integer dip position by fitting a parabola through the value at
/// `tau` and its two neighbors, returning the sub-sample vertex position.
///
/// At a buffer boundary the missing neighbor is not extrapolated; the lower
/// of the two available points wins instead.
fn parabolic_interpolation(values: &[f32], tau: usize) -> f32 {
    let x0 = if tau < 1 { tau } else { tau - 1 };
    let x2 = if tau + 1 < values.len() { tau + 1 } else { tau };

    if x0 == tau {
        if values[tau] <= values[x2] { tau as f32 } else { x2 as f32 }
    } else if x2 == tau {
        if values[tau] <= values[x0] { tau as f32 } else { x0 as f32 }
    } else {
        let s0 = values[x0];
        let s1 = values[tau];
        let s2 = values[x2];
        let denominator = 2.0 * (2.0 * s1 - s2 - s0);
        if denominator != 0.0 {
            tau as f32 + (s2 - s0) / denominator
        } else {
            tau as f32
        }
    }
}

/// Correlation a candidate period must reach before the autocorrelation
/// estimator accepts it.
const CORRELATION_THRESHOLD: f32 = 0.9;

/// A cruder pitch estimator based on energy-normalized autocorrelation.
///
/// This is the fallback strategy: cheaper and less precise than YIN, with a
/// hand-tuned correlation threshold instead of a normalized difference. It is
/// not part of the canonical per-frame pipeline but is kept as an explicit,
/// separately tested alternative.
///
/// # Returns
/// * `Some(frequency)` - Detected fundamental frequency in Hz
/// * `None` - Signal too quiet, or no offset correlates above the threshold
pub fn detect_pitch_autocorrelation(
    signal: &[f32],
    sample_rate: u32,
    amplitude_threshold: f32,
) -> Option<f32> {
    let size = signal.len();
    let half = size / 2;
    if half < 2 {
        return None;
    }

    let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / size as f32).sqrt();
    if rms < amplitude_threshold {
        return None;
    }

    // Normalized similarity per offset: 1 at a perfect match, falling toward
    // 0 as the lag misaligns the waveform.
    let mut correlations = vec![0.0f32; half];
    for (offset, correlation) in correlations.iter_mut().enumerate() {
        let mut sum = 0.0;
        for i in 0..half {
            sum += (signal[i] - signal[i + offset]).abs();
        }
        *correlation = 1.0 - sum / half as f32;
    }

    // Keep the best offset whose correlation clears the threshold while
    // still rising; the rising requirement skips the trivial peak at lag 0.
    let mut best_offset = None;
    let mut best_correlation = 0.0;
    let mut last_correlation = 1.0;
    for (offset, &correlation) in correlations.iter().enumerate() {
        if correlation > CORRELATION_THRESHOLD
            && correlation > last_correlation
            && correlation > best_correlation
        {
            best_correlation = correlation;
            best_offset = Some(offset);
        }
        last_correlation = correlation;
    }
    let best_offset = best_offset?;

    let better_offset = parabolic_interpolation(&correlations, best_offset);
    let frequency = sample_rate as f32 / better_offset;
    if frequency.is_finite() && frequency > 0.0 {
        Some(frequency)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;
    const FRAME_SIZE: usize = 2048;

    fn sine(frequency: f32, amplitude: f32) -> Vec<f32> {
        (0..FRAME_SIZE)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32)
                        .sin()
            })
            .collect()
    }

    #[test]
    fn pure_tone_is_detected_within_one_percent() {
        let mut estimator = YinEstimator::new(0.1, 0.01);
        let frame = sine(220.0, 0.8);
        let detected = estimator.estimate(&frame, SAMPLE_RATE).unwrap();
        assert!(
            (detected - 220.0).abs() < 2.2,
            "expected ~220 Hz, got {detected}"
        );
    }

    #[test]
    fn estimator_tracks_the_tonic_region() {
        let mut estimator = YinEstimator::new(0.1, 0.01);
        let frame = sine(241.0, 0.8);
        let detected = estimator.estimate(&frame, SAMPLE_RATE).unwrap();
        assert!(
            (detected - 241.0).abs() < 2.0,
            "expected ~241 Hz, got {detected}"
        );
    }

    #[test]
    fn silence_yields_none() {
        let mut estimator = YinEstimator::new(0.1, 0.01);
        let silence = vec![0.0; FRAME_SIZE];
        assert_eq!(estimator.estimate(&silence, SAMPLE_RATE), None);
    }

    #[test]
    fn near_silence_is_gated() {
        let mut estimator = YinEstimator::new(0.1, 0.01);
        let quiet = sine(220.0, 0.001);
        assert_eq!(estimator.estimate(&quiet, SAMPLE_RATE), None);
    }

    #[test]
    fn dc_signal_yields_none() {
        // Constant signal: every difference is zero, the running sum never
        // grows, and the zero-sum guard must report "no pitch" rather than
        // divide by zero. The RMS gate does not catch this one.
        let mut estimator = YinEstimator::new(0.1, 0.01);
        let dc = vec![0.5; FRAME_SIZE];
        assert_eq!(estimator.estimate(&dc, SAMPLE_RATE), None);
    }

    #[test]
    fn white_noise_yields_none() {
        // Cheap deterministic pseudo-noise; no periodicity to find.
        let mut state = 0x2545F491u32;
        let noise: Vec<f32> = (0..FRAME_SIZE)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect();
        let mut estimator = YinEstimator::new(0.1, 0.01);
        assert_eq!(estimator.estimate(&noise, SAMPLE_RATE), None);
    }

    #[test]
    fn empty_and_tiny_frames_yield_none() {
        let mut estimator = YinEstimator::new(0.1, 0.01);
        assert_eq!(estimator.estimate(&[], SAMPLE_RATE), None);
        assert_eq!(estimator.estimate(&[0.3], SAMPLE_RATE), None);
    }

    #[test]
    fn estimator_is_reusable_across_frames() {
        let mut estimator = YinEstimator::new(0.1, 0.01);
        let low = sine(110.0, 0.8);
        let high = sine(440.0, 0.8);
        let first = estimator.estimate(&low, SAMPLE_RATE).unwrap();
        let second = estimator.estimate(&high, SAMPLE_RATE).unwrap();
        assert!((first - 110.0).abs() < 1.5, "got {first}");
        assert!((second - 440.0).abs() < 4.4, "got {second}");
    }

    #[test]
    fn autocorrelation_fallback_detects_pure_tone() {
        let frame = sine(220.0, 0.8);
        let detected = detect_pitch_autocorrelation(&frame, SAMPLE_RATE, 0.01).unwrap();
        assert!(
            (detected - 220.0).abs() < 5.0,
            "expected ~220 Hz, got {detected}"
        );
    }

    #[test]
    fn autocorrelation_fallback_gates_silence() {
        let silence = vec![0.0; FRAME_SIZE];
        assert_eq!(
            detect_pitch_autocorrelation(&silence, SAMPLE_RATE, 0.01),
            None
        );
    }
}
