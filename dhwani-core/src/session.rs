//! # Tuning Session Module
//!
//! A [`TunerSession`] owns one complete per-frame pipeline: YIN estimator,
//! smoothing window, scale table and note tracker, configured once at
//! construction. The caller feeds it fixed-size audio frames, strictly
//! sequentially, and receives at most one [`NoteEvent`] per frame.
//!
//! The session is the only stateful object in the core; there are no
//! process-wide singletons. Multiple concurrent sessions just mean multiple
//! independent `TunerSession` values.

use crate::NoteEvent;
use crate::pitch::YinEstimator;
use crate::smoother::Smoother;
use crate::tracker::NoteTracker;
use crate::tuning::{ScaleTable, cents_difference};
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tuner configuration, fixed for the lifetime of a session.
///
/// All fields have sensible vocal-tuning defaults; a config file only needs
/// to name the fields it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Frequency of Sa in the middle (Madhya) octave, in Hz.
    pub tonic: f32,
    /// Sample rate of the incoming audio frames, in Hz.
    pub sample_rate: u32,
    /// YIN absolute threshold in (0, 1). Lower is stricter.
    pub yin_threshold: f32,
    /// Minimum RMS amplitude; quieter frames count as silence.
    pub amplitude_threshold: f32,
    /// Capacity of the frequency smoothing window, in frames.
    pub smoothing_window: usize,
    /// Mean/median disagreement (Hz) past which the smoother treats the
    /// newest sample as an outlier.
    pub outlier_tolerance: f32,
    /// Minimum lock age (ms) before a low-confidence swar change wins.
    pub hold_time_ms: u64,
    /// Absolute cents deviation that makes a swar change unambiguous.
    pub confidence_cents: f32,
    /// Half-width (cents) of each swar's acceptance interval.
    pub range_cents: f32,
    /// Lower edge of the accepted vocal band, in Hz.
    pub min_frequency: f32,
    /// Upper edge of the accepted vocal band, in Hz.
    pub max_frequency: f32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        TunerConfig {
            tonic: 240.0,
            sample_rate: 44100,
            yin_threshold: 0.10,
            amplitude_threshold: 0.01,
            smoothing_window: 5,
            outlier_tolerance: 5.0,
            hold_time_ms: 100,
            confidence_cents: 40.0,
            range_cents: 30.0,
            min_frequency: 70.0,
            max_frequency: 1000.0,
        }
    }
}

impl TunerConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.tonic.is_finite() && self.tonic > 0.0,
            "tonic frequency must be positive, got {}",
            self.tonic
        );
        ensure!(self.sample_rate > 0, "sample rate must be positive");
        ensure!(
            self.yin_threshold > 0.0 && self.yin_threshold < 1.0,
            "YIN threshold must be in (0, 1), got {}",
            self.yin_threshold
        );
        ensure!(
            self.amplitude_threshold >= 0.0,
            "amplitude threshold must not be negative"
        );
        ensure!(
            self.smoothing_window > 0,
            "smoothing window must hold at least one sample"
        );
        ensure!(
            self.outlier_tolerance > 0.0,
            "outlier tolerance must be positive"
        );
        ensure!(
            self.confidence_cents > 0.0,
            "confidence threshold must be positive"
        );
        ensure!(
            self.min_frequency > 0.0 && self.min_frequency < self.max_frequency,
            "vocal band [{}, {}] is empty or inverted",
            self.min_frequency,
            self.max_frequency
        );
        Ok(())
    }
}

/// One tuning session: configuration plus all per-frame state.
#[derive(Debug)]
pub struct TunerSession {
    scale: ScaleTable,
    estimator: YinEstimator,
    smoother: Smoother,
    tracker: NoteTracker,
    sample_rate: u32,
    min_frequency: f32,
    max_frequency: f32,
}

impl TunerSession {
    /// Builds a session, failing fast on malformed configuration.
    pub fn new(config: TunerConfig) -> Result<Self> {
        config.validate()?;
        Ok(TunerSession {
            scale: ScaleTable::new(config.tonic, config.range_cents)?,
            estimator: YinEstimator::new(config.yin_threshold, config.amplitude_threshold),
            smoother: Smoother::new(config.smoothing_window, config.outlier_tolerance),
            tracker: NoteTracker::new(
                Duration::from_millis(config.hold_time_ms),
                config.confidence_cents,
            ),
            sample_rate: config.sample_rate,
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
        })
    }

    /// The session's immutable scale table.
    pub fn scale(&self) -> &ScaleTable {
        &self.scale
    }

    /// Processes one audio frame and returns the stable note event, if any.
    ///
    /// An empty frame is a caller bug and an error; every other degenerate
    /// case (silence, noise, unmappable frequency) is a normal `None`.
    pub fn process(&mut self, frame: &[f32]) -> Result<Option<NoteEvent>> {
        ensure!(!frame.is_empty(), "audio frame is empty");
        let raw = self
            .estimator
            .estimate(frame, self.sample_rate)
            .filter(|f| (self.min_frequency..=self.max_frequency).contains(f));
        Ok(self.advance(raw, Instant::now()))
    }

    /// Smoothing, mapping and tracking for one frame, with the clock passed
    /// in so tests can drive hold-time transitions deterministically.
    fn advance(&mut self, raw: Option<f32>, now: Instant) -> Option<NoteEvent> {
        let smoothed = self.smoother.push(raw);

        let Some(frequency) = smoothed else {
            // No detection this frame. The tracker stays put; the caller
            // renders the dropout however it likes.
            self.tracker.update(None, now);
            return None;
        };

        let candidate = self.scale.map_frequency(frequency, self.tracker.current());
        let locked = self.tracker.update(candidate.as_ref(), now);

        match (candidate, locked) {
            (Some(_), Some((swar, octave))) => Some(NoteEvent {
                swar,
                octave,
                frequency,
                // Deviation is recomputed against the locked swar every
                // frame, so the meter tracks live pitch even while the
                // displayed swar is sticky.
                cents_deviation: cents_difference(frequency, self.scale.ideal(octave, swar)),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::{Octave, Swar};

    const SAMPLE_RATE: u32 = 44100;
    const FRAME_SIZE: usize = 2048;

    fn sine(frequency: f32) -> Vec<f32> {
        (0..FRAME_SIZE)
            .map(|i| {
                0.8 * (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32)
                    .sin()
            })
            .collect()
    }

    fn session() -> TunerSession {
        TunerSession::new(TunerConfig::default()).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(TunerSession::new(TunerConfig::default()).is_ok());
    }

    #[test]
    fn bad_config_fails_fast() {
        for config in [
            TunerConfig {
                tonic: -1.0,
                ..TunerConfig::default()
            },
            TunerConfig {
                yin_threshold: 1.5,
                ..TunerConfig::default()
            },
            TunerConfig {
                smoothing_window: 0,
                ..TunerConfig::default()
            },
            TunerConfig {
                min_frequency: 2000.0,
                ..TunerConfig::default()
            },
        ] {
            assert!(TunerSession::new(config).is_err());
        }
    }

    #[test]
    fn empty_frame_is_an_error() {
        let mut session = session();
        assert!(session.process(&[]).is_err());
    }

    #[test]
    fn silence_produces_no_event() {
        let mut session = session();
        let silence = vec![0.0; FRAME_SIZE];
        assert_eq!(session.process(&silence).unwrap(), None);
    }

    #[test]
    fn sharp_sa_locks_and_reports_live_deviation() {
        // The spec end-to-end scenario: tonic 240 Hz, input a 241 Hz sine.
        let mut session = session();
        let frame = sine(241.0);

        let mut last = None;
        for _ in 0..5 {
            last = session.process(&frame).unwrap();
        }
        let event = last.expect("a steady 241 Hz tone must produce an event");

        assert_eq!(event.swar, Swar::Sa);
        assert_eq!(event.octave, Octave::Madhya);
        assert!(
            (event.frequency - 241.0).abs() < 2.0,
            "frequency = {}",
            event.frequency
        );
        assert!(
            (event.cents_deviation - 7.2).abs() < 3.0,
            "cents = {}",
            event.cents_deviation
        );
    }

    #[test]
    fn out_of_band_frequency_is_discarded() {
        let config = TunerConfig {
            // Sa of the Taar octave (480 Hz) is now above the band.
            max_frequency: 400.0,
            ..TunerConfig::default()
        };
        let mut session = TunerSession::new(config).unwrap();
        let frame = sine(480.0);
        for _ in 0..5 {
            assert_eq!(session.process(&frame).unwrap(), None);
        }
    }

    #[test]
    fn dropout_keeps_the_lock_sticky() {
        let mut session = session();
        let frame = sine(241.0);
        let silence = vec![0.0; FRAME_SIZE];

        for _ in 0..3 {
            session.process(&frame).unwrap();
        }
        // Dropout frames produce no event but must not erase the lock...
        assert_eq!(session.process(&silence).unwrap(), None);
        // ...so the next voiced frame reports Sa again right away.
        let event = session.process(&frame).unwrap().unwrap();
        assert_eq!(event.swar, Swar::Sa);
    }

    #[test]
    fn hold_time_gates_a_low_confidence_change() {
        let mut session = session();
        let now = Instant::now();
        let re = 240.0 * 16.0 / 15.0;

        // Lock on Sa, slightly sharp.
        assert!(session.advance(Some(241.0), now).is_some());

        // Early komal re frames are low confidence and inside the hold
        // window: the reported swar stays Sa while the smoothing window
        // catches up. (The middle frame's smoothed value can fall between
        // intervals; its event is not asserted.)
        let event = session
            .advance(Some(re), now + Duration::from_millis(40))
            .unwrap();
        assert_eq!(event.swar, Swar::Sa);
        session.advance(Some(re), now + Duration::from_millis(60));
        let event = session
            .advance(Some(re), now + Duration::from_millis(80))
            .unwrap();
        assert_eq!(event.swar, Swar::Sa);

        // The sustained disagreement past the hold time finally wins.
        let event = session
            .advance(Some(re), now + Duration::from_millis(200))
            .unwrap();
        assert_eq!(event.swar, Swar::KomalRe);
    }
}
