// dhwani-core/src/lib.rs

//! The core logic for the Dhwani Hindustani vocal tuner.
//! This crate turns raw audio frames into a stable "current swar":
//! YIN pitch estimation, outlier-resistant smoothing, just-intonation
//! note mapping and hysteresis-based note locking. It is completely
//! headless and contains no audio capture or rendering code.

pub mod pitch;
pub mod session;
pub mod smoother;
pub mod tracker;
pub mod tuning;

pub use session::{TunerConfig, TunerSession};
pub use tuning::{NoteCandidate, Octave, Swar};

/// The stable note reported for one analysis frame.
///
/// The swar and octave are the tracker's locked identity (sticky across
/// small frame-to-frame jitter); `frequency` and `cents_deviation` are
/// recomputed fresh every frame, so a meter driven by them tracks the live
/// pitch even while the displayed swar holds still.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// The locked swar.
    pub swar: Swar,
    /// The locked octave.
    pub octave: Octave,
    /// This frame's smoothed frequency in Hz.
    pub frequency: f32,
    /// Signed deviation of `frequency` from the locked swar's ideal
    /// frequency, in cents. Positive is sharp, negative is flat.
    pub cents_deviation: f32,
}
