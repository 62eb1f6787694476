//! # Note Tracking Module
//!
//! Per-frame note candidates flicker: adjacent frames near an interval edge
//! can disagree even while the singer holds one note. This module is the
//! hysteresis state machine that turns the candidate stream into a stable
//! "current swar" for display.
//!
//! A locked swar yields only to a disagreeing candidate that is either
//! unambiguous (deviation past the confidence threshold) or persistent
//! (the lock has outlived its hold time). A frame with no candidate changes
//! nothing at all, so a brief dropout never erases the lock.

use crate::tuning::{NoteCandidate, Octave, Swar};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct LockedNote {
    swar: Swar,
    octave: Octave,
    /// When this swar was locked. Deliberately never refreshed while the
    /// lock holds; the hold time is measured from the start of the lock,
    /// not from the last agreeing frame.
    since: Instant,
}

/// Hysteresis state machine over note candidates.
///
/// Starts unlocked; locks on the first candidate and from then on always
/// reports some swar until the session ends. Absence of sound is conveyed by
/// the caller via the candidate path, not by unlocking.
#[derive(Debug)]
pub struct NoteTracker {
    locked: Option<LockedNote>,
    /// Minimum lock age before a low-confidence disagreement wins.
    hold_time: Duration,
    /// A disagreeing candidate at least this far (in absolute cents) from
    /// its own ideal frequency switches the lock immediately.
    confidence_cents: f32,
}

impl NoteTracker {
    pub fn new(hold_time: Duration, confidence_cents: f32) -> Self {
        NoteTracker {
            locked: None,
            hold_time,
            confidence_cents,
        }
    }

    /// The currently locked (swar, octave), if any.
    pub fn current(&self) -> Option<(Swar, Octave)> {
        self.locked.map(|l| (l.swar, l.octave))
    }

    /// Advances the state machine by one frame and returns the locked note.
    ///
    /// Transition rules, in order:
    /// 1. No candidate: keep the current state unchanged.
    /// 2. Unlocked: lock onto the candidate.
    /// 3. Candidate agrees with the lock: keep it, timestamp untouched.
    /// 4. Candidate disagrees: switch immediately when its |cents| clears
    ///    the confidence threshold, or when the lock has outlived the hold
    ///    time; otherwise keep the lock and suppress the flicker.
    pub fn update(
        &mut self,
        candidate: Option<&NoteCandidate>,
        now: Instant,
    ) -> Option<(Swar, Octave)> {
        let Some(candidate) = candidate else {
            return self.current();
        };

        match self.locked {
            None => self.lock(candidate, now),
            Some(locked) if locked.swar == candidate.swar && locked.octave == candidate.octave => {}
            Some(locked) => {
                let unambiguous = candidate.cents.abs() >= self.confidence_cents;
                let held_long_enough = now.duration_since(locked.since) > self.hold_time;
                if unambiguous || held_long_enough {
                    self.lock(candidate, now);
                }
            }
        }

        self.current()
    }

    fn lock(&mut self, candidate: &NoteCandidate, now: Instant) {
        self.locked = Some(LockedNote {
            swar: candidate.swar,
            octave: candidate.octave,
            since: now,
        });
    }
}
