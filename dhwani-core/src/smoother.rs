//! # Frequency Smoothing Module
//!
//! Raw per-frame pitch estimates jitter and occasionally spike. This module
//! stabilizes them with a short sliding window: the mean of the window is the
//! normal output, but when an outlier drags the mean away from the median the
//! median wins instead.

use std::collections::VecDeque;

/// Outlier-resistant smoothing filter over recent frequency estimates.
///
/// Owns a bounded window of the most recent non-null estimates. Null samples
/// (frames with no detection) leave the window untouched, so a brief dropout
/// does not corrupt the history.
#[derive(Debug)]
pub struct Smoother {
    window: VecDeque<f32>,
    capacity: usize,
    /// If the mean strays further than this from the median (in Hz), an
    /// outlier is pulling it and the median is reported instead.
    outlier_tolerance: f32,
}

impl Smoother {
    pub fn new(capacity: usize, outlier_tolerance: f32) -> Self {
        Smoother {
            window: VecDeque::with_capacity(capacity),
            capacity,
            outlier_tolerance,
        }
    }

    /// Feeds one frame's raw estimate and returns the stabilized frequency.
    ///
    /// A `None` sample mutates nothing and yields `None`; how "no sound this
    /// frame" is rendered is the caller's decision.
    pub fn push(&mut self, sample: Option<f32>) -> Option<f32> {
        let frequency = sample?;

        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(frequency);

        let mut sorted: Vec<f32> = self.window.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = sorted[sorted.len() / 2];
        let mean = self.window.iter().sum::<f32>() / self.window.len() as f32;

        if (mean - median).abs() > self.outlier_tolerance {
            Some(median)
        } else {
            Some(mean)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoother() -> Smoother {
        Smoother::new(5, 5.0)
    }

    #[test]
    fn single_sample_passes_through() {
        let mut s = smoother();
        assert_eq!(s.push(Some(240.0)), Some(240.0));
    }

    #[test]
    fn steady_input_averages() {
        let mut s = smoother();
        s.push(Some(240.0));
        s.push(Some(242.0));
        let out = s.push(Some(241.0)).unwrap();
        assert!((out - 241.0).abs() < 1e-3, "got {out}");
    }

    #[test]
    fn outlier_is_replaced_by_median() {
        let mut s = smoother();
        s.push(Some(240.0));
        s.push(Some(241.0));
        s.push(Some(240.5));
        s.push(Some(240.8));
        // A spike of an octave: mean jumps far from the median, so the
        // median (a plausible recent value) must be reported instead.
        let out = s.push(Some(480.0)).unwrap();
        assert!((out - 240.8).abs() < 1e-3, "got {out}");
    }

    #[test]
    fn null_sample_does_not_mutate_window() {
        let mut s = smoother();
        s.push(Some(240.0));
        s.push(Some(242.0));
        assert_eq!(s.push(None), None);
        // Window unchanged: the next sample averages with both prior ones.
        let out = s.push(Some(244.0)).unwrap();
        assert!((out - 242.0).abs() < 1e-3, "got {out}");
    }

    #[test]
    fn window_evicts_oldest_at_capacity() {
        let mut s = Smoother::new(3, 5.0);
        s.push(Some(100.0));
        s.push(Some(200.0));
        s.push(Some(201.0));
        // 100 is evicted; window is now {200, 201, 202}.
        let out = s.push(Some(202.0)).unwrap();
        assert!((out - 201.0).abs() < 1e-3, "got {out}");
    }
}
