//! Rolling adaptive normalization of the effective-energy signal.

use std::collections::VecDeque;

use super::features::IntensitySample;

/// Gain of the asymmetric push/pull step applied after adaptive scaling.
const PUSH_GAIN: f32 = 0.075;

pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

/// Fixed-capacity FIFO of raw effective-energy values. Adaptive scaling in
/// [`Normalizer`] only activates once the window is full.
#[derive(Clone, Debug)]
pub struct IntensityHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl IntensityHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.samples.push_back(value);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn min(&self) -> f32 {
        self.samples.iter().copied().fold(f32::INFINITY, f32::min)
    }

    fn max(&self) -> f32 {
        self.samples
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Maps raw effective energy into a bounded beat intensity using the
/// observed min/max of a rolling window, then applies a directional
/// push/pull step that overshoots rises and undershoots falls.
///
/// State is explicit and order-dependent: each sample depends on the
/// accumulated window and the previous output, so one normalizer serves
/// exactly one sequential pass over a track.
#[derive(Clone, Debug)]
pub struct Normalizer {
    history: IntensityHistory,
    prev: f32,
    clamp_floor: bool,
}

impl Normalizer {
    /// `clamp_floor` additionally bounds the push/pull result at zero.
    /// Without it the value can dip slightly negative on a falling edge,
    /// matching the historical behavior some renderers expect.
    pub fn new(history_capacity: usize, clamp_floor: bool) -> Self {
        Self {
            history: IntensityHistory::new(history_capacity),
            prev: 0.0,
            clamp_floor,
        }
    }

    /// Feed the next effective-energy value and produce the intensity pair.
    pub fn advance(&mut self, eff: f32) -> IntensitySample {
        self.history.push(eff);

        let avg = if self.history.is_full() {
            let min = self.history.min();
            let max = self.history.max();
            if max == min {
                // Flat window; avoid dividing by zero.
                0.0
            } else {
                ((eff - min) / (max - min)).clamp(0.0, 1.0)
            }
        } else {
            // Window still filling: pass raw energy through unscaled.
            eff
        };

        let direction = if avg > self.prev { 1.0 } else { -1.0 };
        let mut current = (direction * PUSH_GAIN * avg + avg).min(1.0);
        if self.clamp_floor {
            current = current.max(0.0);
        }

        let sample = IntensitySample {
            previous: self.prev,
            current,
        };
        self.prev = current;
        sample
    }

    /// Forget all accumulated state, e.g. when a new track loads.
    pub fn reset(&mut self) {
        self.history.clear();
        self.prev = 0.0;
    }
}
