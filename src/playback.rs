//! Frame-synchronized sampling of a precomputed frame table during playback.

use crate::audio::features::{FrameTable, IntensitySample};

/// Smoothing factor applied to a display bin that is rising.
const ATTACK: f32 = 0.8;
/// Smoothing factor applied to a display bin that is falling.
const RELEASE: f32 = 0.15;

/// Interpolates the precomputed signal at arbitrary playback positions.
///
/// Intensity and per-bin amplitudes are linearly interpolated between the
/// two frames bracketing the playback time; amplitudes then pass through
/// fast-attack / slow-release smoothing against the previous tick's output,
/// which keeps falling energy from flickering.
#[derive(Clone, Debug, Default)]
pub struct FrameSampler {
    smoothed: Vec<f32>,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the table at the given playback position, in seconds.
    ///
    /// Returns `None` past the final frame, signalling end of track; the
    /// caller should stop ticking. While the source is paused, call
    /// [`FrameSampler::silence`] instead so stale values do not freeze
    /// on screen.
    pub fn sample(
        &mut self,
        table: &FrameTable,
        time_secs: f32,
    ) -> Option<(IntensitySample, Vec<f32>)> {
        let frame_count = table.frame_count();
        if frame_count == 0 || table.hop_size == 0 {
            return None;
        }

        let exact = time_secs.max(0.0) * table.sample_rate as f32 / table.hop_size as f32;
        let idx_a = exact.floor() as usize;
        if idx_a >= frame_count {
            return None;
        }
        let idx_b = (idx_a + 1).min(frame_count - 1);
        let t = exact - idx_a as f32;

        let a = &table.frames[idx_a];
        let b = &table.frames[idx_b];

        let current = a.intensity.current + (b.intensity.current - a.intensity.current) * t;
        let intensity = IntensitySample {
            previous: a.intensity.current,
            current,
        };

        if self.smoothed.len() != a.amplitudes.len() {
            self.smoothed = vec![0.0; a.amplitudes.len()];
        }

        let mut amplitudes = Vec::with_capacity(a.amplitudes.len());
        for (i, prev) in self.smoothed.iter_mut().enumerate() {
            let bin_a = a.amplitudes[i];
            let bin_b = b.amplitudes.get(i).copied().unwrap_or(bin_a);
            let target = bin_a + (bin_b - bin_a) * t;

            let sensitivity = if target > *prev { ATTACK } else { RELEASE };
            *prev += (target - *prev) * sensitivity;
            amplitudes.push(*prev);
        }

        Some((intensity, amplitudes))
    }

    /// Zeroed output for a paused tick. Also resets the smoothing state so
    /// resuming does not decay from stale pre-pause values.
    #[allow(dead_code)]
    pub fn silence(&mut self) -> (IntensitySample, Vec<f32>) {
        for bin in &mut self.smoothed {
            *bin = 0.0;
        }
        (IntensitySample::default(), self.smoothed.clone())
    }
}
