use serde::Serialize;

/// Velocity-aware beat intensity: the previous tick's value alongside the
/// newly computed one, both in 0.0-1.0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct IntensitySample {
    pub previous: f32,
    pub current: f32,
}

/// One precomputed analysis frame, ready for a renderer.
#[derive(Clone, Debug, Serialize)]
pub struct PrecomputedFrame {
    pub intensity: IntensitySample,
    /// Downsampled display bins on the 0-255 byte magnitude scale.
    pub amplitudes: Vec<f32>,
}

/// Precomputed intensity/amplitude sequence for an entire track, indexed by
/// playback position. Built once per loaded track, immutable afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct FrameTable {
    pub frames: Vec<PrecomputedFrame>,
    pub sample_rate: u32,
    /// Samples between consecutive analysis frames.
    pub hop_size: usize,
}

impl FrameTable {
    pub fn empty(sample_rate: u32, hop_size: usize) -> Self {
        Self {
            frames: Vec::new(),
            sample_rate,
            hop_size,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Track duration covered by the table, in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames.len() as f32 * self.hop_size as f32 / self.sample_rate as f32
    }
}
