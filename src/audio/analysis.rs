//! Offline analysis pipeline: windowed FFT spectra feeding the intensity
//! normalizer and amplitude downsampler, one frame per hop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use thiserror::Error;

use super::decode::AudioData;
use super::energy;
use super::features::{FrameTable, IntensitySample, PrecomputedFrame};
use super::intensity::{Normalizer, DEFAULT_HISTORY_CAPACITY};

/// Byte-scale dB mapping range: -100 dB maps to 0, -30 dB to 255.
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// Progress callback cadence, in frames.
const PROGRESS_INTERVAL: usize = 50;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis cancelled")]
    Cancelled,
}

/// Cooperative cancellation flag shared between the analysis loop and the
/// caller. Switching tracks mid-analysis flips it; the loop checks it once
/// per frame and abandons partial work.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Analysis knobs. Defaults match the reference pipeline: 512-sample FFT
/// windows at half-overlap, 4-bin display groups, a 60-frame adaptation
/// window, and no lower clamp on the push/pull output.
#[derive(Clone, Copy, Debug)]
pub struct AnalysisParams {
    pub fft_size: usize,
    pub group_size: usize,
    pub history_capacity: usize,
    pub clamp_floor: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            fft_size: 512,
            group_size: 4,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            clamp_floor: false,
        }
    }
}

/// Precompute the intensity/amplitude frame sequence for a whole track.
///
/// Spectrum extraction of independent windows runs in parallel; the
/// normalization pass stays strictly sequential because each frame depends
/// on the rolling history and the previous intensity. `progress` is invoked
/// every [`PROGRESS_INTERVAL`] frames with (done, total).
pub fn precompute(
    audio: &AudioData,
    params: &AnalysisParams,
    cancel: &CancelToken,
    mut progress: impl FnMut(usize, usize),
) -> Result<FrameTable, AnalysisError> {
    let fft_size = params.fft_size.max(2);
    let hop = fft_size / 2;
    let frame_count = audio.samples.len() / hop;

    if frame_count == 0 {
        log::warn!("Track shorter than one analysis hop; frame table is empty");
        return Ok(FrameTable::empty(audio.sample_rate, hop));
    }

    log::debug!(
        "Analyzing {} frames (fft {}, hop {})",
        frame_count,
        fft_size,
        hop
    );

    let spectra = compute_spectra(&audio.samples, fft_size, frame_count, cancel);
    if cancel.is_cancelled() {
        log::info!("Analysis cancelled during spectrum extraction");
        return Err(AnalysisError::Cancelled);
    }

    let mut normalizer = Normalizer::new(params.history_capacity, params.clamp_floor);
    let mut frames = Vec::with_capacity(frame_count);

    for (i, spectrum) in spectra.iter().enumerate() {
        if cancel.is_cancelled() {
            log::info!("Analysis cancelled at frame {}/{}", i, frame_count);
            return Err(AnalysisError::Cancelled);
        }

        let eff = energy::effective_energy(spectrum);
        let intensity = normalizer.advance(eff);
        let amplitudes = energy::downsample(spectrum, params.group_size);
        frames.push(PrecomputedFrame {
            intensity,
            amplitudes,
        });

        if i % PROGRESS_INTERVAL == 0 {
            progress(i, frame_count);
        }
    }
    progress(frame_count, frame_count);

    Ok(FrameTable {
        frames,
        sample_rate: audio.sample_rate,
        hop_size: hop,
    })
}

/// Hann-windowed FFT magnitudes for every hop, in frame order, scaled to
/// the 0-255 byte range. Windows are independent, so this pass is parallel;
/// `collect` on the indexed range preserves ordering. Cancellation turns
/// the remaining windows into no-ops; the caller re-checks the flag before
/// trusting the output.
fn compute_spectra(
    samples: &[f32],
    fft_size: usize,
    frame_count: usize,
    cancel: &CancelToken,
) -> Vec<Vec<f32>> {
    let hop = fft_size / 2;
    let hann = hann_window(fft_size);

    (0..frame_count)
        .into_par_iter()
        .map(|frame_idx| {
            if cancel.is_cancelled() {
                return Vec::new();
            }
            let start = frame_idx * hop;
            let end = (start + fft_size).min(samples.len());

            // Zero-padded past the end of the buffer.
            let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); fft_size];
            for (i, &s) in samples[start..end].iter().enumerate() {
                buffer[i] = Complex::new(s * hann[i], 0.0);
            }

            // Per-thread FFT planner (rayon-safe)
            let mut planner = FftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(fft_size);
            fft.process(&mut buffer);

            buffer[..fft_size / 2]
                .iter()
                .map(|c| byte_magnitude(c.norm() / fft_size as f32))
                .collect()
        })
        .collect()
}

/// Map a linear magnitude onto the byte scale over [MIN_DB, MAX_DB].
fn byte_magnitude(magnitude: f32) -> f32 {
    let db = 20.0 * magnitude.max(1e-10).log10();
    ((db - MIN_DB) / (MAX_DB - MIN_DB) * 255.0).clamp(0.0, 255.0)
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Per-tick pipeline for a live, push-style spectrum supplier. Shares the
/// reduce/normalize/downsample steps with the offline path, carrying the
/// rolling state across ticks.
#[allow(dead_code)]
#[derive(Clone, Debug)]
pub struct LiveAnalyzer {
    normalizer: Normalizer,
    group_size: usize,
}

#[allow(dead_code)]
impl LiveAnalyzer {
    pub fn new(params: &AnalysisParams) -> Self {
        Self {
            normalizer: Normalizer::new(params.history_capacity, params.clamp_floor),
            group_size: params.group_size,
        }
    }

    /// Process one spectrum frame pushed by the capture source.
    pub fn process(&mut self, spectrum: &[f32]) -> (IntensitySample, Vec<f32>) {
        let eff = energy::effective_energy(spectrum);
        let intensity = self.normalizer.advance(eff);
        let amplitudes = energy::downsample(spectrum, self.group_size);
        (intensity, amplitudes)
    }

    pub fn reset(&mut self) {
        self.normalizer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_track(samples: usize, sample_rate: u32) -> AudioData {
        AudioData {
            samples: vec![0.0; samples],
            sample_rate,
            channels: 1,
        }
    }

    #[test]
    fn one_second_at_44100_yields_172_frames() {
        let audio = silent_track(44100, 44100);
        let table = precompute(
            &audio,
            &AnalysisParams::default(),
            &CancelToken::new(),
            |_, _| {},
        )
        .unwrap();
        assert_eq!(table.frame_count(), 172);
        assert_eq!(table.hop_size, 256);
    }

    #[test]
    fn silence_stays_at_zero_intensity() {
        let audio = silent_track(44100, 44100);
        let table = precompute(
            &audio,
            &AnalysisParams::default(),
            &CancelToken::new(),
            |_, _| {},
        )
        .unwrap();
        for frame in &table.frames {
            assert_eq!(frame.intensity.current, 0.0);
            assert!(frame.amplitudes.iter().all(|&a| a == 0.0));
        }
    }

    #[test]
    fn amplitude_profile_length_matches_group_size() {
        let audio = silent_track(4096, 44100);
        let params = AnalysisParams {
            group_size: 4,
            ..Default::default()
        };
        let table = precompute(&audio, &params, &CancelToken::new(), |_, _| {}).unwrap();
        // fft 512 -> 256 bins -> 64 display bins.
        assert_eq!(table.frames[0].amplitudes.len(), 64);
    }

    #[test]
    fn short_track_produces_empty_table() {
        let audio = silent_track(100, 44100);
        let table = precompute(
            &audio,
            &AnalysisParams::default(),
            &CancelToken::new(),
            |_, _| {},
        )
        .unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn cancellation_discards_partial_work() {
        let audio = silent_track(44100, 44100);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = precompute(&audio, &AnalysisParams::default(), &cancel, |_, _| {});
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn cancellation_mid_run_aborts_the_remaining_frames() {
        let audio = silent_track(44100, 44100);
        let cancel = CancelToken::new();
        let flag = cancel.clone();
        // Cancel from inside the progress callback once frames are flowing.
        let result = precompute(&audio, &AnalysisParams::default(), &cancel, |done, _| {
            if done >= 50 {
                flag.cancel();
            }
        });
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn progress_reports_completion() {
        let audio = silent_track(44100, 44100);
        let mut last = (0, 0);
        precompute(
            &audio,
            &AnalysisParams::default(),
            &CancelToken::new(),
            |done, total| last = (done, total),
        )
        .unwrap();
        assert_eq!(last, (172, 172));
    }

    #[test]
    fn tone_registers_nonzero_energy() {
        let sample_rate = 44100u32;
        let samples: Vec<f32> = (0..sample_rate)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        let audio = AudioData {
            samples,
            sample_rate,
            channels: 1,
        };
        let table = precompute(
            &audio,
            &AnalysisParams::default(),
            &CancelToken::new(),
            |_, _| {},
        )
        .unwrap();
        let peak = table
            .frames
            .iter()
            .map(|f| f.intensity.current)
            .fold(0.0f32, f32::max);
        assert!(peak > 0.0);
    }

    #[test]
    fn byte_magnitude_clamps_to_byte_range() {
        assert_eq!(byte_magnitude(0.0), 0.0);
        assert_eq!(byte_magnitude(1.0), 255.0);
        let mid = byte_magnitude(0.001); // -60 dB
        assert!(mid > 0.0 && mid < 255.0);
    }

    #[test]
    fn live_analyzer_mirrors_offline_steps() {
        let params = AnalysisParams::default();
        let mut live = LiveAnalyzer::new(&params);
        let frame = vec![51.0; 256];
        let (intensity, amplitudes) = live.process(&frame);
        // Uniform 51/255 = 0.2 energy, first frame passthrough, rising push.
        assert!((intensity.current - 0.2 * 1.075).abs() < 1e-6);
        assert_eq!(amplitudes.len(), 64);
        assert!(amplitudes.iter().all(|&a| (a - 51.0).abs() < 1e-6));
    }
}
