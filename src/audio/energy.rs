//! Spectrum-frame reductions: dominant-band energy and display downsampling.

/// Fraction of bins assigned to the low band, then the mid band; whatever
/// remains is the high band.
const LOW_SPLIT: f32 = 0.5;
const MID_SPLIT: f32 = 0.3;

fn band_mean(bins: &[f32]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().sum::<f32>() / bins.len() as f32
}

/// Collapse a spectrum frame into a single effective-energy scalar in 0.0-1.0.
///
/// The frame splits into low (first 50% of bins), mid (next 30%) and high
/// (the rest); the dominant band's mean magnitude is normalized against the
/// byte magnitude range. An empty frame yields 0.
pub fn effective_energy(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }

    let low_count = (frame.len() as f32 * LOW_SPLIT).floor() as usize;
    let mid_count = (frame.len() as f32 * MID_SPLIT).floor() as usize;
    let mid_end = (low_count + mid_count).min(frame.len());

    let low = band_mean(&frame[..low_count]);
    let mid = band_mean(&frame[low_count..mid_end]);
    let high = band_mean(&frame[mid_end..]);

    low.max(mid).max(high) / 255.0
}

/// Block-average a spectrum frame down to `ceil(len / group_size)` display
/// bins. The last group may be partial; its mean uses only the bins present.
pub fn downsample(frame: &[f32], group_size: usize) -> Vec<f32> {
    let group_size = group_size.max(1);
    frame
        .chunks(group_size)
        .map(|group| group.iter().sum::<f32>() / group.len() as f32)
        .collect()
}
