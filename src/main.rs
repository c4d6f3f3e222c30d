mod audio;
mod cli;
mod config;
mod particles;
mod playback;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use audio::analysis::{self, AnalysisParams, CancelToken};
use audio::features::FrameTable;
use cli::Cli;
use particles::{Bounds, ParticleEngine};
use playback::FrameSampler;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect vibra.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("vibra.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("vibra").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.fft_size == 512 {
                cli.fft_size = cfg.analysis.fft_size;
            }
            if cli.group_size == 4 {
                cli.group_size = cfg.analysis.group_size;
            }
            if cli.history == 60 {
                cli.history = cfg.analysis.history_capacity;
            }
            if !cli.clamp_floor {
                cli.clamp_floor = cfg.analysis.clamp_floor;
            }
            if cli.particles == 200 {
                cli.particles = cfg.particles.capacity;
            }
            if cli.width == 1920.0 {
                cli.width = cfg.particles.width;
            }
            if cli.height == 1080.0 {
                cli.height = cfg.particles.height;
            }
            if cli.fps == 60 {
                cli.fps = cfg.playback.fps;
            }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("vibra - beat intensity analyzer");
    log::info!("Input: {}", input.display());
    log::info!(
        "FFT: {} samples, group: {}, history: {} frames, particles: {}",
        cli.fft_size,
        cli.group_size,
        cli.history,
        cli.particles
    );

    // 1. Decode audio
    log::info!("Decoding audio...");
    let audio_data = audio::decode::decode_audio(input)?;

    // 2. Precompute the frame table
    log::info!("Analyzing audio...");
    let params = AnalysisParams {
        fft_size: cli.fft_size,
        group_size: cli.group_size,
        history_capacity: cli.history,
        clamp_floor: cli.clamp_floor,
    };

    let cancel = CancelToken::new();
    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames")
            .unwrap()
            .progress_chars("=>-"),
    );
    let table = analysis::precompute(&audio_data, &params, &cancel, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;
    pb.finish_and_clear();

    log::info!(
        "Precomputed {} frames (hop {} samples, {:.1}s)",
        table.frame_count(),
        table.hop_size,
        table.duration()
    );

    // 3. Export the table if requested
    if let Some(ref path) = cli.export {
        let json = serde_json::to_string(&table)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write frame table: {}", path.display()))?;
        log::info!("Frame table written to {}", path.display());
    }

    // 4. Simulated playback run
    if !cli.no_playback {
        run_playback(&table, &cli);
    }

    log::info!("Done");
    Ok(())
}

/// Step through the track at tick cadence, driving the interpolator and the
/// particle engine the way a render loop would.
fn run_playback(table: &FrameTable, cli: &Cli) {
    if table.is_empty() {
        log::warn!("Empty frame table; nothing to play back");
        return;
    }

    let fps = cli.fps.max(1);
    let total_ticks = (table.duration() * fps as f32).ceil() as u64;

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let bounds = Bounds {
        width: cli.width,
        height: cli.height,
    };
    let mut engine = ParticleEngine::new(bounds, cli.particles, rng);
    let mut sampler = FrameSampler::new();

    log::info!(
        "Simulating playback: {} ticks @ {} fps, {}x{} canvas",
        total_ticks,
        fps,
        cli.width,
        cli.height
    );

    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut peak = 0.0f32;
    let mut peak_amplitude = 0.0f32;
    let mut sum = 0.0f64;
    let mut sampled = 0u64;

    for tick in 0..total_ticks {
        let time = tick as f32 / fps as f32;
        let Some((intensity, amplitudes)) = sampler.sample(table, time) else {
            // End of track
            break;
        };

        engine.tick(intensity);

        peak = peak.max(intensity.current);
        peak_amplitude = peak_amplitude.max(peak_bin(&amplitudes));
        sum += intensity.current as f64;
        sampled += 1;
        pb.set_position(tick + 1);
    }

    pb.finish_with_message("Playback complete");

    if sampled > 0 {
        log::info!(
            "Peak intensity: {:.3}, mean: {:.3}, peak display bin: {:.1}, live particles: {}",
            peak,
            sum / sampled as f64,
            peak_amplitude,
            engine.len()
        );
    }
}

/// Loudest display bin of one tick's smoothed amplitude profile.
fn peak_bin(amplitudes: &[f32]) -> f32 {
    amplitudes.iter().copied().fold(0.0, f32::max)
}
