use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vibra",
    about = "Beat-intensity analyzer and particle engine for audio visuals"
)]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: Option<PathBuf>,

    /// Config file path (defaults to vibra.toml or the platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Analysis FFT window size
    #[arg(long, default_value_t = 512)]
    pub fft_size: usize,

    /// Downsample block size for display bins
    #[arg(long, default_value_t = 4)]
    pub group_size: usize,

    /// Rolling normalization window length, in analysis frames
    #[arg(long, default_value_t = 60)]
    pub history: usize,

    /// Clamp intensity at zero after the push/pull step
    #[arg(long)]
    pub clamp_floor: bool,

    /// Particle population ceiling
    #[arg(long, default_value_t = 200)]
    pub particles: usize,

    /// Simulated canvas width in display units
    #[arg(long, default_value_t = 1920.0)]
    pub width: f32,

    /// Simulated canvas height in display units
    #[arg(long, default_value_t = 1080.0)]
    pub height: f32,

    /// Playback ticks per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// RNG seed for the particle engine (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the precomputed frame table as JSON
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Analyze and export only; skip the simulated playback run
    #[arg(long)]
    pub no_playback: bool,
}
