use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub particles: ParticlesConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    #[serde(default = "default_history")]
    pub history_capacity: usize,
    #[serde(default)]
    pub clamp_floor: bool,
}

#[derive(Debug, Deserialize)]
pub struct ParticlesConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_height")]
    pub height: f32,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            group_size: default_group_size(),
            history_capacity: default_history(),
            clamp_floor: false,
        }
    }
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
        }
    }
}

fn default_fft_size() -> usize {
    512
}
fn default_group_size() -> usize {
    4
}
fn default_history() -> usize {
    60
}
fn default_capacity() -> usize {
    200
}
fn default_width() -> f32 {
    1920.0
}
fn default_height() -> f32 {
    1080.0
}
fn default_fps() -> u32 {
    60
}

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.analysis.fft_size, 512);
        assert_eq!(cfg.analysis.group_size, 4);
        assert_eq!(cfg.analysis.history_capacity, 60);
        assert!(!cfg.analysis.clamp_floor);
        assert_eq!(cfg.particles.capacity, 200);
        assert_eq!(cfg.playback.fps, 60);
    }

    #[test]
    fn partial_sections_override_only_their_keys() {
        let cfg: Config = toml::from_str(
            "[analysis]\nfft_size = 1024\nclamp_floor = true\n\n[particles]\ncapacity = 400\n",
        )
        .unwrap();
        assert_eq!(cfg.analysis.fft_size, 1024);
        assert!(cfg.analysis.clamp_floor);
        assert_eq!(cfg.analysis.group_size, 4);
        assert_eq!(cfg.particles.capacity, 400);
        assert_eq!(cfg.particles.width, 1920.0);
    }
}
