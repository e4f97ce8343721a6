use crate::audio::AudioConfig;
use crate::error::VisualizerError;
use crate::field::{DEFAULT_RADIUS_SCALE, FieldConfig};
use crate::spectrum::{AnalyserConfig, DEFAULT_FFT_SIZE};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "voice-visualizer",
    version,
    about = "Speak or make sounds to see the visualization: microphone-driven circle bursts in the terminal"
)]
pub struct Config {
    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Base look; `--decay-step` and `--trail-alpha` override its values.
    #[arg(long, value_enum, default_value_t = Variant::Burst)]
    pub variant: Variant,

    #[arg(long)]
    pub decay_step: Option<f32>,

    #[arg(long)]
    pub trail_alpha: Option<f32>,

    #[arg(long, default_value_t = DEFAULT_RADIUS_SCALE)]
    pub radius_scale: f32,

    #[arg(long)]
    pub max_particles: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_FFT_SIZE)]
    pub fft_size: usize,

    #[arg(long, default_value_t = 0.8)]
    pub smoothing: f32,

    #[arg(long, default_value_t = -100.0, allow_hyphen_values = true)]
    pub min_db: f32,

    #[arg(long, default_value_t = -30.0, allow_hyphen_values = true)]
    pub max_db: f32,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub hud: bool,

    /// Write log records here. Without it, logging is muted while the
    /// visualizer owns the terminal.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    #[value(alias = "hires", alias = "dots")]
    Braille,
}

impl RendererMode {
    /// Canvas pixels per terminal cell (x, y).
    pub fn pixels_per_cell(self) -> (usize, usize) {
        match self {
            Self::Ascii => (1, 1),
            Self::HalfBlock => (1, 2),
            Self::Braille => (2, 4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Opaque clear every tick, slow fade.
    Burst,
    /// Translucent overlay leaving afterimages, fast fade.
    Trail,
}

impl Variant {
    pub fn decay_step(self) -> f32 {
        match self {
            Self::Burst => 0.05,
            Self::Trail => 0.1,
        }
    }

    pub fn trail_alpha(self) -> f32 {
        match self {
            Self::Burst => 1.0,
            Self::Trail => 0.1,
        }
    }
}

impl Config {
    pub fn field_config(&self) -> Result<FieldConfig, VisualizerError> {
        let cfg = FieldConfig {
            decay_step: self.decay_step.unwrap_or(self.variant.decay_step()),
            trail_alpha: self.trail_alpha.unwrap_or(self.variant.trail_alpha()),
            radius_scale: self.radius_scale,
            max_particles: self.max_particles,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn audio_config(&self) -> Result<AudioConfig, VisualizerError> {
        let analyser = AnalyserConfig {
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            min_db: self.min_db,
            max_db: self.max_db,
        };
        analyser.validate()?;
        Ok(AudioConfig {
            device: self.device.clone(),
            analyser,
        })
    }
}
