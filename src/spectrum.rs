use crate::error::VisualizerError;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32768;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    /// Weight of the previous magnitude in the running average (0..=1).
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyserConfig {
    pub fn validate(&self) -> Result<(), VisualizerError> {
        if !self.fft_size.is_power_of_two()
            || self.fft_size < MIN_FFT_SIZE
            || self.fft_size > MAX_FFT_SIZE
        {
            return Err(VisualizerError::config(format!(
                "fft size must be a power of two in {MIN_FFT_SIZE}..={MAX_FFT_SIZE}, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(VisualizerError::config(format!(
                "smoothing must be within 0..=1, got {}",
                self.smoothing
            )));
        }
        if !self.min_db.is_finite() || !self.max_db.is_finite() {
            return Err(VisualizerError::config(format!(
                "dB bounds must be finite, got {}..{}",
                self.min_db, self.max_db
            )));
        }
        if !(self.min_db < self.max_db) {
            return Err(VisualizerError::config(format!(
                "min dB ({}) must be below max dB ({})",
                self.min_db, self.max_db
            )));
        }
        Ok(())
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// One snapshot of per-bin magnitudes, each in 0..=255.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpectralFrame {
    bins: Vec<u8>,
}

impl SpectralFrame {
    pub fn new(bins: Vec<u8>) -> Self {
        Self { bins }
    }

    pub fn silent(bin_count: usize) -> Self {
        Self {
            bins: vec![0; bin_count],
        }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn normalized(&self, bin: usize) -> f32 {
        self.bins.get(bin).map_or(0.0, |&m| m as f32 / 255.0)
    }

    pub(crate) fn bins_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bins
    }
}

impl From<Vec<u8>> for SpectralFrame {
    fn from(bins: Vec<u8>) -> Self {
        Self::new(bins)
    }
}

/// Fixed-length circular history of mono samples.
pub struct SampleWindow {
    buf: Vec<f32>,
    write_pos: usize,
    filled: usize,
}

impl SampleWindow {
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            write_pos: 0,
            filled: 0,
        }
    }

    pub fn push(&mut self, sample: f32) {
        let n = self.buf.len();
        self.buf[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % n;
        if self.filled < n {
            self.filled += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.buf.len()
    }

    /// Oldest to newest. Slots never written read as silence.
    pub fn copy_ordered(&self, out: &mut Vec<f32>) {
        let n = self.buf.len();
        out.clear();
        out.extend((0..n).map(|i| self.buf[(self.write_pos + i) % n]));
    }
}

/// Byte-scaled magnitude spectrum: Blackman window, FFT, temporal smoothing,
/// then a linear dB range mapped onto 0..=255.
pub struct ByteAnalyser {
    cfg: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_buf: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl ByteAnalyser {
    pub fn new(cfg: AnalyserConfig) -> Result<Self, VisualizerError> {
        cfg.validate()?;
        let n = cfg.fft_size;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        Ok(Self {
            cfg,
            fft,
            window: blackman(n),
            fft_buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            smoothed: vec![0.0; n / 2],
            bytes: vec![0; n / 2],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.cfg.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.bytes.fill(0);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Analyse the trailing `fft_size` samples (chronological order). Shorter
    /// input is zero-padded at the front.
    pub fn process(&mut self, samples: &[f32]) -> &[u8] {
        let n = self.fft_buf.len();
        let tail = &samples[samples.len().saturating_sub(n)..];
        let pad = n - tail.len();

        for (i, c) in self.fft_buf.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { tail[i - pad] };
            c.re = s * self.window[i];
            c.im = 0.0;
        }
        self.fft.process(&mut self.fft_buf);

        let tau = self.cfg.smoothing;
        let range = self.cfg.max_db - self.cfg.min_db;
        let inv_n = 1.0 / n as f32;
        for (k, c) in self.fft_buf.iter().take(n / 2).enumerate() {
            let mag = c.norm() * inv_n;
            let mut s = tau * self.smoothed[k] + (1.0 - tau) * mag;
            if !s.is_finite() {
                s = 0.0;
            }
            self.smoothed[k] = s;

            let db = if s > 0.0 {
                20.0 * s.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (db - self.cfg.min_db) / range;
            self.bytes[k] = scaled.clamp(0.0, 255.0) as u8;
        }
        &self.bytes
    }
}

fn blackman(n: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}
