use crate::error::VisualizerError;
use crate::spectrum::{AnalyserConfig, ByteAnalyser, SampleWindow, SpectralFrame};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use log::{debug, error, info};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioConfig {
    /// Case-insensitive substring of the input device name; `None` picks the default.
    pub device: Option<String>,
    pub analyser: AnalyserConfig,
}

/// Anything that can hand the render loop a spectral frame on demand.
pub trait SpectralSource {
    fn bin_count(&self) -> usize;

    /// Latest published frame; `None` once the source is gone.
    fn sample(&mut self) -> Option<&SpectralFrame>;

    /// Release the pipeline. Safe to call more than once.
    fn dispose(&mut self);
}

/// Lock-free latest-frame slot shared between the analysis thread and the render loop.
pub struct AtomicSpectrum {
    seq: AtomicU64,
    published: AtomicBool,
    bins: Vec<AtomicU8>,
}

impl AtomicSpectrum {
    pub fn new(bin_count: usize) -> Self {
        Self {
            seq: AtomicU64::new(0),
            published: AtomicBool::new(false),
            bins: (0..bin_count).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn store(&self, bytes: &[u8]) {
        self.seq.fetch_add(1, Ordering::Release); // odd => write in progress
        for (dst, &src) in self.bins.iter().zip(bytes) {
            dst.store(src, Ordering::Relaxed);
        }
        self.seq.fetch_add(1, Ordering::Release); // even => stable
        self.published.store(true, Ordering::Release);
    }

    /// Copies the latest frame into `out`; returns false if nothing was published yet.
    pub fn load_into(&self, out: &mut Vec<u8>) -> bool {
        out.resize(self.bins.len(), 0);
        if !self.published.load(Ordering::Acquire) {
            out.fill(0);
            return false;
        }
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            for (dst, src) in out.iter_mut().zip(&self.bins) {
                *dst = src.load(Ordering::Relaxed);
            }
            let v2 = self.seq.load(Ordering::Acquire);
            if v1 == v2 {
                return true;
            }
        }
    }
}

pub fn list_input_devices() -> anyhow::Result<()> {
    use anyhow::Context;

    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

/// Microphone-backed spectral sampler: cpal capture, a ring buffer, and an
/// analysis thread publishing byte spectra.
pub struct SpectralSampler {
    stream: Option<cpal::Stream>,
    stop: Arc<AtomicBool>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    spectrum: Arc<AtomicSpectrum>,
    frame: SpectralFrame,
}

impl SpectralSampler {
    pub fn initialize(cfg: &AudioConfig) -> Result<Self, VisualizerError> {
        cfg.analyser.validate()?;

        let host = cpal::default_host();
        let device = select_mic_input_device(&host, cfg.device.as_deref())?;
        let supported = device
            .default_input_config()
            .map_err(VisualizerError::access)?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = (supported.channels() as usize).max(1);
        let config: cpal::StreamConfig = supported.clone().into();

        let rb_capacity = (sample_rate_hz as usize).saturating_mul(2).max(cfg.analyser.fft_size);
        let rb = HeapRb::<f32>::new(rb_capacity);
        let (mut prod, mut cons) = rb.split();

        let err_fn = |err: cpal::StreamError| error!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            ),
            fmt => {
                return Err(VisualizerError::Access(format!(
                    "unsupported sample format: {fmt:?}"
                )));
            }
        }
        .map_err(VisualizerError::access)?;

        stream.play().map_err(VisualizerError::access)?;

        let analyser = ByteAnalyser::new(cfg.analyser)?;
        let bin_count = analyser.bin_count();
        let spectrum = Arc::new(AtomicSpectrum::new(bin_count));
        let stop = Arc::new(AtomicBool::new(false));
        let spectrum_for_thread = Arc::clone(&spectrum);
        let stop_for_thread = Arc::clone(&stop);

        let analyzer_handle = thread::Builder::new()
            .name("spectral-analyser".into())
            .spawn(move || analyze_loop(&mut cons, analyser, &stop_for_thread, &spectrum_for_thread))
            .map_err(VisualizerError::access)?;

        info!(
            "microphone open: {} Hz, {} channel(s), {} bins",
            sample_rate_hz, channels, bin_count
        );

        Ok(Self {
            stream: Some(stream),
            stop,
            analyzer_handle: Some(analyzer_handle),
            spectrum,
            frame: SpectralFrame::silent(bin_count),
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.stream.is_none()
    }
}

impl SpectralSource for SpectralSampler {
    fn bin_count(&self) -> usize {
        self.spectrum.bin_count()
    }

    fn sample(&mut self) -> Option<&SpectralFrame> {
        if self.is_disposed() {
            return None;
        }
        self.spectrum.load_into(self.frame.bins_mut());
        Some(&self.frame)
    }

    fn dispose(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
            drop(stream);
            debug!("microphone stream released");
        }
    }
}

impl Drop for SpectralSampler {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn select_mic_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> Result<cpal::Device, VisualizerError> {
    let want = device_query.map(|s| s.to_lowercase());
    if let Some(want) = want.as_deref() {
        let devices = host
            .input_devices()
            .map_err(VisualizerError::access)?
            .collect::<Vec<_>>();
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(VisualizerError::Access(format!(
            "no input device matching: {want}"
        )));
    }

    host.default_input_device()
        .ok_or_else(|| VisualizerError::Access("no default input device found".into()))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    for frame in data.chunks(channels) {
        let mut acc = 0.0f32;
        for s in frame {
            acc += (*s).to_float_sample();
        }
        let _ = prod.try_push(acc / channels as f32);
    }
}

fn analyze_loop(
    cons: &mut ringbuf::HeapCons<f32>,
    mut analyser: ByteAnalyser,
    stop: &AtomicBool,
    spectrum: &AtomicSpectrum,
) {
    let n = analyser.fft_size();
    let hop = (n / 4).max(1);

    let mut window = SampleWindow::new(n);
    let mut ordered = Vec::with_capacity(n);
    let mut since_last = 0usize;

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            window.push(s);
            since_last += 1;
            if window.is_full() && since_last >= hop {
                since_last = 0;
                window.copy_ordered(&mut ordered);
                spectrum.store(analyser.process(&ordered));
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}
