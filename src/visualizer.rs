use crate::audio::SpectralSource;
use crate::canvas::Canvas;
use crate::error::VisualizerError;
use crate::field::{FieldConfig, ParticleField, TickReport};
use crate::scheduler::{FrameScheduler, TickHandle};
use log::{debug, error, info};

pub const ACCESS_ALERT: &str =
    "Could not access microphone. Please ensure you've granted permission.";

/// User-facing, blocking notification.
pub trait Notifier {
    fn alert(&mut self, message: &str);
}

/// Where finished frames go. `size` is `None` while the surface is not mounted.
pub trait Surface {
    fn size(&self) -> Option<(usize, usize)>;
    fn present(&mut self, canvas: &Canvas, report: &TickReport) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizerState {
    Idle,
    /// Waiting on the microphone grant.
    Requesting,
    Running,
    Stopped,
    /// Access was refused; only a manual retry leaves this state.
    Failed,
}

pub struct Visualizer<K: FrameScheduler> {
    state: VisualizerState,
    field: ParticleField,
    canvas: Canvas,
    rng: fastrand::Rng,
    scheduler: K,
    sampler: Option<Box<dyn SpectralSource>>,
    pending: Option<TickHandle>,
    ticks: u64,
}

impl<K: FrameScheduler> Visualizer<K> {
    pub fn new(cfg: FieldConfig, scheduler: K, seed: Option<u64>) -> Result<Self, VisualizerError> {
        let rng = match seed {
            Some(s) => fastrand::Rng::with_seed(s),
            None => fastrand::Rng::new(),
        };
        Ok(Self {
            state: VisualizerState::Idle,
            field: ParticleField::new(cfg)?,
            canvas: Canvas::new(0, 0),
            rng,
            scheduler,
            sampler: None,
            pending: None,
            ticks: 0,
        })
    }

    pub fn state(&self) -> VisualizerState {
        self.state
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn scheduler(&self) -> &K {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut K {
        &mut self.scheduler
    }

    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    pub fn has_sampler(&self) -> bool {
        self.sampler.is_some()
    }

    /// Ticks that reached the surface.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Acquires the sampler and enters the tick loop. On failure the user is
    /// alerted once and nothing is kept. Returns whether the loop is running.
    pub fn start<F>(&mut self, acquire: F, notifier: &mut dyn Notifier) -> bool
    where
        F: FnOnce() -> Result<Box<dyn SpectralSource>, VisualizerError>,
    {
        if !matches!(self.state, VisualizerState::Idle | VisualizerState::Failed) {
            debug!("start ignored in state {:?}", self.state);
            return false;
        }

        self.state = VisualizerState::Requesting;
        match acquire() {
            Ok(sampler) => {
                info!("sampler ready ({} bins)", sampler.bin_count());
                self.sampler = Some(sampler);
                self.state = VisualizerState::Running;
                self.pending = Some(self.scheduler.request_tick());
                true
            }
            Err(err) => {
                error!("error accessing microphone: {err}");
                notifier.alert(ACCESS_ALERT);
                self.state = VisualizerState::Failed;
                false
            }
        }
    }

    /// Runs one tick for `handle`. Stale handles and ticks outside `Running`
    /// are ignored. While running, the next tick is always requested.
    pub fn on_tick(
        &mut self,
        handle: TickHandle,
        surface: &mut dyn Surface,
    ) -> anyhow::Result<Option<TickReport>> {
        if self.pending != Some(handle) {
            debug!("stale tick {}", handle.id());
            return Ok(None);
        }
        self.pending = None;
        if self.state != VisualizerState::Running {
            return Ok(None);
        }

        let report = self.render_tick(surface);
        self.pending = Some(self.scheduler.request_tick());
        report
    }

    fn render_tick(&mut self, surface: &mut dyn Surface) -> anyhow::Result<Option<TickReport>> {
        let Some((w, h)) = surface.size() else {
            return Ok(None);
        };
        if w == 0 || h == 0 {
            return Ok(None);
        }
        let Some(sampler) = self.sampler.as_mut() else {
            return Ok(None);
        };
        let Some(frame) = sampler.sample() else {
            return Ok(None);
        };

        if self.canvas.resize(w, h) {
            debug!("canvas resized to {w}x{h}");
        }
        let report = self.field.tick(frame, &mut self.canvas, &mut self.rng);
        surface.present(&self.canvas, &report)?;
        self.ticks += 1;
        Ok(Some(report))
    }

    /// Cancels the pending tick and releases the sampler. Valid in any state.
    pub fn dispose(&mut self) {
        if let Some(h) = self.pending.take() {
            self.scheduler.cancel(h);
        }
        if let Some(mut sampler) = self.sampler.take() {
            sampler.dispose();
        }
        self.field.clear();
        if self.state != VisualizerState::Stopped {
            info!("visualizer stopped after {} ticks", self.ticks);
            self.state = VisualizerState::Stopped;
        }
    }
}

impl<K: FrameScheduler> Drop for Visualizer<K> {
    fn drop(&mut self) {
        self.dispose();
    }
}
