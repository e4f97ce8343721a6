use crate::canvas::{Canvas, hsl_to_rgb};
use crate::error::VisualizerError;
use crate::spectrum::SpectralFrame;

pub const DEFAULT_DECAY_STEP: f32 = 0.05;
pub const DEFAULT_RADIUS_SCALE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Degrees, 0..360.
    pub hue: f32,
    pub opacity: f32,
    /// Ticks this particle has been drawn.
    pub age: u32,
}

impl Particle {
    pub fn rgb(&self) -> (u8, u8, u8) {
        hsl_to_rgb(self.hue, 1.0, 0.5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldConfig {
    /// Opacity subtracted from every particle per tick.
    pub decay_step: f32,
    /// Alpha of the black overlay painted before particles. 1 clears fully;
    /// lower values leave fading trails; 0 never erases.
    pub trail_alpha: f32,
    pub radius_scale: f32,
    /// Oldest particles are evicted past this count. `None` never evicts.
    pub max_particles: Option<usize>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            decay_step: DEFAULT_DECAY_STEP,
            trail_alpha: 1.0,
            radius_scale: DEFAULT_RADIUS_SCALE,
            max_particles: None,
        }
    }
}

impl FieldConfig {
    pub fn validate(&self) -> Result<(), VisualizerError> {
        if !(self.decay_step > 0.0 && self.decay_step <= 1.0) {
            return Err(VisualizerError::config(format!(
                "decay step must be within (0, 1], got {}",
                self.decay_step
            )));
        }
        if !(0.0..=1.0).contains(&self.trail_alpha) {
            return Err(VisualizerError::config(format!(
                "trail alpha must be within 0..=1, got {}",
                self.trail_alpha
            )));
        }
        if !(self.radius_scale >= 0.0 && self.radius_scale.is_finite()) {
            return Err(VisualizerError::config(format!(
                "radius scale must be a finite non-negative number, got {}",
                self.radius_scale
            )));
        }
        Ok(())
    }

    /// Ticks a fresh particle survives before removal: the smallest `k`
    /// with `k * decay_step >= 1`.
    pub fn lifetime_ticks(&self) -> u32 {
        let d = self.decay_step as f64;
        let mut k = (1.0 / d).ceil().min(u32::MAX as f64) as u32;
        while k > 1 && is_faded(k - 1, self.decay_step) {
            k -= 1;
        }
        while k < u32::MAX && !is_faded(k, self.decay_step) {
            k += 1;
        }
        k
    }
}

/// Opacity after `age` ticks.
fn opacity_at(age: u32, decay_step: f32) -> f32 {
    (1.0 - age as f64 * decay_step as f64).max(0.0) as f32
}

fn is_faded(age: u32, decay_step: f32) -> bool {
    age as f64 * decay_step as f64 >= 1.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub spawned: usize,
    pub evicted: usize,
    pub drawn: usize,
    pub removed: usize,
    pub live: usize,
}

pub struct ParticleField {
    cfg: FieldConfig,
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new(cfg: FieldConfig) -> Result<Self, VisualizerError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            particles: Vec::new(),
        })
    }

    pub fn config(&self) -> &FieldConfig {
        &self.cfg
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Appends one particle per bin, scattered uniformly over `size`.
    pub fn ingest(
        &mut self,
        frame: &SpectralFrame,
        size: (usize, usize),
        rng: &mut fastrand::Rng,
    ) -> usize {
        let n = frame.len();
        if n == 0 {
            return 0;
        }
        let (w, h) = (size.0 as f32, size.1 as f32);
        self.particles.reserve(n);
        for i in 0..n {
            let x = rng.f32() * w;
            let y = rng.f32() * h;
            self.particles.push(Particle {
                x,
                y,
                radius: frame.normalized(i) * self.cfg.radius_scale,
                hue: (i as f32 / n as f32) * 360.0,
                opacity: 1.0,
                age: 0,
            });
        }
        n
    }

    fn evict_overflow(&mut self) -> usize {
        let Some(cap) = self.cfg.max_particles else {
            return 0;
        };
        let excess = self.particles.len().saturating_sub(cap);
        if excess > 0 {
            self.particles.drain(..excess);
        }
        excess
    }

    fn paint_background(&self, canvas: &mut Canvas) {
        if self.cfg.trail_alpha > 0.0 {
            canvas.fill((0, 0, 0), self.cfg.trail_alpha);
        }
    }

    /// Draws every particle newest first, then fades and prunes.
    /// Returns (drawn, removed).
    pub fn paint_and_age(&mut self, canvas: &mut Canvas) -> (usize, usize) {
        let step = self.cfg.decay_step;
        let drawn = self.particles.len();
        for p in self.particles.iter_mut().rev() {
            canvas.fill_circle(p.x, p.y, p.radius, p.rgb(), p.opacity);
            p.age = p.age.saturating_add(1);
            p.opacity = opacity_at(p.age, step);
        }
        self.particles.retain(|p| !is_faded(p.age, step));
        (drawn, drawn - self.particles.len())
    }

    /// Ingest `frame`, repaint the background, then draw and age the field.
    pub fn tick(
        &mut self,
        frame: &SpectralFrame,
        canvas: &mut Canvas,
        rng: &mut fastrand::Rng,
    ) -> TickReport {
        let spawned = self.ingest(frame, canvas.size(), rng);
        let evicted = self.evict_overflow();
        self.paint_background(canvas);
        let (drawn, removed) = self.paint_and_age(canvas);
        TickReport {
            spawned,
            evicted,
            drawn,
            removed,
            live: self.particles.len(),
        }
    }
}
