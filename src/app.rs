use crate::audio::{SpectralSampler, SpectralSource};
use crate::canvas::Canvas;
use crate::config::{Config, RendererMode};
use crate::field::{FieldConfig, TickReport};
use crate::render::{Frame, Renderer, draw_popup_screen, make_renderer};
use crate::scheduler::{FrameScheduler, PacedScheduler};
use crate::terminal::{LogPause, TerminalGuard};
use crate::visualizer::{Notifier, Surface, Visualizer};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::info;
use std::io::{BufWriter, Write};
use std::time::{Duration, Instant};

const START_TEXT: &str = "Voice Visualizer\n\
Speak or make sounds to see the visualization\n\
\n\
enter or space  start microphone\n\
q or esc  quit";

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let field_cfg = cfg.field_config().context("field options")?;
    let audio_cfg = cfg.audio_config().context("analyser options")?;

    // Dropped after the guard: logging resumes once the screen is restored.
    let _quiet = cfg.log_file.is_none().then(LogPause::new);
    let _term = TerminalGuard::new()?;
    let out = BufWriter::new(TerminalGuard::stdout());
    let mut surface = TerminalSurface::new(cfg.renderer, out)
        .with_sync_updates(cfg.sync_updates)
        .with_hud(cfg.hud)
        .with_hud_config(&field_cfg);

    let mut vis = Visualizer::new(field_cfg, PacedScheduler::new(cfg.fps), cfg.seed)?;

    loop {
        if prompt(&mut surface, START_TEXT, PromptKind::Start)? == PromptOutcome::Quit {
            return Ok(());
        }

        let mut notifier = PopupNotifier::default();
        let started = vis.start(
            || {
                SpectralSampler::initialize(&audio_cfg)
                    .map(|s| Box::new(s) as Box<dyn SpectralSource>)
            },
            &mut notifier,
        );
        if started {
            break;
        }

        for message in notifier.take() {
            let text = format!("Microphone unavailable\n{message}\n\npress any key");
            if prompt(&mut surface, &text, PromptKind::Alert)? == PromptOutcome::Quit {
                return Ok(());
            }
        }
    }

    info!("render loop started ({} renderer)", surface.renderer_name());
    while let Some(handle) = vis.scheduler_mut().next_due() {
        if quit_requested()? {
            break;
        }
        vis.on_tick(handle, &mut surface)?;
    }
    vis.dispose();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Start,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptOutcome {
    Continue,
    Quit,
}

/// Blocks on a full-screen popup until the user answers it.
fn prompt<W: Write>(
    surface: &mut TerminalSurface<W>,
    text: &str,
    kind: PromptKind,
) -> anyhow::Result<PromptOutcome> {
    surface.show_popup(text)?;
    loop {
        match event::read().context("read terminal event")? {
            Event::Key(k) if k.kind != KeyEventKind::Release => {
                if is_quit_key(&k) && (kind == PromptKind::Start || is_ctrl_c(&k)) {
                    return Ok(PromptOutcome::Quit);
                }
                match kind {
                    PromptKind::Alert => return Ok(PromptOutcome::Continue),
                    PromptKind::Start => {
                        if matches!(k.code, KeyCode::Enter | KeyCode::Char(' ')) {
                            return Ok(PromptOutcome::Continue);
                        }
                    }
                }
            }
            Event::Resize(..) => surface.show_popup(text)?,
            _ => {}
        }
    }
}

fn quit_requested() -> anyhow::Result<bool> {
    while event::poll(Duration::from_millis(0))? {
        if let Event::Key(k) = event::read()? {
            if k.kind != KeyEventKind::Release && is_quit_key(&k) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c'))
}

pub(crate) fn is_quit_key(k: &KeyEvent) -> bool {
    is_ctrl_c(k) || matches!(k.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q'))
}

/// Collects alerts so the front end can show them as blocking popups.
#[derive(Debug, Default)]
pub struct PopupNotifier {
    messages: Vec<String>,
}

impl PopupNotifier {
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

impl Notifier for PopupNotifier {
    fn alert(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// Terminal-backed drawing surface: size follows the terminal, frames are
/// painted through the selected cell renderer with an optional HUD row.
pub struct TerminalSurface<W: Write> {
    renderer: Box<dyn Renderer>,
    px_per_cell: (usize, usize),
    out: W,
    sync_updates: bool,
    show_hud: bool,
    hud_config: String,
    fixed_size: Option<(u16, u16)>,
    fps: FpsCounter,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(mode: RendererMode, out: W) -> Self {
        Self {
            renderer: make_renderer(mode),
            px_per_cell: mode.pixels_per_cell(),
            out,
            sync_updates: true,
            show_hud: true,
            hud_config: String::new(),
            fixed_size: None,
            fps: FpsCounter::new(),
        }
    }

    pub fn with_sync_updates(mut self, on: bool) -> Self {
        self.sync_updates = on;
        self
    }

    pub fn with_hud(mut self, on: bool) -> Self {
        self.show_hud = on;
        self
    }

    pub fn with_hud_config(mut self, cfg: &FieldConfig) -> Self {
        self.hud_config = format!("decay {:.2} | trail {:.2}", cfg.decay_step, cfg.trail_alpha);
        self
    }

    /// Pins the terminal size instead of querying it.
    pub fn with_fixed_size(mut self, cols: u16, rows: u16) -> Self {
        self.fixed_size = Some((cols, rows));
        self
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn term_size(&self) -> Option<(u16, u16)> {
        self.fixed_size
            .or_else(|| crossterm::terminal::size().ok())
    }

    fn hud_rows(&self) -> u16 {
        if self.show_hud { 1 } else { 0 }
    }

    pub fn show_popup(&mut self, text: &str) -> anyhow::Result<()> {
        let (cols, rows) = self.term_size().unwrap_or((80, 24));
        draw_popup_screen(&mut self.out, cols, rows, text, self.sync_updates)
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn size(&self) -> Option<(usize, usize)> {
        let (cols, rows) = self.term_size()?;
        let hud_rows = self.hud_rows();
        if cols < 4 || rows < 2 + hud_rows {
            return None;
        }
        let visual_rows = rows - hud_rows;
        Some((
            cols as usize * self.px_per_cell.0,
            visual_rows as usize * self.px_per_cell.1,
        ))
    }

    fn present(&mut self, canvas: &Canvas, report: &TickReport) -> anyhow::Result<()> {
        let (px_w, px_h) = self.px_per_cell;
        let cols = (canvas.width() / px_w).min(u16::MAX as usize) as u16;
        let visual_rows = (canvas.height() / px_h).min(u16::MAX as usize) as u16;
        let hud_rows = self.hud_rows();

        self.fps.tick();
        let hud = if self.show_hud {
            format!(
                "particles {} | +{} -{} | {:.0} fps | {} | {}",
                report.live,
                report.spawned,
                report.removed + report.evicted,
                self.fps.fps(),
                self.hud_config,
                self.renderer.name(),
            )
        } else {
            String::new()
        };

        let frame = Frame {
            term_cols: cols,
            visual_rows,
            pixel_width: canvas.width(),
            pixel_height: canvas.height(),
            pixels_rgba: canvas.pixels(),
            hud: &hud,
            hud_rows,
            sync_updates: self.sync_updates,
        };
        self.renderer.render(&frame, &mut self.out)
    }
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
