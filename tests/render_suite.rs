use voice_visualizer::app::TerminalSurface;
use voice_visualizer::canvas::Canvas;
use voice_visualizer::config::RendererMode;
use voice_visualizer::field::{FieldConfig, TickReport};
use voice_visualizer::render::{
    AsciiRenderer, BrailleRenderer, Frame, HalfBlockRenderer, Renderer, draw_overlay_popup,
    draw_popup_screen, make_renderer,
};
use voice_visualizer::visualizer::Surface;

/// Build a solid-color RGBA pixel buffer.
fn solid_pixels(w: usize, h: usize, r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for px in buf.chunks_exact_mut(4) {
        px.copy_from_slice(&[r, g, b, 255]);
    }
    buf
}

fn make_frame<'a>(
    cols: u16,
    visual_rows: u16,
    pw: usize,
    ph: usize,
    pixels: &'a [u8],
    sync: bool,
) -> Frame<'a> {
    Frame {
        term_cols: cols,
        visual_rows,
        pixel_width: pw,
        pixel_height: ph,
        pixels_rgba: pixels,
        hud: "particles 12 | 60 fps",
        hud_rows: 1,
        sync_updates: sync,
    }
}

fn render_to_string(r: &mut dyn Renderer, frame: &Frame<'_>) -> String {
    let mut out = Vec::new();
    r.render(frame, &mut out).unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

// ── ASCII ──────────────────────────────────────────────────────────────────

#[test]
fn ascii_renders_solid_frame() {
    let pixels = solid_pixels(24, 5, 200, 200, 200);
    let frame = make_frame(24, 5, 24, 5, &pixels, false);
    let s = render_to_string(&mut AsciiRenderer::new(), &frame);
    assert!(s.contains("\x1b[H"), "missing home cursor");
    assert!(s.contains("\x1b[?7l"), "missing autowrap-off");
    assert!(s.contains("\x1b[?7h"), "missing autowrap-on");
    assert!(s.contains("38;2;200;200;200"), "missing FG color");
    assert!(s.contains("particles 12"), "HUD text missing");
    assert!(!s.contains("\x1b[?2026h"), "sync disabled");
}

#[test]
fn ascii_black_is_blank() {
    let pixels = solid_pixels(3, 1, 0, 0, 0);
    let frame = make_frame(3, 1, 3, 1, &pixels, false);
    let s = render_to_string(&mut AsciiRenderer::new(), &frame);
    assert!(s.contains("   \r\n"));
}

#[test]
fn ascii_skips_zero_size() {
    let pixels = solid_pixels(1, 1, 0, 0, 0);
    let frame = make_frame(0, 0, 0, 0, &pixels, false);
    let mut out = Vec::new();
    AsciiRenderer::new().render(&frame, &mut out).unwrap();
    assert!(out.is_empty(), "expected empty output for zero-size frame");
}

// ── Half-block ─────────────────────────────────────────────────────────────

#[test]
fn halfblock_renders_top_and_bottom_colors() {
    let (cols, rows) = (4u16, 2u16);
    let (pw, ph) = (4usize, 4usize);
    let mut pixels = solid_pixels(pw, ph, 0, 0, 255);
    // First pixel row red.
    for px in pixels[..pw * 4].chunks_exact_mut(4) {
        px.copy_from_slice(&[255, 0, 0, 255]);
    }
    let frame = make_frame(cols, rows, pw, ph, &pixels, true);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.contains("\x1b[?2026h"), "missing sync-begin");
    assert!(s.contains("\x1b[?2026l"), "missing sync-end");
    assert!(s.contains('\u{2580}'), "missing half-block char");
    assert!(s.contains("38;2;255;0;0"), "top row should be FG");
    assert!(s.contains("48;2;0;0;255"), "bottom row should be BG");
}

#[test]
fn halfblock_ignores_geometry_mismatch() {
    let pixels = solid_pixels(4, 4, 1, 2, 3);
    let frame = make_frame(4, 4, 4, 4, &pixels, false);
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(&frame, &mut out).unwrap();
    assert!(out.is_empty());
}

#[test]
fn halfblock_reports_short_buffer() {
    let pixels = vec![0u8; 8];
    let frame = make_frame(4, 2, 4, 4, &pixels, false);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.contains("pixel buffer too small"));
}

// ── Braille ────────────────────────────────────────────────────────────────

#[test]
fn braille_raises_bright_dots() {
    let (cols, rows) = (1u16, 1u16);
    let mut pixels = solid_pixels(2, 4, 0, 0, 0);
    // Left column bright: dots 1,2,3,7 => 0x01|0x02|0x04|0x40.
    for y in 0..4 {
        let i = (y * 2) * 4;
        pixels[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
    }
    let frame = make_frame(cols, rows, 2, 4, &pixels, false);
    let s = render_to_string(&mut BrailleRenderer::new(), &frame);
    assert!(s.contains('\u{2847}'), "expected left-column braille glyph: {s:?}");
    assert!(s.contains("38;2;255;255;255"));
    assert!(s.contains("48;2;0;0;0"));
}

#[test]
fn braille_flat_cell_is_space() {
    let pixels = solid_pixels(2, 4, 90, 90, 90);
    let frame = make_frame(1, 1, 2, 4, &pixels, false);
    let s = render_to_string(&mut BrailleRenderer::new(), &frame);
    assert!(!s.chars().any(|c| ('\u{2801}'..='\u{28ff}').contains(&c)));
    assert!(s.contains("48;2;90;90;90"));
}

// ── Overlay / factory ──────────────────────────────────────────────────────

#[test]
fn overlay_popup_draws_box_and_title() {
    let mut out = Vec::new();
    draw_overlay_popup(&mut out, 60, 12, "Voice Visualizer\nspeak now").unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("Voice Visualizer"));
    assert!(s.contains("speak now"));
    assert!(s.contains("+--"));
}

#[test]
fn popup_screen_clears_then_draws_inside_sync() {
    let mut out = Vec::new();
    draw_popup_screen(&mut out, 60, 12, "Microphone unavailable\npress any key", true).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.starts_with("\x1b[?2026h"));
    assert!(s.ends_with("\x1b[?2026l"));
    let clear = s.find("\x1b[2J").expect("screen clear");
    let title = s.find("Microphone unavailable").expect("title");
    assert!(clear < title);
}

#[test]
fn frames_carry_only_the_hud_text() {
    let pixels = solid_pixels(24, 2, 10, 10, 10);
    let frame = make_frame(24, 2, 24, 2, &pixels, false);
    let s = render_to_string(&mut AsciiRenderer::new(), &frame);
    assert!(!s.contains("+--"), "no popup box inside a frame");
}

#[test]
fn overlay_popup_skips_tiny_terminals() {
    let mut out = Vec::new();
    draw_overlay_popup(&mut out, 5, 3, "hidden").unwrap();
    assert!(out.is_empty());
}

#[test]
fn renderer_names_match_modes() {
    assert_eq!(make_renderer(RendererMode::Ascii).name(), "ascii");
    assert_eq!(make_renderer(RendererMode::HalfBlock).name(), "halfblock");
    assert_eq!(make_renderer(RendererMode::Braille).name(), "braille");
}

// ── Terminal surface ───────────────────────────────────────────────────────

#[test]
fn terminal_surface_maps_cells_to_pixels() {
    let s = TerminalSurface::new(RendererMode::Braille, Vec::new()).with_fixed_size(20, 11);
    assert_eq!(s.size(), Some((40, 40)));

    let s = TerminalSurface::new(RendererMode::HalfBlock, Vec::new())
        .with_fixed_size(20, 11)
        .with_hud(false);
    assert_eq!(s.size(), Some((20, 22)));
}

#[test]
fn terminal_surface_too_small_is_unmounted() {
    let s = TerminalSurface::new(RendererMode::HalfBlock, Vec::new()).with_fixed_size(3, 10);
    assert_eq!(s.size(), None);
    let s = TerminalSurface::new(RendererMode::HalfBlock, Vec::new()).with_fixed_size(10, 2);
    assert_eq!(s.size(), None);
}

#[test]
fn terminal_surface_presents_frame_with_hud() {
    let mut s = TerminalSurface::new(RendererMode::HalfBlock, Vec::new())
        .with_fixed_size(80, 5)
        .with_hud_config(&FieldConfig::default());
    let (w, h) = s.size().unwrap();
    let canvas = Canvas::new(w, h);
    let report = TickReport {
        spawned: 1024,
        live: 3000,
        ..TickReport::default()
    };
    s.present(&canvas, &report).unwrap();

    let out = String::from_utf8(s.into_inner()).unwrap();
    assert!(out.contains('\u{2580}'));
    assert!(out.contains("particles 3000"));
    assert!(out.contains("decay 0.05"));
}
