/// RGBA8 drawing surface. The canvas is always opaque; translucent paint is
/// composited source-over onto what is already there.
#[derive(Debug, Clone)]
pub struct Canvas {
    w: usize,
    h: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        let mut c = Self {
            w,
            h,
            pixels: Vec::new(),
        };
        c.reset();
        c
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn size(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.w || y >= self.h {
            return None;
        }
        let i = (y * self.w + x) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Returns true if the size changed. Like a canvas element, a size change
    /// wipes the contents; an unchanged size keeps them.
    pub fn resize(&mut self, w: usize, h: usize) -> bool {
        if (w, h) == (self.w, self.h) {
            return false;
        }
        self.w = w;
        self.h = h;
        self.reset();
        true
    }

    fn reset(&mut self) {
        self.pixels.clear();
        self.pixels.resize(self.w.saturating_mul(self.h).saturating_mul(4), 0);
        for px in self.pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
    }

    pub fn fill(&mut self, rgb: (u8, u8, u8), alpha: f32) {
        let a = alpha.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        for px in self.pixels.chunks_exact_mut(4) {
            blend(px, rgb, a);
        }
    }

    /// Fills every pixel whose centre lies within `radius` of (`cx`, `cy`).
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, rgb: (u8, u8, u8), alpha: f32) {
        let a = alpha.clamp(0.0, 1.0);
        if a <= 0.0 || !(radius > 0.0) || self.w == 0 || self.h == 0 {
            return;
        }

        let r2 = radius * radius;
        let y0 = (cy - radius).floor().max(0.0) as usize;
        let y1 = ((cy + radius).ceil().max(0.0) as usize).min(self.h);
        let x0 = (cx - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil().max(0.0) as usize).min(self.w);

        for y in y0..y1 {
            let dy = y as f32 + 0.5 - cy;
            let dy2 = dy * dy;
            if dy2 > r2 {
                continue;
            }
            let row = y * self.w;
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                if dx * dx + dy2 <= r2 {
                    let i = (row + x) * 4;
                    blend(&mut self.pixels[i..i + 4], rgb, a);
                }
            }
        }
    }
}

#[inline]
fn blend(px: &mut [u8], rgb: (u8, u8, u8), a: f32) {
    if a >= 1.0 {
        px[0] = rgb.0;
        px[1] = rgb.1;
        px[2] = rgb.2;
        return;
    }
    let inv = 1.0 - a;
    px[0] = (rgb.0 as f32 * a + px[0] as f32 * inv).round() as u8;
    px[1] = (rgb.1 as f32 * a + px[1] as f32 * inv).round() as u8;
    px[2] = (rgb.2 as f32 * a + px[2] as f32 * inv).round() as u8;
}

/// CSS `hsl()` to sRGB. `h` in degrees (wrapped), `s` and `l` in 0..=1.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    let a = s * l.min(1.0 - l);
    let f = |n: f32| {
        let k = (n + h / 30.0) % 12.0;
        let v = l - a * (k - 3.0).min(9.0 - k).clamp(-1.0, 1.0);
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    (f(0.0), f(8.0), f(4.0))
}
