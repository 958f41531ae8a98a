//! Pixel canvas that games draw into.
//!
//! The backing resolution is `cols × rows·pixel_ratio`. With a ratio of 2 the
//! renderer packs two vertical pixels into one half-block cell, giving roughly
//! square pixels. The ratio is fixed for the session; the surface is only
//! recomputed when the terminal reports a resize.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Surface {
    pub cols: u16,
    pub rows: u16,
    pub pixel_ratio: u8,
}

impl Surface {
    pub fn new(cols: u16, rows: u16, pixel_ratio: u8) -> Self {
        Surface { cols, rows, pixel_ratio: pixel_ratio.clamp(1, 2) }
    }

    pub fn backing_width(&self) -> usize {
        self.cols as usize
    }

    pub fn backing_height(&self) -> usize {
        self.rows as usize * self.pixel_ratio as usize
    }
}

/// Translation from world coordinates to canvas pixels.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct ViewTransform {
    pub dx: f32,
    pub dy: f32,
}

impl ViewTransform {
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.dx, y + self.dy)
    }
}

pub struct Canvas {
    surface: Surface,
    pixels: Vec<Option<Rgb>>,
}

impl Canvas {
    pub fn new(surface: Surface) -> Self {
        let len = surface.backing_width() * surface.backing_height();
        Canvas { surface, pixels: vec![None; len] }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn resize(&mut self, surface: Surface) {
        if surface != self.surface {
            *self = Canvas::new(surface);
        }
    }

    pub fn width(&self) -> usize {
        self.surface.backing_width()
    }

    pub fn height(&self) -> usize {
        self.surface.backing_height()
    }

    pub fn clear(&mut self) {
        self.pixels.fill(None);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width() && y < self.height() {
            self.pixels[y * self.width() + x]
        } else {
            None
        }
    }

    /// Out-of-bounds writes are dropped.
    pub fn set(&mut self, x: i32, y: i32, color: Rgb) {
        if x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height() {
            let w = self.width();
            self.pixels[y as usize * w + x as usize] = Some(color);
        }
    }

    pub fn plot(&mut self, x: f32, y: f32, color: Rgb) {
        self.set(x.floor() as i32, y.floor() as i32, color);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;
        let x1 = (x + w).ceil() as i32;
        let y1 = (y + h).ceil() as i32;
        for py in y0.max(0)..y1.min(self.height() as i32) {
            for px in x0.max(0)..x1.min(self.width() as i32) {
                self.set(px, py, color);
            }
        }
    }

    /// One-pixel outline.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;
        let x1 = (x + w).ceil() as i32 - 1;
        let y1 = (y + h).ceil() as i32 - 1;
        for px in x0..=x1 {
            self.set(px, y0, color);
            self.set(px, y1, color);
        }
        for py in y0..=y1 {
            self.set(x0, py, color);
            self.set(x1, py, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb(255, 0, 0);

    #[test]
    fn backing_resolution_scales_rows_by_ratio() {
        let s = Surface::new(80, 23, 2);
        assert_eq!((s.backing_width(), s.backing_height()), (80, 46));
        assert_eq!(Surface::new(80, 23, 5).pixel_ratio, 2);
        assert_eq!(Surface::new(80, 23, 0).backing_height(), 23);
    }

    #[test]
    fn fill_rect_clips_to_canvas() {
        let mut c = Canvas::new(Surface::new(4, 2, 2));
        c.fill_rect(-2.0, 2.0, 4.0, 10.0, RED);
        assert_eq!(c.get(0, 2), Some(RED));
        assert_eq!(c.get(1, 3), Some(RED));
        assert_eq!(c.get(2, 2), None);
        assert_eq!(c.get(0, 1), None);
    }

    #[test]
    fn resize_only_rebuilds_on_change() {
        let mut c = Canvas::new(Surface::new(4, 2, 2));
        c.set(0, 0, RED);
        c.resize(Surface::new(4, 2, 2));
        assert_eq!(c.get(0, 0), Some(RED));
        c.resize(Surface::new(6, 2, 2));
        assert_eq!(c.width(), 6);
        assert_eq!(c.get(0, 0), None);
    }
}
