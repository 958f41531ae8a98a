//! Smoothed follow camera for scroll-style games.
//!
//! `(x, y)` is the world coordinate of the top-left of the view. Each update
//! moves it a time-scaled fraction of the way toward the clamped target, so
//! the result is the same at 30 Hz or 144 Hz.

#[derive(Clone, Debug)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub view_w: f32,
    pub view_h: f32,
    world_w: f32,
    world_h: f32,
    /// Convergence rate in 1/s. Larger follows tighter.
    rate: f32,
}

impl Camera {
    pub fn new(view_w: f32, view_h: f32, world_w: f32, world_h: f32, rate: f32) -> Self {
        Camera { x: 0.0, y: 0.0, view_w, view_h, world_w, world_h, rate: rate.max(0.0) }
    }

    pub fn resize(&mut self, view_w: f32, view_h: f32) {
        self.view_w = view_w;
        self.view_h = view_h;
        self.x = clamp_axis(self.x, self.view_w, self.world_w);
        self.y = clamp_axis(self.y, self.view_h, self.world_h);
    }

    /// Offset that centres the target without showing past the world edges.
    pub fn desired(&self, target_x: f32, target_y: f32) -> (f32, f32) {
        (
            clamp_axis(target_x - self.view_w / 2.0, self.view_w, self.world_w),
            clamp_axis(target_y - self.view_h / 2.0, self.view_h, self.world_h),
        )
    }

    pub fn update(&mut self, target_x: f32, target_y: f32, dt: f32) {
        let (dx, dy) = self.desired(target_x, target_y);
        let alpha = 1.0 - (-self.rate * dt.max(0.0)).exp();
        self.x += (dx - self.x) * alpha;
        self.y += (dy - self.y) * alpha;
        self.x = clamp_axis(self.x, self.view_w, self.world_w);
        self.y = clamp_axis(self.y, self.view_h, self.world_h);
    }

    /// Jump straight to the target (level start, restart).
    pub fn snap_to(&mut self, target_x: f32, target_y: f32) {
        let (x, y) = self.desired(target_x, target_y);
        self.x = x;
        self.y = y;
    }

    /// Translation to apply to the scrolling layer.
    pub fn transform(&self) -> (f32, f32) {
        (-self.x, -self.y)
    }
}

/// Worlds narrower than the view are centred (negative offset); otherwise the
/// offset stays within `[0, world - view]`.
fn clamp_axis(offset: f32, view: f32, world: f32) -> f32 {
    if world <= view {
        -(view - world) / 2.0
    } else {
        offset.clamp(0.0, world - view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam() -> Camera {
        Camera::new(100.0, 50.0, 400.0, 200.0, 8.0)
    }

    #[test]
    fn snap_centres_target() {
        let mut c = cam();
        c.snap_to(200.0, 100.0);
        assert_eq!((c.x, c.y), (150.0, 75.0));
        assert_eq!(c.transform(), (-150.0, -75.0));
    }

    #[test]
    fn never_scrolls_past_edges() {
        let mut c = cam();
        c.snap_to(-50.0, -50.0);
        assert_eq!((c.x, c.y), (0.0, 0.0));
        c.snap_to(10_000.0, 10_000.0);
        assert_eq!((c.x, c.y), (300.0, 150.0));
        for _ in 0..200 {
            c.update(-1000.0, 5000.0, 0.05);
            assert!(c.x >= 0.0 && c.x <= 300.0);
            assert!(c.y >= 0.0 && c.y <= 150.0);
        }
    }

    #[test]
    fn update_lags_then_converges() {
        let mut c = cam();
        c.update(200.0, 100.0, 1.0 / 60.0);
        assert!(c.x > 0.0 && c.x < 150.0, "lagged, got {}", c.x);
        for _ in 0..600 {
            c.update(200.0, 100.0, 1.0 / 60.0);
        }
        assert!((c.x - 150.0).abs() < 0.01);
    }

    #[test]
    fn smoothing_is_frame_rate_independent() {
        let mut slow = cam();
        let mut fast = cam();
        for _ in 0..30 {
            slow.update(250.0, 120.0, 1.0 / 30.0);
        }
        for _ in 0..144 {
            fast.update(250.0, 120.0, 1.0 / 144.0);
        }
        assert!((slow.x - fast.x).abs() < 0.01, "{} vs {}", slow.x, fast.x);
        assert!((slow.y - fast.y).abs() < 0.01);
    }

    #[test]
    fn small_world_is_centred() {
        let mut c = Camera::new(100.0, 50.0, 60.0, 50.0, 8.0);
        c.snap_to(30.0, 25.0);
        assert_eq!(c.x, -20.0);
        assert_eq!(c.y, 0.0);
    }
}
