//! Viewport bands: which control surface a window width calls for.
//!
//!   Narrow  w <  tablet_min            touch-first, persistent buttons only
//!   Mid     tablet_min ≤ w ≤ tablet_max  tablet side buttons live
//!   Wide    w >  tablet_max            keyboard/mouse, tablet buttons inert

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ViewportBand {
    Narrow,
    Mid,
    Wide,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BandThresholds {
    pub tablet_min: u32,
    pub tablet_max: u32,
}

impl Default for BandThresholds {
    fn default() -> Self {
        BandThresholds { tablet_min: 720, tablet_max: 1285 }
    }
}

impl BandThresholds {
    /// Band for a window width in px. Derived on every layout pass.
    pub fn band(&self, width_px: u32) -> ViewportBand {
        if width_px < self.tablet_min {
            ViewportBand::Narrow
        } else if width_px <= self.tablet_max {
            ViewportBand::Mid
        } else {
            ViewportBand::Wide
        }
    }
}

impl ViewportBand {
    /// Tablet-band controls take pointer input only in the mid band.
    pub fn tablet_controls_active(self) -> bool {
        self == ViewportBand::Mid
    }
}

/// Terminal stand-in for window width: columns times the configured cell width.
pub fn width_px(columns: u16, cell_px: u32) -> u32 {
    columns as u32 * cell_px
}
