//! On-screen controls, operated with the mouse as a touch stand-in.
//!
//! Two tiers:
//!   - persistent: d-pad, GO (action) and DASH (pulse) along the bottom, plus
//!     the fixed HUB control. Always present and always live.
//!   - tablet band: large side buttons. Drawn and hit-testable only while the
//!     viewport band is Mid; otherwise they exist in the layout but are inert.
//!
//! Hold controls set their intent on press and clear it on release. Pulse
//! controls assert for the session's pulse duration and need no release.

use std::time::Duration;

use crate::domain::intent::{Intent, IntentSource};
use crate::domain::viewport::ViewportBand;
use crate::game::Game;
use crate::sim::session::Session;
use crate::sim::store::KvStore;
use crate::ui::input::{PointerEvent, PointerKind};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    pub fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.x && col < self.x + self.w && row >= self.y && row < self.y + self.h
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tier {
    Persistent,
    TabletBand,
}

impl Tier {
    fn source(self) -> IntentSource {
        match self {
            Tier::Persistent => IntentSource::Touch,
            Tier::TabletBand => IntentSource::TabletBand,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ControlKind {
    Hold(Intent),
    Pulse(Intent),
    /// Continue / act / restart depending on the screen.
    Action,
    Hub,
}

#[derive(Clone, Debug)]
pub struct Control {
    pub label: &'static str,
    pub rect: Rect,
    pub kind: ControlKind,
    pub tier: Tier,
}

/// What a pointer event on the controls asks the session to do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TouchAction {
    Press(IntentSource, Intent),
    Release(IntentSource, Intent),
    Pulse(IntentSource, Intent),
    ActionPress(IntentSource),
    ActionRelease(IntentSource),
    Hub,
}

/// Bottom-row controls, present at every width.
pub fn persistent_controls(cols: u16, rows: u16) -> Vec<Control> {
    let bottom = rows.saturating_sub(1);
    let above = rows.saturating_sub(2);
    let c = |label, x, y, w, kind| Control {
        label,
        rect: Rect { x, y, w, h: 1 },
        kind,
        tier: Tier::Persistent,
    };
    vec![
        c("[HUB]", 0, 0, 5, ControlKind::Hub),
        c("[▲]", 4, above, 3, ControlKind::Hold(Intent::Up)),
        c("[◀]", 0, bottom, 3, ControlKind::Hold(Intent::Left)),
        c("[▼]", 4, bottom, 3, ControlKind::Hold(Intent::Down)),
        c("[▶]", 8, bottom, 3, ControlKind::Hold(Intent::Right)),
        c("[DASH]", cols.saturating_sub(13), bottom, 6, ControlKind::Pulse(Intent::Action)),
        c("[ GO ]", cols.saturating_sub(6), bottom, 6, ControlKind::Action),
    ]
}

/// Side buttons for mid-width layouts.
pub fn tablet_band_controls(cols: u16, rows: u16) -> Vec<Control> {
    // Row 0 belongs to the HUD and the HUB control.
    let mid = (rows / 2).max(5);
    let right = cols.saturating_sub(5);
    let c = |label, x, y, kind| Control {
        label,
        rect: Rect { x, y, w: 5, h: 3 },
        kind,
        tier: Tier::TabletBand,
    };
    vec![
        c(" ▲▲ ", 0, mid.saturating_sub(4), ControlKind::Hold(Intent::Up)),
        c(" ◀◀ ", 0, mid.saturating_sub(1), ControlKind::Hold(Intent::Left)),
        c(" ▼▼ ", right, mid.saturating_sub(4), ControlKind::Hold(Intent::Down)),
        c(" ▶▶ ", right, mid.saturating_sub(1), ControlKind::Hold(Intent::Right)),
        c("JUMP", right, mid + 2, ControlKind::Pulse(Intent::Action)),
    ]
}

pub struct TouchControls {
    controls: Vec<Control>,
    band: ViewportBand,
    /// Control currently held down by the pointer.
    held: Option<usize>,
}

impl TouchControls {
    pub fn new(cols: u16, rows: u16, band: ViewportBand) -> Self {
        let mut controls = persistent_controls(cols, rows);
        controls.extend(tablet_band_controls(cols, rows));
        TouchControls { controls, band, held: None }
    }

    pub fn band(&self) -> ViewportBand {
        self.band
    }

    /// Rebuild for a new terminal size. A held control is released first so
    /// its intent never sticks.
    pub fn relayout(&mut self, cols: u16, rows: u16, band: ViewportBand) -> Option<TouchAction> {
        let release = self.pointer_up();
        if band != self.band {
            tracing::debug!(from = ?self.band, to = ?band, "viewport band");
        }
        *self = TouchControls::new(cols, rows, band);
        release
    }

    pub fn interactable(&self, control: &Control) -> bool {
        match control.tier {
            Tier::Persistent => true,
            Tier::TabletBand => self.band.tablet_controls_active(),
        }
    }

    /// Controls to draw. Inert controls are invisible.
    pub fn visible(&self) -> impl Iterator<Item = (&Control, bool)> + '_ {
        self.controls
            .iter()
            .enumerate()
            .filter(|(_, c)| self.interactable(c))
            .map(move |(i, c)| (c, self.held == Some(i)))
    }

    /// Turn one pointer event into session actions. A press while another
    /// control is still held releases that one first: the terminal can drop
    /// the Up of a drag that left the window.
    pub fn handle(&mut self, event: PointerEvent) -> Vec<TouchAction> {
        match event.kind {
            PointerKind::Down => {
                let stale = self.pointer_up();
                stale.into_iter().chain(self.pointer_down(event.col, event.row)).collect()
            }
            PointerKind::Up => self.pointer_up().into_iter().collect(),
        }
    }

    fn pointer_down(&mut self, col: u16, row: u16) -> Option<TouchAction> {
        // Later controls sit on top.
        let (idx, kind, tier) = self
            .controls
            .iter()
            .enumerate()
            .rev()
            .find(|(_, c)| self.interactable(c) && c.rect.contains(col, row))
            .map(|(i, c)| (i, c.kind, c.tier))?;
        let source = tier.source();
        let action = match kind {
            ControlKind::Hold(intent) => {
                self.held = Some(idx);
                TouchAction::Press(source, intent)
            }
            ControlKind::Action => {
                self.held = Some(idx);
                TouchAction::ActionPress(source)
            }
            ControlKind::Pulse(intent) => TouchAction::Pulse(source, intent),
            ControlKind::Hub => TouchAction::Hub,
        };
        Some(action)
    }

    /// Release whatever control the pointer went down on, wherever it went up.
    fn pointer_up(&mut self) -> Option<TouchAction> {
        let idx = self.held.take()?;
        let control = &self.controls[idx];
        let source = control.tier.source();
        match control.kind {
            ControlKind::Hold(intent) => Some(TouchAction::Release(source, intent)),
            ControlKind::Action => Some(TouchAction::ActionRelease(source)),
            ControlKind::Pulse(_) | ControlKind::Hub => None,
        }
    }
}

/// Feed a touch action into the session. Returns true when the hub was requested.
pub fn apply_touch<G: Game, S: KvStore>(
    session: &mut Session<G, S>,
    action: TouchAction,
    now: Duration,
) -> bool {
    match action {
        TouchAction::Press(source, intent) => session.set_intent(source, intent, true),
        TouchAction::Release(source, intent) => session.set_intent(source, intent, false),
        TouchAction::Pulse(source, intent) => session.pulse(source, intent, now),
        TouchAction::ActionPress(source) => session.press_action(source),
        TouchAction::ActionRelease(source) => session.release_action(source),
        TouchAction::Hub => return true,
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::screen::Screen;
    use crate::domain::viewport::BandThresholds;
    use crate::game::testing::StubGame;
    use crate::sim::session::SessionSettings;
    use crate::sim::store::MemoryStore;

    const COLS: u16 = 125;
    const ROWS: u16 = 30;

    fn controls_at(width_px: u32) -> TouchControls {
        TouchControls::new(COLS, ROWS, BandThresholds::default().band(width_px))
    }

    fn find(t: &TouchControls, kind: ControlKind, tier: Tier) -> Control {
        t.controls.iter().find(|c| c.kind == kind && c.tier == tier).cloned().unwrap()
    }

    fn session() -> Session<StubGame, MemoryStore> {
        Session::new(StubGame::new(), MemoryStore::new(), SessionSettings::default(), 80.0, 40.0)
    }

    #[test]
    fn tablet_left_press_and_release_at_1000px() {
        let mut t = controls_at(1000);
        let mut s = session();
        s.press_action(IntentSource::Keyboard);
        assert_eq!(s.screen(), Screen::Playing);

        let left = find(&t, ControlKind::Hold(Intent::Left), Tier::TabletBand);
        let down = t.pointer_down(left.rect.x + 1, left.rect.y + 1).unwrap();
        assert_eq!(down, TouchAction::Press(IntentSource::TabletBand, Intent::Left));
        apply_touch(&mut s, down, Duration::ZERO);
        assert!(s.intents().get(Intent::Left));

        let up = t.pointer_up().unwrap();
        apply_touch(&mut s, up, Duration::ZERO);
        assert!(!s.intents().get(Intent::Left));
    }

    #[test]
    fn tablet_controls_inert_outside_mid_band() {
        for w in [0, 500, 719, 1286, 1600, 4000] {
            let mut t = controls_at(w);
            let left = find(&t, ControlKind::Hold(Intent::Left), Tier::TabletBand);
            assert!(!t.interactable(&left), "width {w}");
            assert_eq!(t.pointer_down(left.rect.x + 1, left.rect.y + 1), None);
            assert!(t.visible().all(|(c, _)| c.tier == Tier::Persistent));
        }
        for w in [720, 1000, 1285] {
            let t = controls_at(w);
            assert!(t.visible().any(|(c, _)| c.tier == Tier::TabletBand), "width {w}");
        }
    }

    #[test]
    fn persistent_controls_live_at_every_width() {
        for w in [300, 1000, 2000] {
            let mut t = controls_at(w);
            let right = find(&t, ControlKind::Hold(Intent::Right), Tier::Persistent);
            assert_eq!(
                t.pointer_down(right.rect.x, right.rect.y),
                Some(TouchAction::Press(IntentSource::Touch, Intent::Right))
            );
        }
    }

    #[test]
    fn release_lands_even_off_the_button() {
        let mut t = controls_at(500);
        let up = find(&t, ControlKind::Hold(Intent::Up), Tier::Persistent);
        t.pointer_down(up.rect.x, up.rect.y);
        assert_eq!(t.pointer_up(), Some(TouchAction::Release(IntentSource::Touch, Intent::Up)));
        assert_eq!(t.pointer_up(), None);
    }

    #[test]
    fn press_without_release_lets_go_of_the_old_button() {
        let mut t = controls_at(500);
        let mut s = session();
        s.press_action(IntentSource::Keyboard);
        let left = find(&t, ControlKind::Hold(Intent::Left), Tier::Persistent);
        let right = find(&t, ControlKind::Hold(Intent::Right), Tier::Persistent);
        let down = |c: &Control| PointerEvent { kind: PointerKind::Down, col: c.rect.x, row: c.rect.y };

        for a in t.handle(down(&left)) {
            apply_touch(&mut s, a, Duration::ZERO);
        }
        // The Up for the left button never arrives.
        let actions = t.handle(down(&right));
        assert_eq!(
            actions,
            vec![
                TouchAction::Release(IntentSource::Touch, Intent::Left),
                TouchAction::Press(IntentSource::Touch, Intent::Right),
            ]
        );
        for a in actions {
            apply_touch(&mut s, a, Duration::ZERO);
        }
        assert!(!s.intents().get(Intent::Left));
        assert!(s.intents().get(Intent::Right));

        for a in t.handle(PointerEvent { kind: PointerKind::Up, col: 0, row: 0 }) {
            apply_touch(&mut s, a, Duration::ZERO);
        }
        for i in 0..100 {
            s.frame(Duration::from_millis(16 * i), 0.016);
        }
        assert!(!s.intents().any());
    }

    #[test]
    fn hub_reachable_on_short_mid_band_terminals() {
        for rows in [4, 6, 8, 9, 10] {
            let mut t = TouchControls::new(COLS, rows, ViewportBand::Mid);
            assert_eq!(t.pointer_down(1, 0), Some(TouchAction::Hub), "rows {rows}");
            assert!(t.controls.iter().filter(|c| c.tier == Tier::TabletBand).all(|c| c.rect.y >= 1));
        }
    }

    #[test]
    fn relayout_releases_held_control() {
        let mut t = controls_at(1000);
        let left = find(&t, ControlKind::Hold(Intent::Left), Tier::TabletBand);
        t.pointer_down(left.rect.x, left.rect.y);
        let release = t.relayout(COLS * 2, ROWS, ViewportBand::Wide);
        assert_eq!(release, Some(TouchAction::Release(IntentSource::TabletBand, Intent::Left)));
        assert_eq!(t.band(), ViewportBand::Wide);
    }

    #[test]
    fn go_button_follows_action_rules() {
        let mut t = controls_at(500);
        let mut s = session();
        let go = find(&t, ControlKind::Action, Tier::Persistent);

        let a = t.pointer_down(go.rect.x, go.rect.y).unwrap();
        apply_touch(&mut s, a, Duration::ZERO);
        assert_eq!(s.screen(), Screen::Playing);
        let a = t.pointer_up().unwrap();
        apply_touch(&mut s, a, Duration::ZERO);

        let a = t.pointer_down(go.rect.x, go.rect.y).unwrap();
        apply_touch(&mut s, a, Duration::ZERO);
        assert!(s.intents().get(Intent::Action));
        let a = t.pointer_up().unwrap();
        apply_touch(&mut s, a, Duration::ZERO);
        assert!(!s.intents().get(Intent::Action));
    }

    #[test]
    fn jump_pulse_clears_without_release() {
        let mut t = controls_at(1000);
        let mut s = session();
        s.press_action(IntentSource::Keyboard);
        let jump = find(&t, ControlKind::Pulse(Intent::Action), Tier::TabletBand);
        let a = t.pointer_down(jump.rect.x, jump.rect.y).unwrap();
        apply_touch(&mut s, a, Duration::from_millis(100));
        assert!(s.intents().get(Intent::Action));
        assert_eq!(t.pointer_up(), None);
        s.frame(Duration::from_millis(250), 0.016);
        assert!(!s.intents().get(Intent::Action));
    }

    #[test]
    fn hub_control_requests_navigation() {
        let mut t = controls_at(1000);
        let mut s = session();
        let a = t.pointer_down(1, 0).unwrap();
        assert_eq!(a, TouchAction::Hub);
        assert!(apply_touch(&mut s, a, Duration::ZERO));
    }
}
