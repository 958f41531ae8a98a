//! Keyboard and pointer input from the terminal.
//!
//! `InputState` drains crossterm events once per frame and tracks which keys
//! are held. Key release is honoured when the terminal reports it (keyboard
//! enhancement); otherwise a key counts as released after `hold_timeout`
//! without a Press/Repeat event.
//!
//! `KeyboardBinding` turns held-key changes into intent writes. It only
//! writes on edges, so a touch button holding an intent is never overwritten
//! by an idle keyboard.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

use crate::domain::intent::{Intent, IntentSource};
use crate::game::Game;
use crate::sim::session::Session;
use crate::sim::store::KvStore;

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_ACTION: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Enter];
const KEYS_HUB: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('h'), KeyCode::Char('H')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

fn direction_keys(intent: Intent) -> &'static [KeyCode] {
    match intent {
        Intent::Left => KEYS_LEFT,
        Intent::Right => KEYS_RIGHT,
        Intent::Up => KEYS_UP,
        Intent::Down => KEYS_DOWN,
        Intent::Action => KEYS_ACTION,
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PointerKind {
    Down,
    Up,
}

/// Left-button mouse press/release, the terminal's stand-in for touch.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub col: u16,
    pub row: u16,
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    pointer: Vec<PointerEvent>,
    resized: Option<(u16, u16)>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,

    hold_timeout: Duration,
}

impl InputState {
    pub fn new(hold_timeout: Duration) -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            pointer: Vec::with_capacity(4),
            resized: None,
            honor_release: false,
            hold_timeout,
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call once per frame, before the simulation step.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.pointer.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.handle_key(key, Instant::now()),
                Ok(Event::Mouse(m)) => {
                    let kind = match m.kind {
                        MouseEventKind::Down(MouseButton::Left) => Some(PointerKind::Down),
                        MouseEventKind::Up(MouseButton::Left) => Some(PointerKind::Up),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        self.pointer.push(PointerEvent { kind, col: m.column, row: m.row });
                    }
                }
                Ok(Event::Resize(w, h)) => self.resized = Some((w, h)),
                _ => {}
            }
        }

        self.expire(Instant::now());
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {
                // Not trusted without enhancement; the timeout handles it.
            }
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Expire keys that have timed out (terminals without Release events).
    fn expire(&mut self, now: Instant) {
        if self.honor_release {
            return;
        }
        let timeout = self.hold_timeout;
        self.last_active.retain(|_, t| now.duration_since(*t) < timeout);
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.is_held_at(code, Instant::now())
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    pub fn quit_pressed(&self) -> bool {
        self.ctrl_c_pressed() || self.any_pressed(KEYS_QUIT)
    }

    pub fn hub_pressed(&self) -> bool {
        self.any_pressed(KEYS_HUB)
    }

    pub fn pointer_events(&self) -> &[PointerEvent] {
        &self.pointer
    }

    pub fn take_resize(&mut self) -> Option<(u16, u16)> {
        self.resized.take()
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        match self.last_active.get(&code) {
            Some(_) if self.honor_release => true,
            Some(t) => now.duration_since(*t) < self.hold_timeout,
            None => false,
        }
    }
}

/// Writes keyboard state into a session, edge-triggered.
#[derive(Default)]
pub struct KeyboardBinding {
    held: [bool; 4],
    action_held: bool,
}

impl KeyboardBinding {
    pub fn new() -> Self {
        KeyboardBinding::default()
    }

    pub fn bind<G: Game, S: KvStore>(&mut self, kb: &InputState, session: &mut Session<G, S>) {
        self.apply(
            |intent| kb.any_held(direction_keys(intent)),
            kb.any_pressed(KEYS_ACTION),
            kb.any_held(KEYS_ACTION),
            session,
        );
    }

    fn apply<G: Game, S: KvStore>(
        &mut self,
        held: impl Fn(Intent) -> bool,
        action_pressed: bool,
        action_held: bool,
        session: &mut Session<G, S>,
    ) {
        for (slot, intent) in Intent::DIRECTIONS.into_iter().enumerate() {
            let now_held = held(intent);
            if now_held != self.held[slot] {
                session.set_intent(IntentSource::Keyboard, intent, now_held);
                self.held[slot] = now_held;
            }
        }

        if action_pressed {
            session.press_action(IntentSource::Keyboard);
        } else if self.action_held && !action_held {
            session.release_action(IntentSource::Keyboard);
        }
        self.action_held = action_held || action_pressed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::screen::Screen;
    use crate::game::testing::StubGame;
    use crate::sim::session::SessionSettings;
    use crate::sim::store::MemoryStore;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    fn session() -> Session<StubGame, MemoryStore> {
        Session::new(StubGame::new(), MemoryStore::new(), SessionSettings::default(), 80.0, 40.0)
    }

    #[test]
    fn press_is_fresh_once() {
        let mut kb = InputState::new(Duration::from_millis(160));
        let t = Instant::now();
        kb.handle_key(key(KeyCode::Left, KeyEventKind::Press), t);
        assert!(kb.was_pressed(KeyCode::Left));
        kb.fresh_presses.clear();
        kb.handle_key(key(KeyCode::Left, KeyEventKind::Repeat), t + Duration::from_millis(30));
        assert!(!kb.was_pressed(KeyCode::Left));
        assert!(kb.is_held_at(KeyCode::Left, t + Duration::from_millis(60)));
    }

    #[test]
    fn timeout_releases_without_enhancement() {
        let mut kb = InputState::new(Duration::from_millis(160));
        let t = Instant::now();
        kb.handle_key(key(KeyCode::Up, KeyEventKind::Press), t);
        kb.handle_key(key(KeyCode::Up, KeyEventKind::Release), t);
        assert!(kb.is_held_at(KeyCode::Up, t + Duration::from_millis(100)));
        kb.expire(t + Duration::from_millis(200));
        assert!(!kb.is_held_at(KeyCode::Up, t + Duration::from_millis(200)));
    }

    #[test]
    fn release_event_honoured_with_enhancement() {
        let mut kb = InputState::new(Duration::from_millis(160));
        kb.honor_release = true;
        let t = Instant::now();
        kb.handle_key(key(KeyCode::Down, KeyEventKind::Press), t);
        assert!(kb.is_held_at(KeyCode::Down, t + Duration::from_secs(10)));
        kb.handle_key(key(KeyCode::Down, KeyEventKind::Release), t);
        assert!(!kb.is_held_at(KeyCode::Down, t));
    }

    #[test]
    fn binding_writes_only_on_edges() {
        let mut s = session();
        let mut b = KeyboardBinding::new();
        s.press_action(IntentSource::Touch);

        b.apply(|i| i == Intent::Left, false, false, &mut s);
        assert!(s.intents().get(Intent::Left));

        // A touch release wins; an unchanged keyboard does not reassert.
        s.set_intent(IntentSource::Touch, Intent::Left, false);
        b.apply(|i| i == Intent::Left, false, false, &mut s);
        assert!(!s.intents().get(Intent::Left));

        s.set_intent(IntentSource::Touch, Intent::Right, true);
        b.apply(|_| false, false, false, &mut s);
        assert!(s.intents().get(Intent::Right));
    }

    #[test]
    fn action_key_on_instructions_continues() {
        let mut s = session();
        let mut b = KeyboardBinding::new();
        b.apply(|_| false, true, true, &mut s);
        assert_eq!(s.screen(), Screen::Playing);
        assert!(!s.intents().get(Intent::Action));
        b.apply(|_| false, false, false, &mut s);
        assert!(!s.intents().get(Intent::Action));
    }

    #[test]
    fn held_action_across_start_is_not_forwarded() {
        let mut s = session();
        let mut b = KeyboardBinding::new();
        b.apply(|_| false, true, true, &mut s);
        b.apply(|_| false, false, true, &mut s);
        assert_eq!(s.screen(), Screen::Playing);
        assert!(!s.intents().get(Intent::Action));
        b.apply(|_| false, true, true, &mut s);
        assert!(s.intents().get(Intent::Action));
        b.apply(|_| false, false, false, &mut s);
        assert!(!s.intents().get(Intent::Action));
    }
}
