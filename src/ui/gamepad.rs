//! Gamepad input tracker using gilrs.
//!
//! Button mapping is loaded from config.toml via `load_button_config()`.
//! Default mapping:
//!   D-pad / Left Stick    →  Directions
//!   A / Start             →  Action (continue / act / restart)
//!   B / X                 →  Dash (pulse)
//!   Select                →  Hub

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use std::time::Duration;

use crate::config::GamepadConfig;
use crate::domain::intent::{Intent, IntentSource};
use crate::game::Game;
use crate::sim::session::Session;
use crate::sim::store::KvStore;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,      // South
    B,      // East
    X,      // West
    Y,      // North
    L1,     // LeftTrigger
    R1,     // RightTrigger
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER" => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    action: Vec<Btn>,
    dash: Vec<Btn>,
    hub: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            action: vec![Btn::A, Btn::Start],
            dash: vec![Btn::B, Btn::X],
            hub: vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],

    // Directions: D-pad and stick, indexed like Intent::DIRECTIONS
    dpad: [bool; 4],
    stick: [bool; 4],
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_x: f32,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                tracing::debug!(error = %e, "gamepad support unavailable");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [false; 4],
            stick: [false; 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Empty or unknown lists keep the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        let action = parse_list(&cfg.action);
        if !action.is_empty() {
            map.action = action;
        }
        let dash = parse_list(&cfg.dash);
        if !dash.is_empty() {
            map.dash = dash;
        }
        let hub = parse_list(&cfg.hub);
        if !hub.is_empty() {
            map.hub = hub;
        }
    }

    pub fn update(&mut self) {
        for b in &mut self.buttons {
            b.just_pressed = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    tracing::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    tracing::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        // Left, Right, Up, Down
        self.stick = [
            self.stick_x < -STICK_DEADZONE,
            self.stick_x > STICK_DEADZONE,
            self.stick_y > STICK_DEADZONE,
            self.stick_y < -STICK_DEADZONE,
        ];
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dpad_slot = match gilrs_btn {
            Button::DPadLeft => Some(0),
            Button::DPadRight => Some(1),
            Button::DPadUp => Some(2),
            Button::DPadDown => Some(3),
            _ => None,
        };
        if let Some(slot) = dpad_slot {
            self.dpad[slot] = held;
            return;
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            let b = &mut self.buttons[btn_index(btn)];
            b.held = held;
            if held {
                b.just_pressed = true;
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad = [false; 4];
        self.stick = [false; 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].held)
    }

    pub fn direction_held(&self, slot: usize) -> bool {
        self.dpad[slot] || self.stick[slot]
    }

    pub fn action_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.action)
    }

    pub fn action_held(&self) -> bool {
        self.any_held(&self.action_map.action)
    }

    pub fn dash_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.dash)
    }

    pub fn hub_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.hub)
    }
}

/// Writes gamepad state into a session, edge-triggered like the keyboard.
#[derive(Default)]
pub struct GamepadBinding {
    held: [bool; 4],
    action_held: bool,
}

impl GamepadBinding {
    pub fn new() -> Self {
        GamepadBinding::default()
    }

    pub fn bind<G: Game, S: KvStore>(&mut self, gp: &GamepadState, session: &mut Session<G, S>, now: Duration) {
        for (slot, intent) in Intent::DIRECTIONS.into_iter().enumerate() {
            let held = gp.direction_held(slot);
            if held != self.held[slot] {
                session.set_intent(IntentSource::Gamepad, intent, held);
                self.held[slot] = held;
            }
        }

        let action_held = gp.action_held();
        if gp.action_pressed() {
            session.press_action(IntentSource::Gamepad);
        } else if self.action_held && !action_held {
            session.release_action(IntentSource::Gamepad);
        }
        self.action_held = action_held;

        if gp.dash_pressed() {
            session.pulse(IntentSource::Gamepad, Intent::Action, now);
        }
    }
}
