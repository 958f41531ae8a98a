//! Game collaborator interface.
//!
//! The runtime owns screens, input, timing and persistence; a `Game` only
//! owns its own mutable state. `draw` takes `&self`, so drawing can never
//! change simulation state.

pub mod orbs;

use crate::domain::intent::IntentMap;
use crate::sim::event::GameEvent;
use crate::ui::canvas::{Canvas, ViewTransform};

pub trait Game {
    /// Stable identifier; also the persistence namespace.
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn instructions(&self) -> &[&str];

    /// Put every piece of mutable state back to its initial value.
    fn reset(&mut self);

    /// Advance by `dt` seconds. Only called while the Playing screen is active.
    fn update(&mut self, intents: &IntentMap, dt: f32) -> Vec<GameEvent>;

    fn score(&self) -> u32;

    /// World extent in canvas pixels.
    fn world_size(&self) -> (f32, f32);

    /// Entity the camera tracks. `None` for fixed-viewport games.
    fn camera_target(&self) -> Option<(f32, f32)>;

    fn draw(&self, canvas: &mut Canvas, view: ViewTransform);
}
