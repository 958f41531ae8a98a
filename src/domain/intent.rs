//! Intent map: the single read surface game logic sees for player input.
//!
//! Every intent always has a value. Sources write through an `IntentWriter`
//! scoped to their origin; any source may set or clear any intent and the
//! last write wins immediately.

/// Logical player intents, independent of the control that produced them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Intent {
    Left,
    Right,
    Up,
    Down,
    Action,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Left,
        Intent::Right,
        Intent::Up,
        Intent::Down,
        Intent::Action,
    ];

    /// The four directional intents (everything except `Action`).
    pub const DIRECTIONS: [Intent; 4] = [Intent::Left, Intent::Right, Intent::Up, Intent::Down];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Intent::Left => "left",
            Intent::Right => "right",
            Intent::Up => "up",
            Intent::Down => "down",
            Intent::Action => "action",
        }
    }
}

/// Where an intent write came from. Used for tracing only; writes from
/// different sources are never merged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IntentSource {
    Keyboard,
    Touch,
    TabletBand,
    Gamepad,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntentMap {
    asserted: [bool; 5],
}

impl IntentMap {
    pub fn new() -> Self {
        IntentMap::default()
    }

    #[inline]
    pub fn get(&self, intent: Intent) -> bool {
        self.asserted[intent.index()]
    }

    /// -1.0 for left, 1.0 for right, 0.0 when neither or both are held.
    pub fn horizontal(&self) -> f32 {
        axis(self.get(Intent::Left), self.get(Intent::Right))
    }

    /// -1.0 for up, 1.0 for down (screen coordinates).
    pub fn vertical(&self) -> f32 {
        axis(self.get(Intent::Up), self.get(Intent::Down))
    }

    pub fn any(&self) -> bool {
        self.asserted.iter().any(|&b| b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Intent, bool)> + '_ {
        Intent::ALL.iter().map(move |&i| (i, self.get(i)))
    }

    /// Narrow write handle for one input source.
    pub fn writer(&mut self, source: IntentSource) -> IntentWriter<'_> {
        IntentWriter { map: self, source }
    }

    pub fn release_all(&mut self) {
        self.asserted = [false; 5];
    }

    fn write(&mut self, intent: Intent, value: bool) {
        self.asserted[intent.index()] = value;
    }
}

fn axis(neg: bool, pos: bool) -> f32 {
    match (neg, pos) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    }
}

pub struct IntentWriter<'a> {
    map: &'a mut IntentMap,
    source: IntentSource,
}

impl IntentWriter<'_> {
    pub fn press(&mut self, intent: Intent) {
        self.set(intent, true);
    }

    pub fn release(&mut self, intent: Intent) {
        self.set(intent, false);
    }

    pub fn set(&mut self, intent: Intent, value: bool) {
        if self.map.get(intent) != value {
            tracing::trace!(source = ?self.source, intent = intent.name(), value, "intent");
        }
        self.map.write(intent, value);
    }
}
