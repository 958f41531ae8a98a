//! Orbs: demo scroll-style game.
//!
//! Steer through a field wider and taller than the screen, pick up orbs and
//! keep clear of drifting mines. Action is a short dash. Touching a mine ends
//! the round with the current score.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::intent::{Intent, IntentMap};
use crate::game::Game;
use crate::sim::event::{GameEvent, Tone, Waveform};
use crate::ui::canvas::{Canvas, Rgb, ViewTransform};

const WORLD_W: f32 = 240.0;
const WORLD_H: f32 = 120.0;
const ORB_COUNT: usize = 10;
const MINE_COUNT: usize = 6;
const SPEED: f32 = 36.0;
const DASH_FACTOR: f32 = 2.5;
const MINE_SPEED: f32 = 14.0;
const ORB_POINTS: u32 = 10;
const PICKUP_RADIUS: f32 = 2.5;
const HIT_RADIUS: f32 = 2.0;
/// Mines never spawn this close to the start position.
const SAFE_RADIUS: f32 = 24.0;

const INSTRUCTIONS: &[&str] = &[
    "Collect the yellow orbs, avoid the red mines.",
    "Arrows / WASD or the on-screen pad to steer.",
    "SPACE, GO or DASH to dash. The field scrolls with you.",
];

const PICKUP: Tone = Tone::new(880.0, 60, Waveform::Square);
const CRASH: Tone = Tone::new(110.0, 320, Waveform::Sawtooth);

#[derive(Clone, Debug, PartialEq)]
struct Mine {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
}

#[derive(Clone, Debug, PartialEq)]
struct Field {
    player: (f32, f32),
    orbs: Vec<(f32, f32)>,
    mines: Vec<Mine>,
    score: u32,
    elapsed: f32,
    crashed: bool,
}

impl Field {
    fn spawn(rng: &mut StdRng) -> Self {
        let player = (WORLD_W / 2.0, WORLD_H / 2.0);
        let orbs = (0..ORB_COUNT).map(|_| random_point(rng)).collect();
        let mines = (0..MINE_COUNT)
            .map(|_| {
                let (x, y) = loop {
                    let p = random_point(rng);
                    if dist(p, player) > SAFE_RADIUS {
                        break p;
                    }
                };
                let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
                Mine { x, y, vx: angle.cos() * MINE_SPEED, vy: angle.sin() * MINE_SPEED }
            })
            .collect();
        Field { player, orbs, mines, score: 0, elapsed: 0.0, crashed: false }
    }
}

pub struct Orbs {
    seed: u64,
    rng: StdRng,
    field: Field,
}

impl Orbs {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let field = Field::spawn(&mut rng);
        Orbs { seed, rng, field }
    }
}

impl Game for Orbs {
    fn id(&self) -> &str {
        "orbs"
    }

    fn title(&self) -> &str {
        "ORBS"
    }

    fn instructions(&self) -> &[&str] {
        INSTRUCTIONS
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.field = Field::spawn(&mut self.rng);
    }

    fn update(&mut self, intents: &IntentMap, dt: f32) -> Vec<GameEvent> {
        let mut events = vec![];
        let f = &mut self.field;
        if f.crashed {
            return events;
        }
        f.elapsed += dt;

        let speed = if intents.get(Intent::Action) { SPEED * DASH_FACTOR } else { SPEED };
        f.player.0 = (f.player.0 + intents.horizontal() * speed * dt).clamp(0.0, WORLD_W - 1.0);
        f.player.1 = (f.player.1 + intents.vertical() * speed * dt).clamp(0.0, WORLD_H - 1.0);

        for m in &mut f.mines {
            m.x += m.vx * dt;
            m.y += m.vy * dt;
            if m.x < 0.0 || m.x > WORLD_W - 1.0 {
                m.vx = -m.vx;
                m.x = m.x.clamp(0.0, WORLD_W - 1.0);
            }
            if m.y < 0.0 || m.y > WORLD_H - 1.0 {
                m.vy = -m.vy;
                m.y = m.y.clamp(0.0, WORLD_H - 1.0);
            }
        }

        let player = f.player;
        for orb in &mut f.orbs {
            if dist(*orb, player) <= PICKUP_RADIUS {
                f.score += ORB_POINTS;
                *orb = random_point(&mut self.rng);
                events.push(GameEvent::Cue(PICKUP));
            }
        }

        if f.mines.iter().any(|m| dist((m.x, m.y), player) <= HIT_RADIUS) {
            f.crashed = true;
            events.push(GameEvent::Cue(CRASH));
            events.push(GameEvent::Finished { final_score: f.score });
        }
        events
    }

    fn score(&self) -> u32 {
        self.field.score
    }

    fn world_size(&self) -> (f32, f32) {
        (WORLD_W, WORLD_H)
    }

    fn camera_target(&self) -> Option<(f32, f32)> {
        Some(self.field.player)
    }

    fn draw(&self, canvas: &mut Canvas, view: ViewTransform) {
        let (bx, by) = view.apply(0.0, 0.0);
        canvas.stroke_rect(bx - 1.0, by - 1.0, WORLD_W + 2.0, WORLD_H + 2.0, Rgb(60, 60, 90));

        // Sparse grid so scrolling is visible.
        for gy in (0..WORLD_H as i32).step_by(12) {
            for gx in (0..WORLD_W as i32).step_by(12) {
                let (x, y) = view.apply(gx as f32, gy as f32);
                canvas.plot(x, y, Rgb(40, 40, 60));
            }
        }

        for &(ox, oy) in &self.field.orbs {
            let (x, y) = view.apply(ox, oy);
            canvas.fill_rect(x, y, 1.0, 1.0, Rgb(255, 220, 50));
        }
        for m in &self.field.mines {
            let (x, y) = view.apply(m.x, m.y);
            canvas.fill_rect(x - 0.5, y - 0.5, 2.0, 2.0, Rgb(255, 60, 60));
        }

        let (px, py) = view.apply(self.field.player.0, self.field.player.1);
        let color = if self.field.crashed { Rgb(120, 120, 120) } else { Rgb(80, 220, 255) };
        canvas.fill_rect(px - 0.5, py - 0.5, 2.0, 2.0, color);
    }
}

fn random_point(rng: &mut StdRng) -> (f32, f32) {
    (rng.gen_range(1.0..WORLD_W - 1.0), rng.gen_range(1.0..WORLD_H - 1.0))
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
