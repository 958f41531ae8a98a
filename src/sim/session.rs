//! Session: one game, one run of the runtime.
//!
//! Ties the screen machine, the intent map, the score book, the optional
//! camera and the pulse timers together. Input bindings call the `press_*` /
//! `set_intent` methods; the frame loop calls `frame` then `draw`.
//!
//! Everything happens on one thread: input handlers and frames never overlap,
//! so a pulse clear can only land between frames. A clear that arrives after
//! a restart writes `false`, which is always a safe value.

use std::time::Duration;

use crate::domain::camera::Camera;
use crate::domain::intent::{Intent, IntentMap, IntentSource};
use crate::domain::screen::{GameOverSummary, Screen, ScreenEvent, ScreenMachine, Transition};
use crate::game::Game;
use crate::sim::deferred::DeferredQueue;
use crate::sim::event::{GameEvent, RuntimeEvent};
use crate::sim::store::{KvStore, ScoreBook};
use crate::ui::canvas::{Canvas, ViewTransform};

#[derive(Clone, Copy, Debug)]
pub struct SessionSettings {
    /// How long a pulse control keeps its intent asserted.
    pub pulse: Duration,
    /// Camera convergence rate in 1/s.
    pub camera_rate: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings { pulse: Duration::from_millis(150), camera_rate: 6.0 }
    }
}

pub struct Session<G: Game, S: KvStore> {
    game: G,
    screen: ScreenMachine,
    intents: IntentMap,
    scores: ScoreBook<S>,
    camera: Option<Camera>,
    pulses: DeferredQueue<(IntentSource, Intent)>,
    settings: SessionSettings,
    view: (f32, f32),
    best: u32,
    outbox: Vec<RuntimeEvent>,
}

impl<G: Game, S: KvStore> Session<G, S> {
    pub fn new(game: G, store: S, settings: SessionSettings, view_w: f32, view_h: f32) -> Self {
        let mut scores = ScoreBook::new(store);
        let best = scores.load_best(game.id());
        let camera = game.camera_target().map(|(tx, ty)| {
            let (ww, wh) = game.world_size();
            let mut cam = Camera::new(view_w, view_h, ww, wh, settings.camera_rate);
            cam.snap_to(tx, ty);
            cam
        });
        tracing::info!(game = game.id(), best, scrolling = camera.is_some(), "session start");

        Session {
            game,
            screen: ScreenMachine::new(),
            intents: IntentMap::new(),
            scores,
            camera,
            pulses: DeferredQueue::new(),
            settings,
            view: (view_w, view_h),
            best,
            outbox: vec![],
        }
    }

    // ── Queries ──

    pub fn screen(&self) -> Screen {
        self.screen.current()
    }

    pub fn intents(&self) -> &IntentMap {
        &self.intents
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn summary(&self) -> Option<GameOverSummary> {
        self.screen.summary()
    }

    /// Best score as of the last Terminate (or session start).
    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn scores_degraded(&self) -> bool {
        self.scores.is_degraded()
    }

    #[cfg(test)]
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    // ── Input ──

    /// Directional (or raw) intent write from one source.
    pub fn set_intent(&mut self, source: IntentSource, intent: Intent, value: bool) {
        if intent == Intent::Action && value {
            self.press_action(source);
        } else {
            self.intents.writer(source).set(intent, value);
        }
    }

    /// The one "press action" behaviour shared by every source and button:
    /// continue on Instructions, act while Playing, restart on GameOver.
    pub fn press_action(&mut self, source: IntentSource) {
        match self.screen.current() {
            Screen::Instructions => {
                self.apply(ScreenEvent::Continue);
            }
            Screen::Playing => self.intents.writer(source).press(Intent::Action),
            Screen::GameOver => {
                self.apply(ScreenEvent::Restart);
            }
        }
    }

    pub fn release_action(&mut self, source: IntentSource) {
        self.intents.writer(source).release(Intent::Action);
    }

    /// Assert `intent` for the pulse duration. No release is needed; pressing
    /// again before it expires restarts the window.
    pub fn pulse(&mut self, source: IntentSource, intent: Intent, now: Duration) {
        if intent == Intent::Action && self.screen.current() != Screen::Playing {
            self.press_action(source);
            return;
        }
        self.pulses.cancel_where(|&(_, i)| i == intent);
        self.intents.writer(source).press(intent);
        self.pulses.schedule(now, self.settings.pulse, (source, intent));
    }

    // ── Frame ──

    pub fn frame(&mut self, now: Duration, dt: f32) {
        for (source, intent) in self.pulses.drain_due(now) {
            self.intents.writer(source).release(intent);
        }

        if self.screen.current() == Screen::Playing {
            for event in self.game.update(&self.intents, dt) {
                match event {
                    GameEvent::Cue(tone) => self.outbox.push(RuntimeEvent::Cue(tone)),
                    GameEvent::Finished { final_score } => {
                        self.apply(ScreenEvent::Terminate(final_score));
                    }
                }
            }
        }

        if let (Some(cam), Some((tx, ty))) = (self.camera.as_mut(), self.game.camera_target()) {
            cam.update(tx, ty, dt);
        }
    }

    pub fn resize(&mut self, view_w: f32, view_h: f32) {
        self.view = (view_w, view_h);
        if let Some(cam) = self.camera.as_mut() {
            cam.resize(view_w, view_h);
        }
    }

    /// Camera translation, or a centred fixed view when the game has no camera.
    pub fn view_transform(&self) -> ViewTransform {
        match &self.camera {
            Some(cam) => {
                let (dx, dy) = cam.transform();
                ViewTransform { dx, dy }
            }
            None => {
                let (ww, wh) = self.game.world_size();
                ViewTransform {
                    dx: ((self.view.0 - ww) / 2.0).floor(),
                    dy: ((self.view.1 - wh) / 2.0).floor(),
                }
            }
        }
    }

    /// Read-only pass over game state.
    pub fn draw(&self, canvas: &mut Canvas) {
        self.game.draw(canvas, self.view_transform());
    }

    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Release timers and intents on the way out.
    pub fn teardown(&mut self) {
        self.pulses.cancel_all();
        self.intents.release_all();
        tracing::info!(game = self.game.id(), best = self.best, "session end");
    }

    // ── Internal ──

    fn apply(&mut self, event: ScreenEvent) -> Transition {
        let id = self.game.id().to_string();
        let t = self.screen.transition(event, &id, &mut self.scores);
        match t {
            Transition::Ignored => {}
            Transition::Started => self.outbox.push(RuntimeEvent::Started),
            Transition::Ended(summary) => {
                self.best = summary.best;
                self.pulses.cancel_all();
                self.intents.release_all();
                tracing::info!(
                    score = summary.final_score,
                    best = summary.best,
                    new_best = summary.is_new_best,
                    "game over"
                );
                self.outbox.push(RuntimeEvent::GameOver(summary));
            }
            Transition::Restarted => {
                self.game.reset();
                for (source, intent) in self.pulses.cancel_all() {
                    self.intents.writer(source).release(intent);
                }
                if let (Some(cam), Some((tx, ty))) = (self.camera.as_mut(), self.game.camera_target()) {
                    cam.snap_to(tx, ty);
                }
                self.outbox.push(RuntimeEvent::Restarted);
            }
        }
        t
    }
}
