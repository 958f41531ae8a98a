//! Screen state machine: Instructions → Playing → GameOver → Playing ...
//!
//! Exactly one screen is active. The transition table below is the only
//! place screens change; an event that does not apply to the current
//! screen is ignored and leaves everything untouched.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Screen {
    #[default]
    Instructions,
    Playing,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScreenEvent {
    Continue,
    Terminate(u32),
    Restart,
}

impl Screen {
    /// Exhaustive transition table. `None` means the event is a no-op here.
    pub fn next(self, event: ScreenEvent) -> Option<Screen> {
        match (self, event) {
            (Screen::Instructions, ScreenEvent::Continue) => Some(Screen::Playing),
            (Screen::Playing, ScreenEvent::Terminate(_)) => Some(Screen::GameOver),
            (Screen::GameOver, ScreenEvent::Restart) => Some(Screen::Playing),
            (Screen::Instructions, ScreenEvent::Terminate(_) | ScreenEvent::Restart)
            | (Screen::Playing, ScreenEvent::Continue | ScreenEvent::Restart)
            | (Screen::GameOver, ScreenEvent::Continue | ScreenEvent::Terminate(_)) => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Screen::Instructions => "instructions",
            Screen::Playing => "playing",
            Screen::GameOver => "game-over",
        }
    }
}

/// Best-score storage as seen by the state machine.
pub trait BestScores {
    fn load_best(&mut self, game_id: &str) -> u32;
    fn save_best(&mut self, game_id: &str, value: u32);
}

/// What the game-over screen shows.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GameOverSummary {
    pub final_score: u32,
    pub best: u32,
    pub is_new_best: bool,
}

impl GameOverSummary {
    /// The stored best only moves when the new score strictly beats it.
    pub fn settle(final_score: u32, previous_best: u32) -> Self {
        let is_new_best = final_score > previous_best;
        GameOverSummary {
            final_score,
            best: previous_best.max(final_score),
            is_new_best,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    Ignored,
    Started,
    Ended(GameOverSummary),
    Restarted,
}

#[derive(Debug, Default)]
pub struct ScreenMachine {
    screen: Screen,
    summary: Option<GameOverSummary>,
}

impl ScreenMachine {
    pub fn new() -> Self {
        ScreenMachine::default()
    }

    #[inline]
    pub fn current(&self) -> Screen {
        self.screen
    }

    /// Result of the most recent `Terminate`, kept until the next restart.
    pub fn summary(&self) -> Option<GameOverSummary> {
        self.summary
    }

    pub fn transition<B: BestScores + ?Sized>(
        &mut self,
        event: ScreenEvent,
        game_id: &str,
        scores: &mut B,
    ) -> Transition {
        let next = match self.screen.next(event) {
            Some(next) => next,
            None => {
                tracing::debug!(screen = self.screen.label(), ?event, "transition ignored");
                return Transition::Ignored;
            }
        };

        let result = match event {
            ScreenEvent::Continue => Transition::Started,
            ScreenEvent::Terminate(final_score) => {
                let summary = GameOverSummary::settle(final_score, scores.load_best(game_id));
                if summary.is_new_best {
                    scores.save_best(game_id, final_score);
                }
                self.summary = Some(summary);
                Transition::Ended(summary)
            }
            ScreenEvent::Restart => {
                self.summary = None;
                Transition::Restarted
            }
        };

        tracing::info!(from = self.screen.label(), to = next.label(), "screen");
        self.screen = next;
        result
    }
}
