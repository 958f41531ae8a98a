/// Entry point and frame loop.

mod config;
mod domain;
mod game;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use config::{LogConfig, RuntimeConfig};
use domain::viewport::{width_px, ViewportBand};
use game::orbs::Orbs;
use game::Game;
use sim::event::{RuntimeEvent, Tone, Waveform};
use sim::frame_loop::{FrameLoop, SystemClock};
use sim::session::Session;
use sim::store::{FileStore, KvStore};
use ui::gamepad::{GamepadBinding, GamepadState};
use ui::input::{InputState, KeyboardBinding};
use ui::nav::{go_to_hub, Exit};
use ui::renderer::Renderer;
use ui::sound::ToneEmitter;
use ui::touch::{apply_touch, TouchControls};

const START_TONE: Tone = Tone::new(660.0, 80, Waveform::Square);
const NEW_BEST_TONE: Tone = Tone::new(990.0, 300, Waveform::Triangle);
const GAME_OVER_TONE: Tone = Tone::new(220.0, 250, Waveform::Triangle);

fn main() {
    let (config, warnings) = RuntimeConfig::load();

    if let Err(e) = init_logging(&config.log) {
        eprintln!("Logging disabled: {e:#}");
    }
    for w in &warnings {
        tracing::warn!("{w}");
    }

    let seed = config.seed.unwrap_or_else(rand::random);
    let store = FileStore::in_dir(&config.storage_dir);
    tracing::info!(seed, scores = %store.path().display(), "starting");

    let mut renderer = Renderer::new(config.display.pixel_ratio);
    let honor_release = match renderer.init() {
        Ok(h) => h,
        Err(e) => {
            let _ = renderer.cleanup();
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let (view_w, view_h) = renderer.view_size();
    let mut session = Session::new(
        Orbs::new(seed),
        store,
        config.session_settings(),
        view_w,
        view_h,
    );
    let sound = ToneEmitter::new(&config.sound);

    let result = run(&mut session, &mut renderer, sound.as_ref(), &config, honor_release);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    match result {
        Ok(Exit::Hub) => {
            if let Err(e) = go_to_hub(config.hub_command.as_deref()) {
                tracing::error!("{e:#}");
                eprintln!("Hub: {e:#}");
            }
        }
        Ok(Exit::Quit) => {}
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
        }
    }

    println!();
    println!("{} best: {}", session.game().title(), session.best());
}

/// Log to a file: the alternate screen owns stdout.
fn init_logging(cfg: &LogConfig) -> Result<()> {
    if let Some(parent) = cfg.file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.file)
        .with_context(|| format!("cannot open log file {}", cfg.file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber: {e}"))
}

fn band_for(config: &RuntimeConfig, cols: u16) -> ViewportBand {
    config.viewport.band(width_px(cols, config.display.cell_px))
}

fn run<G: Game, S: KvStore>(
    session: &mut Session<G, S>,
    renderer: &mut Renderer,
    sound: Option<&ToneEmitter>,
    config: &RuntimeConfig,
    honor_release: bool,
) -> Result<Exit> {
    let mut kb = InputState::new(Duration::from_millis(config.input.hold_timeout_ms));
    kb.honor_release = honor_release;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut keys = KeyboardBinding::new();
    let mut pad = GamepadBinding::new();

    let (cols, rows) = renderer.size();
    let mut touch = TouchControls::new(cols, rows, band_for(config, cols));
    let mut frames = FrameLoop::new(SystemClock::new(), config.display.fps);

    let mut outcome = Ok(Exit::Quit);

    'frames: while let Some(tick) = frames.next_tick() {
        kb.drain_events();
        gp.update();

        if kb.quit_pressed() {
            break;
        }
        if kb.hub_pressed() || gp.hub_pressed() {
            outcome = Ok(Exit::Hub);
            break;
        }

        if let Some((c, r)) = kb.take_resize() {
            renderer.resize(c, r);
            let (vw, vh) = renderer.view_size();
            session.resize(vw, vh);
            if let Some(release) = touch.relayout(c, r, band_for(config, c)) {
                apply_touch(session, release, tick.now);
            }
        }

        for &ev in kb.pointer_events() {
            for action in touch.handle(ev) {
                if apply_touch(session, action, tick.now) {
                    outcome = Ok(Exit::Hub);
                    break 'frames;
                }
            }
        }

        keys.bind(&kb, session);
        pad.bind(&gp, session, tick.now);

        session.frame(tick.now, tick.dt);
        for event in session.drain_events() {
            play_event(sound, &event);
        }

        if let Err(e) = renderer.render(session, &touch) {
            outcome = Err(e).context("render failed");
            break;
        }
    }

    frames.cancel();
    session.teardown();
    outcome
}

fn play_event(sound: Option<&ToneEmitter>, event: &RuntimeEvent) {
    let Some(sfx) = sound else { return };
    match event {
        RuntimeEvent::Started | RuntimeEvent::Restarted => sfx.play_tone(START_TONE),
        RuntimeEvent::GameOver(summary) if summary.is_new_best => sfx.play_tone(NEW_BEST_TONE),
        RuntimeEvent::GameOver(_) => sfx.play_tone(GAME_OVER_TONE),
        RuntimeEvent::Cue(tone) => sfx.play_tone(*tone),
    }
}
