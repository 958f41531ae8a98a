/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory, the CWD or the
/// data directories. Falls back to defaults if the file is missing or
/// incomplete. Problems are returned as warnings because logging is not
/// up yet when the config is read.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::viewport::BandThresholds;
use crate::sim::session::SessionSettings;
use crate::sim::store;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub display: DisplayConfig,
    pub viewport: BandThresholds,
    pub input: InputConfig,
    pub camera_smoothing: f32,
    pub sound: SoundConfig,
    pub storage_dir: PathBuf,
    pub hub_command: Option<String>,
    pub log: LogConfig,
    pub gamepad: GamepadConfig,
    /// Fixed seed for the demo game; random when unset.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub fps: u32,
    /// Assumed width of one terminal column in px, for band classification.
    pub cell_px: u32,
    pub pixel_ratio: u8,
}

#[derive(Clone, Debug)]
pub struct InputConfig {
    pub pulse_ms: u64,
    pub hold_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct SoundConfig {
    pub enabled: bool,
    pub volume: f32,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: String,
    pub file: PathBuf,
}

#[derive(Clone, Debug, Default)]
pub struct GamepadConfig {
    pub action: Vec<String>,
    pub dash: Vec<String>,
    pub hub: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    viewport: TomlViewport,
    #[serde(default)]
    input: TomlInput,
    #[serde(default)]
    camera: TomlCamera,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    storage: TomlStorage,
    #[serde(default)]
    hub: TomlHub,
    #[serde(default)]
    log: TomlLog,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    game: TomlGame,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default = "default_cell_px")]
    cell_px: u32,
    #[serde(default = "default_pixel_ratio")]
    pixel_ratio: u8,
}

#[derive(Deserialize, Debug)]
struct TomlViewport {
    #[serde(default = "default_tablet_min")]
    tablet_min: u32,
    #[serde(default = "default_tablet_max")]
    tablet_max: u32,
}

#[derive(Deserialize, Debug)]
struct TomlInput {
    #[serde(default = "default_pulse_ms")]
    pulse_ms: u64,
    #[serde(default = "default_hold_timeout")]
    hold_timeout_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlCamera {
    #[serde(default = "default_smoothing")]
    smoothing: f32,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_volume")]
    volume: f32,
}

#[derive(Deserialize, Debug, Default)]
struct TomlStorage {
    #[serde(default)]
    dir: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlHub {
    #[serde(default)]
    command: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default)]
    file: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_action")]
    action: Vec<String>,
    #[serde(default = "default_pad_dash")]
    dash: Vec<String>,
    #[serde(default = "default_pad_hub")]
    hub: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGame {
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_fps() -> u32 { 60 }
fn default_cell_px() -> u32 { 8 }
fn default_pixel_ratio() -> u8 { 2 }
fn default_tablet_min() -> u32 { 720 }
fn default_tablet_max() -> u32 { 1285 }
fn default_pulse_ms() -> u64 { 150 }
fn default_hold_timeout() -> u64 { 160 }
fn default_smoothing() -> f32 { 6.0 }
fn default_true() -> bool { true }
fn default_volume() -> f32 { 0.3 }
fn default_log_level() -> String { "info".into() }

fn default_pad_action() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_pad_dash() -> Vec<String> { vec!["B".into(), "X".into()] }
fn default_pad_hub() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay { fps: default_fps(), cell_px: default_cell_px(), pixel_ratio: default_pixel_ratio() }
    }
}

impl Default for TomlViewport {
    fn default() -> Self {
        TomlViewport { tablet_min: default_tablet_min(), tablet_max: default_tablet_max() }
    }
}

impl Default for TomlInput {
    fn default() -> Self {
        TomlInput { pulse_ms: default_pulse_ms(), hold_timeout_ms: default_hold_timeout() }
    }
}

impl Default for TomlCamera {
    fn default() -> Self {
        TomlCamera { smoothing: default_smoothing() }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound { enabled: true, volume: default_volume() }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog { level: default_log_level(), file: None }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad { action: default_pad_action(), dash: default_pad_dash(), hub: default_pad_hub() }
    }
}

// ── Loading ──

impl RuntimeConfig {
    /// Load config from `config.toml`. Returns the config plus any warnings
    /// to log once the subscriber is installed.
    pub fn load() -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let toml_cfg = load_toml(&candidate_dirs(), &mut warnings);
        let cfg = RuntimeConfig::from_toml(toml_cfg, store::default_dir, &mut warnings);
        (cfg, warnings)
    }

    #[cfg(test)]
    fn parse(text: &str, data_dir: &Path) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let toml_cfg = parse_toml(text, Path::new("config.toml"), &mut warnings);
        let dir = data_dir.to_path_buf();
        let cfg = RuntimeConfig::from_toml(toml_cfg, move || dir, &mut warnings);
        (cfg, warnings)
    }

    fn from_toml(t: TomlConfig, data_dir: impl FnOnce() -> PathBuf, warnings: &mut Vec<String>) -> Self {
        let mut viewport = BandThresholds { tablet_min: t.viewport.tablet_min, tablet_max: t.viewport.tablet_max };
        if viewport.tablet_min > viewport.tablet_max {
            warnings.push(format!(
                "viewport.tablet_min ({}) exceeds tablet_max ({}); using defaults",
                viewport.tablet_min, viewport.tablet_max
            ));
            viewport = BandThresholds::default();
        }

        let pixel_ratio = t.display.pixel_ratio;
        if !(1..=2).contains(&pixel_ratio) {
            warnings.push(format!("display.pixel_ratio {pixel_ratio} out of range; clamped to 1..=2"));
        }

        let data_dir = data_dir();
        let storage_dir = t.storage.dir.map(PathBuf::from).unwrap_or_else(|| data_dir.clone());
        let log_file = t.log.file.map(PathBuf::from).unwrap_or_else(|| data_dir.join("cabinet.log"));

        RuntimeConfig {
            display: DisplayConfig {
                fps: t.display.fps.max(1),
                cell_px: t.display.cell_px.max(1),
                pixel_ratio: pixel_ratio.clamp(1, 2),
            },
            viewport,
            input: InputConfig { pulse_ms: t.input.pulse_ms, hold_timeout_ms: t.input.hold_timeout_ms },
            camera_smoothing: t.camera.smoothing.max(0.0),
            sound: SoundConfig { enabled: t.sound.enabled, volume: t.sound.volume.clamp(0.0, 1.0) },
            storage_dir,
            hub_command: t.hub.command.filter(|c| !c.trim().is_empty()),
            log: LogConfig { level: t.log.level, file: log_file },
            gamepad: GamepadConfig { action: t.gamepad.action, dash: t.gamepad.dash, hub: t.gamepad.hub },
            seed: t.game.seed,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            pulse: Duration::from_millis(self.input.pulse_ms),
            camera_rate: self.camera_smoothing,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/cabinet)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/cabinet");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/cabinet");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// First readable config.toml wins.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => return parse_toml(&text, &path, warnings),
            Err(e) => warnings.push(format!("could not read {}: {e}", path.display())),
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, path: &Path, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("{} parse error, using defaults: {e}", path.display()));
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> PathBuf {
        PathBuf::from("/tmp/cabinet-data")
    }

    #[test]
    fn empty_file_gives_defaults() {
        let (cfg, warnings) = RuntimeConfig::parse("", &data());
        assert!(warnings.is_empty());
        assert_eq!(cfg.display.fps, 60);
        assert_eq!(cfg.display.cell_px, 8);
        assert_eq!(cfg.display.pixel_ratio, 2);
        assert_eq!(cfg.viewport, BandThresholds::default());
        assert_eq!(cfg.input.pulse_ms, 150);
        assert_eq!(cfg.input.hold_timeout_ms, 160);
        assert!(cfg.sound.enabled);
        assert_eq!(cfg.storage_dir, data());
        assert_eq!(cfg.log.file, data().join("cabinet.log"));
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.hub_command, None);
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.gamepad.hub, vec!["Select".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
            [display]
            fps = 30

            [input]
            pulse_ms = 200

            [hub]
            command = "arcade-menu --back"

            [storage]
            dir = "/var/games/cabinet"

            [game]
            seed = 7
        "#;
        let (cfg, warnings) = RuntimeConfig::parse(text, &data());
        assert!(warnings.is_empty());
        assert_eq!(cfg.display.fps, 30);
        assert_eq!(cfg.display.cell_px, 8);
        assert_eq!(cfg.session_settings().pulse, Duration::from_millis(200));
        assert_eq!(cfg.input.hold_timeout_ms, 160);
        assert_eq!(cfg.hub_command.as_deref(), Some("arcade-menu --back"));
        assert_eq!(cfg.storage_dir, PathBuf::from("/var/games/cabinet"));
        assert_eq!(cfg.seed, Some(7));
    }

    #[test]
    fn bad_values_are_corrected_with_warnings() {
        let text = r#"
            [viewport]
            tablet_min = 1400
            tablet_max = 900

            [display]
            pixel_ratio = 4

            [sound]
            volume = 3.0
        "#;
        let (cfg, warnings) = RuntimeConfig::parse(text, &data());
        assert_eq!(warnings.len(), 2);
        assert_eq!(cfg.viewport, BandThresholds::default());
        assert_eq!(cfg.display.pixel_ratio, 2);
        assert_eq!(cfg.sound.volume, 1.0);
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let (cfg, warnings) = RuntimeConfig::parse("[display\nfps = ", &data());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("parse error"));
        assert_eq!(cfg.display.fps, 60);
    }

    #[test]
    fn blank_hub_command_means_none() {
        let (cfg, _) = RuntimeConfig::parse("[hub]\ncommand = \"  \"\n", &data());
        assert_eq!(cfg.hub_command, None);
    }
}
