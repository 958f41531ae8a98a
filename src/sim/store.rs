//! Best-score persistence.
//!
//! ## Layout
//!   One key per game, `<game_id>-best`, holding a base-10 integer string.
//!   `FileStore` keeps all keys as `key=value` lines in `scores.dat`.
//!
//! ## Failure model
//!   Score tracking is best effort. `ScoreBook` never returns an error: an
//!   unavailable store is logged once and the book keeps scores in memory for
//!   the rest of the session. Absent or malformed values read as 0.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::screen::BestScores;

const SCORES_FILE: &str = "scores.dat";
const BEST_SUFFIX: &str = "-best";

// ══════════════════════════════════════════════════════════════
// Key-value stores
// ══════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum StoreError {
    /// The store refused the operation.
    Rejected(String),
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(why) => write!(f, "store rejected operation: {why}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Rejected(_) => None,
        }
    }
}

/// String-keyed durable store, no transactions.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        FileStore::new(dir.join(SCORES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }

    fn read_entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(self.io_err(e)),
        };
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .read_entries()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if key.contains(['=', '\n']) || value.contains('\n') {
            return Err(StoreError::Rejected(format!("{key:?} does not fit the key=value format")));
        }
        let mut entries = self.read_entries()?;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }

        let mut out = String::with_capacity(entries.len() * 24);
        for (k, v) in &entries {
            out.push_str(&format!("{k}={v}\n"));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }
        replace_file(&self.path, &out).map_err(|e| self.io_err(e))
    }
}

/// Write-then-rename: a crash mid-write leaves the previous file intact.
/// The temp file never outlives a failed call.
fn replace_file(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = path.with_extension("dat.tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        e
    })
}

/// In-process store. `unavailable()` builds one that refuses every operation,
/// standing in for a denied or full backing store.
#[cfg(test)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    available: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore { values: HashMap::new(), available: true }
    }

    pub fn unavailable() -> Self {
        MemoryStore { values: HashMap::new(), available: false }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if !self.available {
            return Err(StoreError::Rejected("memory store disabled".into()));
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if !self.available {
            return Err(StoreError::Rejected("memory store disabled".into()));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Default directory for `scores.dat`.
/// Order: exe dir if writable, `~/.local/share/cabinet`, CWD.
pub fn default_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs (/usr/games) are not writable.
            let probe = parent.join(".write_test_cabinet");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/cabinet");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// Score book
// ══════════════════════════════════════════════════════════════

pub fn best_key(game_id: &str) -> String {
    format!("{game_id}{BEST_SUFFIX}")
}

/// Absent, negative, fractional or otherwise malformed values read as 0.
pub fn parse_score(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(0)
}

pub struct ScoreBook<S: KvStore> {
    store: S,
    /// Latest value written per game this session, whether or not the store took it.
    session: HashMap<String, u32>,
    degraded: bool,
}

impl<S: KvStore> ScoreBook<S> {
    pub fn new(store: S) -> Self {
        ScoreBook { store, session: HashMap::new(), degraded: false }
    }

    pub fn load_best(&mut self, game_id: &str) -> u32 {
        if let Some(&v) = self.session.get(game_id) {
            return v;
        }
        match self.store.get(&best_key(game_id)) {
            Ok(Some(raw)) => {
                let v = parse_score(&raw);
                if v == 0 && raw.trim() != "0" {
                    tracing::debug!(game_id, raw = %raw, "malformed best score, using 0");
                }
                v
            }
            Ok(None) => 0,
            Err(e) => {
                self.degrade(&e);
                0
            }
        }
    }

    /// Overwrites unconditionally; callers decide whether a score is a new best.
    pub fn save_best(&mut self, game_id: &str, value: u32) {
        self.session.insert(game_id.to_string(), value);
        if let Err(e) = self.store.set(&best_key(game_id), &value.to_string()) {
            self.degrade(&e);
        }
    }

    /// True once any store operation has failed this session.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn degrade(&mut self, e: &StoreError) {
        if !self.degraded {
            tracing::warn!(error = %e, "score store unavailable, keeping scores in memory");
        }
        self.degraded = true;
    }
}

impl<S: KvStore> BestScores for ScoreBook<S> {
    fn load_best(&mut self, game_id: &str) -> u32 {
        ScoreBook::load_best(self, game_id)
    }

    fn save_best(&mut self, game_id: &str, value: u32) {
        ScoreBook::save_best(self, game_id, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_game_id_with_best_suffix() {
        assert_eq!(best_key("orbs"), "orbs-best");
    }

    #[test]
    fn absent_and_malformed_read_as_zero() {
        let store = MemoryStore::new()
            .with("a-best", "abc")
            .with("b-best", "-5")
            .with("c-best", "12.5")
            .with("d-best", " 17 ");
        let mut book = ScoreBook::new(store);
        assert_eq!(book.load_best("missing"), 0);
        assert_eq!(book.load_best("a"), 0);
        assert_eq!(book.load_best("b"), 0);
        assert_eq!(book.load_best("c"), 0);
        assert_eq!(book.load_best("d"), 17);
        assert!(!book.is_degraded());
    }

    #[test]
    fn save_then_load_round_trips() {
        for v in [0u32, 1, 42, 100, 99_999, u32::MAX] {
            let mut book = ScoreBook::new(MemoryStore::new());
            book.save_best("g", v);
            assert_eq!(book.load_best("g"), v);
            assert_eq!(book.store().get("g-best").unwrap(), Some(v.to_string()));
        }
    }

    #[test]
    fn save_overwrites_even_when_lower() {
        let mut book = ScoreBook::new(MemoryStore::new());
        book.save_best("g", 50);
        book.save_best("g", 10);
        assert_eq!(book.load_best("g"), 10);
    }

    #[test]
    fn unavailable_store_degrades_to_memory() {
        let mut book = ScoreBook::new(MemoryStore::unavailable());
        assert_eq!(book.load_best("g"), 0);
        assert!(book.is_degraded());
        book.save_best("g", 30);
        assert_eq!(book.load_best("g"), 30);
    }

    #[test]
    fn file_store_persists_across_books() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut book = ScoreBook::new(FileStore::in_dir(dir.path()));
            book.save_best("orbs", 120);
            book.save_best("snake", 7);
            book.save_best("orbs", 130);
        }
        let mut book = ScoreBook::new(FileStore::in_dir(dir.path()));
        assert_eq!(book.load_best("orbs"), 130);
        assert_eq!(book.load_best("snake"), 7);

        let raw = std::fs::read_to_string(dir.path().join("scores.dat")).unwrap();
        assert_eq!(raw, "orbs-best=130\nsnake-best=7\n");
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(&dir.path().join("nested"));
        assert_eq!(store.get("x-best").unwrap(), None);
    }

    #[test]
    fn file_store_on_a_directory_path_degrades() {
        let dir = tempfile::tempdir().unwrap();
        // The store path is itself a directory: reads and writes both fail.
        let mut book = ScoreBook::new(FileStore::new(dir.path()));
        assert_eq!(book.load_best("g"), 0);
        book.save_best("g", 9);
        assert!(book.is_degraded());
        assert_eq!(book.load_best("g"), 9);
    }

    #[test]
    fn file_store_rejects_keys_that_break_the_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::in_dir(dir.path());
        let err = store.set("a=b", "1").unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(store.set("ok", "1\n2").is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory sits where scores.dat should go.
        let target = dir.path().join("scores.dat");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        assert!(replace_file(&target, "g-best=5\n").is_err());
        assert!(!dir.path().join("scores.dat.tmp").exists());
        assert!(target.join("keep").exists());
    }
}
