//! Learner progress: experience points, daily streak and hearts.
//!
//! Progress lives as one JSON record under `PROGRESS_KEY` in an opaque string
//! key-value store, the same shape a browser's local storage would hold. The
//! store is swappable: in-memory for tests and throwaway sessions, a JSON file
//! for a persistent single-learner setup.

use std::{
  collections::HashMap,
  path::PathBuf,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ProgressSettings;
use crate::error::ProviderError;

pub const PROGRESS_KEY: &str = "bolo.progress";

/// Opaque get/set/remove string store.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&self, key: &str, value: String) -> Result<(), ProviderError>;
  fn remove(&self, key: &str) -> Result<(), ProviderError>;
}

#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

/// A panic elsewhere cannot leave the map half-written, so a poisoned lock is still usable.
fn lock_entries(entries: &Mutex<HashMap<String, String>>) -> MutexGuard<'_, HashMap<String, String>> {
  entries.lock().unwrap_or_else(PoisonError::into_inner)
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Option<String> {
    lock_entries(&self.entries).get(key).cloned()
  }

  fn set(&self, key: &str, value: String) -> Result<(), ProviderError> {
    lock_entries(&self.entries).insert(key.to_string(), value);
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), ProviderError> {
    lock_entries(&self.entries).remove(key);
    Ok(())
  }
}

/// Whole store kept as one JSON object on disk, rewritten on every change.
///
/// Writes are synchronous and happen while the caller holds the progress lock.
/// The file holds a single learner's record of a few hundred bytes, so one
/// write per answer is acceptable on a runtime worker; a multi-learner backend
/// needs a real database instead.
pub struct JsonFileStore {
  path: PathBuf,
  entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
  /// Open (or lazily create) the file. An unreadable or corrupt file starts empty.
  pub fn open(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let entries = match std::fs::read_to_string(&path) {
      Ok(text) => serde_json::from_str::<HashMap<String, String>>(&text).unwrap_or_else(|e| {
        warn!(target: "progress", path = %path.display(), error = %e, "Progress file is not valid JSON; starting empty");
        HashMap::new()
      }),
      Err(_) => HashMap::new(),
    };
    Self { path, entries: Mutex::new(entries) }
  }

  fn flush(&self, entries: &HashMap<String, String>) -> Result<(), ProviderError> {
    let text = serde_json::to_string_pretty(entries)?;
    std::fs::write(&self.path, text)?;
    Ok(())
  }
}

impl KeyValueStore for JsonFileStore {
  fn get(&self, key: &str) -> Option<String> {
    lock_entries(&self.entries).get(key).cloned()
  }

  fn set(&self, key: &str, value: String) -> Result<(), ProviderError> {
    let mut entries = lock_entries(&self.entries);
    entries.insert(key.to_string(), value);
    self.flush(&entries)
  }

  fn remove(&self, key: &str) -> Result<(), ProviderError> {
    let mut entries = lock_entries(&self.entries);
    entries.remove(key);
    self.flush(&entries)
  }
}

/// Snapshot of a learner's progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
  pub xp: u32,
  pub streak_days: u32,
  #[serde(default)]
  pub last_active: Option<NaiveDate>,
  pub hearts: u32,
  pub max_hearts: u32,
  #[serde(default)]
  pub lessons_completed: u32,
  #[serde(default)]
  pub answered: u32,
  #[serde(default)]
  pub answered_correctly: u32,
}

impl Progress {
  pub fn fresh(max_hearts: u32) -> Self {
    Self {
      xp: 0,
      streak_days: 0,
      last_active: None,
      hearts: max_hearts,
      max_hearts,
      lessons_completed: 0,
      answered: 0,
      answered_correctly: 0,
    }
  }

  pub fn is_out_of_hearts(&self) -> bool {
    self.hearts == 0
  }

  /// Same day: unchanged. Next day: +1. Anything else starts over at 1.
  fn touch_streak(&mut self, today: NaiveDate) {
    self.streak_days = match self.last_active {
      Some(last) if last == today => self.streak_days.max(1),
      Some(last) if last.succ_opt() == Some(today) => self.streak_days + 1,
      _ => 1,
    };
    self.last_active = Some(today);
  }
}

/// Applies verdicts and lesson completions to the stored progress record.
pub struct ProgressTracker {
  store: Box<dyn KeyValueStore>,
  settings: ProgressSettings,
}

impl ProgressTracker {
  pub fn new(store: Box<dyn KeyValueStore>, settings: ProgressSettings) -> Self {
    Self { store, settings }
  }

  /// In-memory tracker with the given rules.
  #[cfg(test)]
  pub fn in_memory(settings: ProgressSettings) -> Self {
    Self::new(Box::new(MemoryStore::default()), settings)
  }

  /// Current record; a missing or unreadable record reads as fresh progress.
  pub fn load(&self) -> Progress {
    match self.store.get(PROGRESS_KEY) {
      Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(target: "progress", error = %e, "Stored progress is corrupt; using fresh progress");
        Progress::fresh(self.settings.max_hearts)
      }),
      None => Progress::fresh(self.settings.max_hearts),
    }
  }

  fn save(&self, progress: &Progress) -> Result<(), ProviderError> {
    self.store.set(PROGRESS_KEY, serde_json::to_string(progress)?)
  }

  /// Correct answers earn XP, wrong ones cost a heart (never below zero).
  pub fn record_answer(&self, correct: bool, today: NaiveDate) -> Result<Progress, ProviderError> {
    let mut p = self.load();
    p.answered += 1;
    if correct {
      p.answered_correctly += 1;
      p.xp += self.settings.xp_per_correct;
    } else {
      p.hearts = p.hearts.saturating_sub(1);
    }
    p.touch_streak(today);
    self.save(&p)?;
    Ok(p)
  }

  pub fn complete_lesson(&self, today: NaiveDate) -> Result<Progress, ProviderError> {
    let mut p = self.load();
    p.lessons_completed += 1;
    p.xp += self.settings.lesson_bonus_xp;
    p.touch_streak(today);
    self.save(&p)?;
    info!(target: "progress", xp = p.xp, lessons = p.lessons_completed, streak = p.streak_days, "Lesson completed");
    Ok(p)
  }

  pub fn refill_hearts(&self) -> Result<Progress, ProviderError> {
    let mut p = self.load();
    p.max_hearts = self.settings.max_hearts;
    p.hearts = p.max_hearts;
    self.save(&p)?;
    Ok(p)
  }

  pub fn reset(&self) -> Result<Progress, ProviderError> {
    self.store.remove(PROGRESS_KEY)?;
    Ok(Progress::fresh(self.settings.max_hearts))
  }

  pub fn export_json(&self) -> Result<String, ProviderError> {
    Ok(serde_json::to_string_pretty(&self.load())?)
  }

  /// Replace progress with a previous export. Hearts are clamped to the configured maximum.
  pub fn import_json(&self, text: &str) -> Result<Progress, ProviderError> {
    let mut p: Progress = serde_json::from_str(text)?;
    p.max_hearts = self.settings.max_hearts;
    p.hearts = p.hearts.min(p.max_hearts);
    self.save(&p)?;
    info!(target: "progress", xp = p.xp, streak = p.streak_days, "Progress imported");
    Ok(p)
  }
}
