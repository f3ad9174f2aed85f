//! TOML-based user preferences.
//!
//! Stores every tunable the engines read:
//! - Eye-reminder enablement and interval
//! - Cycle phase durations and the long-break cadence
//! - The fullscreen gate preference
//!
//! Preferences are stored at `~/.config/restcycle/config.toml`. Writes go
//! through [`PrefStore`], which validates ranges before touching either
//! the in-memory copy or the file; reads fall back to defaults (with
//! out-of-range values clamped) so a damaged file never stops the app.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};

/// Validated ranges, applied at every write boundary.
pub const REMINDER_INTERVAL_MINUTES: RangeInclusive<u32> = 5..=60;
pub const FOCUS_MINUTES: RangeInclusive<u32> = 5..=90;
pub const SHORT_BREAK_MINUTES: RangeInclusive<u32> = 1..=30;
pub const LONG_BREAK_MINUTES: RangeInclusive<u32> = 5..=60;
pub const CYCLES_BEFORE_LONG_BREAK: RangeInclusive<u32> = 2..=8;

/// Preference keys accepted by [`Preferences::get`] and [`PrefStore::set`],
/// in display order.
pub const KEYS: [&str; 7] = [
    "reminder_enabled",
    "reminder_interval_minutes",
    "focus_minutes",
    "short_break_minutes",
    "long_break_minutes",
    "cycles_before_long_break",
    "fullscreen_gate_enabled",
];

/// User preferences.
///
/// Serialized to/from TOML at `~/.config/restcycle/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_minutes: u32,
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_cycles_before_long_break")]
    pub cycles_before_long_break: u32,
    #[serde(default)]
    pub fullscreen_gate_enabled: bool,
}

// Default functions
fn default_reminder_interval() -> u32 {
    20
}
fn default_focus_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_cycles_before_long_break() -> u32 {
    4
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            reminder_enabled: false,
            reminder_interval_minutes: default_reminder_interval(),
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            cycles_before_long_break: default_cycles_before_long_break(),
            fullscreen_gate_enabled: false,
        }
    }
}

impl Preferences {
    /// Get a preference value as a string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "reminder_enabled" => self.reminder_enabled.to_string(),
            "reminder_interval_minutes" => self.reminder_interval_minutes.to_string(),
            "focus_minutes" => self.focus_minutes.to_string(),
            "short_break_minutes" => self.short_break_minutes.to_string(),
            "long_break_minutes" => self.long_break_minutes.to_string(),
            "cycles_before_long_break" => self.cycles_before_long_break.to_string(),
            "fullscreen_gate_enabled" => self.fullscreen_gate_enabled.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Pull every numeric field back into its validated range.
    /// Returns true if anything had to change.
    fn clamp_to_ranges(&mut self) -> bool {
        let mut changed = false;
        let mut clamp = |slot: &mut u32, range: &RangeInclusive<u32>| {
            let clamped = (*slot).clamp(*range.start(), *range.end());
            if clamped != *slot {
                *slot = clamped;
                changed = true;
            }
        };
        clamp(&mut self.reminder_interval_minutes, &REMINDER_INTERVAL_MINUTES);
        clamp(&mut self.focus_minutes, &FOCUS_MINUTES);
        clamp(&mut self.short_break_minutes, &SHORT_BREAK_MINUTES);
        clamp(&mut self.long_break_minutes, &LONG_BREAK_MINUTES);
        clamp(&mut self.cycles_before_long_break, &CYCLES_BEFORE_LONG_BREAK);
        changed
    }
}

/// Reject a value outside its validated range. The caller's prior value
/// stays untouched on rejection.
pub fn check_range(
    key: &'static str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Preference store: an in-memory copy with write-through TOML persistence.
///
/// Engine state must never depend on disk health, so a failed write is
/// logged and the in-memory update stands.
pub struct PrefStore {
    path: PathBuf,
    prefs: Mutex<Preferences>,
}

impl PrefStore {
    /// Open the store at the default data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(data_dir()?.join("config.toml")))
    }

    /// Open the store at `path`. A missing or unreadable file starts from
    /// defaults; a readable file with out-of-range values is clamped.
    pub fn open(path: PathBuf) -> Self {
        let prefs = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<Preferences>(&content) {
                Ok(mut prefs) => {
                    if prefs.clamp_to_ranges() {
                        tracing::warn!(path = %path.display(), "out-of-range preferences clamped");
                    }
                    prefs
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable preferences, using defaults");
                    Preferences::default()
                }
            },
            Err(_) => {
                let prefs = Preferences::default();
                if let Err(e) = save(&path, &prefs) {
                    tracing::warn!(error = %e, "could not write initial preferences");
                }
                prefs
            }
        };
        Self {
            path,
            prefs: Mutex::new(prefs),
        }
    }

    /// A copy of the current preferences.
    pub fn snapshot(&self) -> Preferences {
        self.lock().clone()
    }

    /// Apply `apply` to the preferences and persist. The in-memory update
    /// always takes effect; a failed write is logged.
    pub fn update(&self, apply: impl FnOnce(&mut Preferences)) {
        let mut prefs = self.lock();
        apply(&mut prefs);
        if let Err(e) = save(&self.path, &prefs) {
            tracing::warn!(error = %e, "preference write failed");
        }
    }

    /// Set a preference by key from its string form, with validation.
    pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parse_u32 = |value: &str| -> Result<u32, ConfigError> {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("cannot parse '{value}' as a number"),
            })
        };
        let parse_bool = |value: &str| -> Result<bool, ConfigError> {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected 'true' or 'false', got '{value}'"),
            })
        };

        match key {
            "reminder_enabled" => {
                let v = parse_bool(value)?;
                self.update(|p| p.reminder_enabled = v);
            }
            "reminder_interval_minutes" => {
                let v = parse_u32(value)?;
                check_range("reminder_interval_minutes", v, &REMINDER_INTERVAL_MINUTES)?;
                self.update(|p| p.reminder_interval_minutes = v);
            }
            "focus_minutes" => {
                let v = parse_u32(value)?;
                check_range("focus_minutes", v, &FOCUS_MINUTES)?;
                self.update(|p| p.focus_minutes = v);
            }
            "short_break_minutes" => {
                let v = parse_u32(value)?;
                check_range("short_break_minutes", v, &SHORT_BREAK_MINUTES)?;
                self.update(|p| p.short_break_minutes = v);
            }
            "long_break_minutes" => {
                let v = parse_u32(value)?;
                check_range("long_break_minutes", v, &LONG_BREAK_MINUTES)?;
                self.update(|p| p.long_break_minutes = v);
            }
            "cycles_before_long_break" => {
                let v = parse_u32(value)?;
                check_range("cycles_before_long_break", v, &CYCLES_BEFORE_LONG_BREAK)?;
                self.update(|p| p.cycles_before_long_break = v);
            }
            "fullscreen_gate_enabled" => {
                let v = parse_bool(value)?;
                self.update(|p| p.fullscreen_gate_enabled = v);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Preferences> {
        self.prefs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn save(path: &Path, prefs: &Preferences) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(prefs).map_err(|e| ConfigError::SaveFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn temp_store() -> (tempfile::TempDir, PrefStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefStore::open(dir.path().join("config.toml"));
        (dir, store)
    }

    #[test]
    fn missing_file_yields_defaults_and_writes_them() {
        let (dir, store) = temp_store();
        assert_eq!(store.snapshot(), Preferences::default());
        assert!(dir.path().join("config.toml").exists());
    }

    #[test]
    fn updates_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let store = PrefStore::open(path.clone());
        store.update(|p| {
            p.reminder_enabled = true;
            p.focus_minutes = 30;
        });
        drop(store);

        let reopened = PrefStore::open(path);
        let prefs = reopened.snapshot();
        assert!(prefs.reminder_enabled);
        assert_eq!(prefs.focus_minutes, 30);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "focus_minutes = \"not a number\"").unwrap();

        let store = PrefStore::open(path);
        assert_eq!(store.snapshot(), Preferences::default());
    }

    #[test]
    fn out_of_range_values_are_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "reminder_interval_minutes = 600\nfocus_minutes = 1\ncycles_before_long_break = 0\n",
        )
        .unwrap();

        let prefs = PrefStore::open(path).snapshot();
        assert_eq!(prefs.reminder_interval_minutes, 60);
        assert_eq!(prefs.focus_minutes, 5);
        assert_eq!(prefs.cycles_before_long_break, 2);
    }

    #[test]
    fn set_validates_range_and_keeps_prior_value() {
        let (_dir, store) = temp_store();

        let err = store.set("focus_minutes", "300").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
        assert_eq!(store.snapshot().focus_minutes, 25);

        store.set("focus_minutes", "45").unwrap();
        assert_eq!(store.snapshot().focus_minutes, 45);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.set("volume", "50"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            store.set("reminder_enabled", "yes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            store.set("focus_minutes", "abc"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn get_covers_every_key() {
        let prefs = Preferences::default();
        for key in KEYS {
            assert!(prefs.get(key).is_some(), "missing key {key}");
        }
        assert!(prefs.get("nonsense").is_none());
    }
}
