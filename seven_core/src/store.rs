//! Local progress store: streak, daily history and saved workouts.
//!
//! Everything lives under four keys of a [`KeyValueStore`]:
//!
//! | Key               | Value                                   |
//! |-------------------|-----------------------------------------|
//! | `streak.days`     | current consecutive-day streak          |
//! | `streak.lastDate` | RFC 3339 time of the last completion    |
//! | `workout.history` | `yyyy-MM-dd` (UTC) -> seconds exercised |
//! | `custom.workouts` | list of workout definitions             |
//!
//! Reads never fail: a missing or undecodable value falls back to its
//! default and logs a warning.

use crate::catalog::built_in_workouts;
use crate::kv::{Entries, JsonFileStore, KeyValueStore};
use crate::session::ProgressRecorder;
use crate::types::WorkoutDefinition;
use crate::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

pub const STREAK_DAYS_KEY: &str = "streak.days";
pub const LAST_DATE_KEY: &str = "streak.lastDate";
pub const HISTORY_KEY: &str = "workout.history";
pub const WORKOUTS_KEY: &str = "custom.workouts";

/// Result of a delete request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Built-in workouts are never removed
    Protected,
}

/// Streak and today's total, as shown on the home screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Summary {
    pub streak_days: u32,
    pub today_seconds: u32,
    pub daily_goal_seconds: u32,
}

impl Summary {
    pub fn today_minutes(&self) -> u32 {
        self.today_seconds / 60
    }

    /// Fraction of the daily goal reached, capped at 1.0
    pub fn progress(&self) -> f64 {
        if self.daily_goal_seconds == 0 {
            return 0.0;
        }
        (self.today_seconds as f64 / self.daily_goal_seconds as f64).min(1.0)
    }
}

/// Format a timestamp as the UTC day key used by the history map
pub fn date_key(at: DateTime<Utc>) -> String {
    day_key(at.date_naive())
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Streak after a completion at `at`, given the previous streak and date
///
/// Same UTC day keeps the streak, the following day extends it, anything
/// else (including no previous completion) starts over at 1.
pub fn next_streak(previous: u32, last: Option<DateTime<Utc>>, at: DateTime<Utc>) -> u32 {
    let Some(last) = last else {
        return 1;
    };

    let last_day = last.date_naive();
    let day = at.date_naive();

    if day == last_day {
        previous
    } else if last_day.succ_opt() == Some(day) {
        previous + 1
    } else {
        1
    }
}

/// Persistence for streak, history and workout definitions
pub struct ProgressStore<S: KeyValueStore = JsonFileStore> {
    kv: S,
}

impl ProgressStore<JsonFileStore> {
    /// Open the file-backed store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFileStore::open(path))
    }
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn backend(&self) -> &S {
        &self.kv
    }

    fn decode<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        decode_value(key, self.kv.get(key))
    }

    // ── Streak and history ──────────────────────────────────────────

    pub fn streak_days(&self) -> u32 {
        self.decode(STREAK_DAYS_KEY).unwrap_or(0)
    }

    pub fn last_workout_date(&self) -> Option<DateTime<Utc>> {
        self.decode(LAST_DATE_KEY)
    }

    /// All recorded days, oldest first
    pub fn history(&self) -> BTreeMap<String, u32> {
        self.decode(HISTORY_KEY).unwrap_or_default()
    }

    /// Credit a completed session
    ///
    /// The streak is computed from the previous last-workout date before
    /// that date is overwritten; streak, date and history are written in
    /// one batch.
    pub fn record_workout(&mut self, total_seconds: u32, at: DateTime<Utc>) -> Result<()> {
        let key = date_key(at);
        let mut report = (0, 0, 0);

        self.kv.update(|entries| {
            let previous_streak: u32 = decode_entry(entries, STREAK_DAYS_KEY).unwrap_or(0);
            let last: Option<DateTime<Utc>> = decode_entry(entries, LAST_DATE_KEY);
            let streak = next_streak(previous_streak, last, at);

            let mut history: BTreeMap<String, u32> =
                decode_entry(entries, HISTORY_KEY).unwrap_or_default();
            let bucket = history.entry(key.clone()).or_insert(0);
            *bucket = bucket.saturating_add(total_seconds);
            report = (previous_streak, streak, *bucket);

            entries.insert(STREAK_DAYS_KEY.into(), Value::from(streak));
            entries.insert(LAST_DATE_KEY.into(), serde_json::to_value(at)?);
            entries.insert(HISTORY_KEY.into(), serde_json::to_value(&history)?);
            Ok(())
        })?;

        let (previous_streak, streak, day_total) = report;
        tracing::info!(
            "Recorded {}s on {} (day total {}s, streak {} -> {})",
            total_seconds,
            key,
            day_total,
            previous_streak,
            streak
        );
        Ok(())
    }

    /// Seconds exercised on the UTC day containing `on`
    pub fn daily_seconds(&self, on: DateTime<Utc>) -> u32 {
        self.history().get(&date_key(on)).copied().unwrap_or(0)
    }

    /// The last `days` days ending with the day of `now`, oldest first,
    /// including days with nothing recorded
    pub fn recent_days(&self, days: u32, now: DateTime<Utc>) -> Vec<(NaiveDate, u32)> {
        let history = self.history();
        let today = now.date_naive();
        (0..days)
            .rev()
            .filter_map(|back| today.checked_sub_signed(Duration::days(i64::from(back))))
            .map(|day| (day, history.get(&day_key(day)).copied().unwrap_or(0)))
            .collect()
    }

    pub fn summary(&self, now: DateTime<Utc>, daily_goal_seconds: u32) -> Summary {
        Summary {
            streak_days: self.streak_days(),
            today_seconds: self.daily_seconds(now),
            daily_goal_seconds,
        }
    }

    // ── Workouts ────────────────────────────────────────────────────

    /// Saved workouts, or the built-in defaults if none were ever saved
    pub fn list_workouts(&self) -> Vec<WorkoutDefinition> {
        self.decode(WORKOUTS_KEY)
            .unwrap_or_else(|| built_in_workouts().to_vec())
    }

    pub fn find_workout(&self, id: &Uuid) -> Option<WorkoutDefinition> {
        self.list_workouts().into_iter().find(|w| &w.id == id)
    }

    /// Insert or replace by identity; a replacement keeps its position
    pub fn save_workout(&mut self, workout: &WorkoutDefinition) -> Result<()> {
        self.kv.update(|entries| {
            let mut workouts = workouts_in(entries);
            match workouts.iter_mut().find(|w| w.id == workout.id) {
                Some(existing) => {
                    *existing = workout.clone();
                    tracing::info!("Updated workout '{}' ({})", workout.name, workout.id);
                }
                None => {
                    workouts.push(workout.clone());
                    tracing::info!("Added workout '{}' ({})", workout.name, workout.id);
                }
            }
            entries.insert(WORKOUTS_KEY.into(), serde_json::to_value(&workouts)?);
            Ok(())
        })
    }

    /// Remove a user workout by identity
    pub fn delete_workout(&mut self, id: &Uuid) -> Result<DeleteOutcome> {
        let mut outcome = DeleteOutcome::NotFound;

        self.kv.update(|entries| {
            let mut workouts = workouts_in(entries);
            let Some(pos) = workouts.iter().position(|w| &w.id == id) else {
                tracing::debug!("Delete of unknown workout {} ignored", id);
                return Ok(());
            };
            if workouts[pos].is_built_in {
                tracing::warn!("Refusing to delete built-in workout '{}'", workouts[pos].name);
                outcome = DeleteOutcome::Protected;
                return Ok(());
            }

            let removed = workouts.remove(pos);
            entries.insert(WORKOUTS_KEY.into(), serde_json::to_value(&workouts)?);
            tracing::info!("Deleted workout '{}' ({})", removed.name, removed.id);
            outcome = DeleteOutcome::Deleted;
            Ok(())
        })?;

        Ok(outcome)
    }

    /// Clear streak and history and restore the built-in workouts
    pub fn reset_all(&mut self) -> Result<()> {
        self.kv.apply(vec![
            (STREAK_DAYS_KEY, Some(Value::from(0u32))),
            (LAST_DATE_KEY, None),
            (HISTORY_KEY, None),
            (WORKOUTS_KEY, Some(serde_json::to_value(built_in_workouts())?)),
        ])?;
        tracing::info!("All progress data reset");
        Ok(())
    }
}

fn decode_value<T: DeserializeOwned>(key: &str, value: Option<Value>) -> Option<T> {
    match serde_json::from_value(value?) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!("Ignoring undecodable value for '{}': {}", key, e);
            None
        }
    }
}

fn decode_entry<T: DeserializeOwned>(entries: &Entries, key: &str) -> Option<T> {
    decode_value(key, entries.get(key).cloned())
}

fn workouts_in(entries: &Entries) -> Vec<WorkoutDefinition> {
    decode_entry(entries, WORKOUTS_KEY).unwrap_or_else(|| built_in_workouts().to_vec())
}

impl<S: KeyValueStore> ProgressRecorder for ProgressStore<S> {
    fn record_workout(&mut self, total_seconds: u32, at: DateTime<Utc>) -> Result<()> {
        ProgressStore::record_workout(self, total_seconds, at)
    }
}
