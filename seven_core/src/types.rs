//! Core domain types for the Seven workout timer.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and the built-in catalog container
//! - Workout definitions and their steps
//! - Session phases driven by the timer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default work interval for a newly added step, in seconds
pub const DEFAULT_WORK_SECONDS: u32 = 30;

/// Default rest interval for a newly added step, in seconds
pub const DEFAULT_REST_SECONDS: u32 = 10;

/// Longest single work or rest interval, in seconds
pub const MAX_INTERVAL_SECONDS: u32 = 3600;

/// Bring an interval into `1..=MAX_INTERVAL_SECONDS`
pub fn clamp_interval(seconds: u32) -> u32 {
    seconds.clamp(1, MAX_INTERVAL_SECONDS)
}

// ============================================================================
// Exercise Types
// ============================================================================

/// A single exercise from the catalog (e.g., "Squats")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: Uuid,
    pub title: String,
    /// Symbol name used by front ends to pick an icon
    pub icon: String,
    /// Nominal duration. The session timer does not read this.
    pub duration_seconds: u32,
}

/// The fixed set of exercises shipped with the app
#[derive(Clone, Debug)]
pub struct Catalog {
    pub exercises: Vec<Exercise>,
}

impl Catalog {
    /// Look up an exercise by identity
    pub fn get(&self, id: &Uuid) -> Option<&Exercise> {
        self.exercises.iter().find(|e| &e.id == id)
    }

    /// Look up an exercise by title, ignoring case, spaces and dashes
    ///
    /// `"push-ups"`, `"Push Ups"` and `"pushups"` all resolve to "Push-ups".
    pub fn find_by_title(&self, title: &str) -> Option<&Exercise> {
        let wanted = normalize_title(title);
        self.exercises
            .iter()
            .find(|e| normalize_title(&e.title) == wanted)
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

// ============================================================================
// Workout Definition Types
// ============================================================================

/// One exercise inside a workout, with its own work/rest intervals
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutStep {
    pub id: Uuid,
    pub exercise: Exercise,
    pub work_seconds: u32,
    pub rest_seconds: u32,
}

impl WorkoutStep {
    /// Create a step with the default 30s work / 10s rest intervals
    pub fn new(exercise: Exercise) -> Self {
        Self::with_durations(exercise, DEFAULT_WORK_SECONDS, DEFAULT_REST_SECONDS)
    }

    pub fn with_durations(exercise: Exercise, work_seconds: u32, rest_seconds: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise,
            work_seconds,
            rest_seconds,
        }
    }

    pub fn total_seconds(&self) -> u32 {
        self.work_seconds.saturating_add(self.rest_seconds)
    }
}

/// A named, ordered list of exercises, either built-in or user-created
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutDefinition {
    pub id: Uuid,
    pub name: String,
    pub steps: Vec<WorkoutStep>,
    pub created_at: DateTime<Utc>,
    /// Built-in definitions ship with the app and cannot be deleted
    pub is_built_in: bool,
}

impl WorkoutDefinition {
    /// Create an empty user workout with a fresh identity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            steps: Vec::new(),
            created_at: Utc::now(),
            is_built_in: false,
        }
    }

    /// Sum of every step's work and rest time
    pub fn total_duration(&self) -> u32 {
        total_seconds(&self.steps)
    }

    /// Total duration as `m:ss`
    pub fn formatted_duration(&self) -> String {
        format_duration(self.total_duration())
    }
}

/// Sum of work and rest over `steps`, saturating at `u32::MAX`
pub fn total_seconds(steps: &[WorkoutStep]) -> u32 {
    steps
        .iter()
        .fold(0u32, |total, step| total.saturating_add(step.total_seconds()))
}

/// Format seconds as `m:ss` (e.g. 75 -> "1:15")
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

// ============================================================================
// Session Types
// ============================================================================

/// Current stage of a workout session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Created but not started
    Idle,
    /// Performing an exercise
    Working { exercise: Exercise, remaining: u32 },
    /// Resting after an exercise
    Resting { remaining: u32 },
    /// Completed naturally or stopped by the user
    Finished,
}

impl Phase {
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Working { .. } | Phase::Resting { .. })
    }

    /// Seconds left in the current interval (0 when idle or finished)
    pub fn remaining(&self) -> u32 {
        match self {
            Phase::Working { remaining, .. } | Phase::Resting { remaining } => *remaining,
            Phase::Idle | Phase::Finished => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "ready",
            Phase::Working { .. } => "work",
            Phase::Resting { .. } => "rest",
            Phase::Finished => "finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(title: &str) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            title: title.into(),
            icon: "figure.walk".into(),
            duration_seconds: 30,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(75), "1:15");
        assert_eq!(format_duration(420), "7:00");
    }

    #[test]
    fn test_definition_total_duration() {
        let mut def = WorkoutDefinition::new("Mixed");
        def.steps.push(WorkoutStep::new(exercise("Squats")));
        def.steps
            .push(WorkoutStep::with_durations(exercise("Plank"), 45, 15));

        assert_eq!(def.total_duration(), 100);
        assert_eq!(def.formatted_duration(), "1:40");
        assert!(!def.is_built_in);
    }

    #[test]
    fn test_oversized_durations_saturate() {
        let mut def = WorkoutDefinition::new("Endless");
        def.steps
            .push(WorkoutStep::with_durations(exercise("Plank"), u32::MAX, 10));
        def.steps.push(WorkoutStep::new(exercise("Squats")));

        assert_eq!(def.steps[0].total_seconds(), u32::MAX);
        assert_eq!(def.total_duration(), u32::MAX);
        assert!(!def.formatted_duration().is_empty());
        assert_eq!(clamp_interval(0), 1);
        assert_eq!(clamp_interval(45), 45);
        assert_eq!(clamp_interval(u32::MAX), MAX_INTERVAL_SECONDS);
    }

    #[test]
    fn test_find_by_title_is_forgiving() {
        let catalog = Catalog {
            exercises: vec![exercise("Push-ups"), exercise("Jumping Jacks")],
        };

        assert_eq!(
            catalog.find_by_title("pushups").map(|e| e.title.as_str()),
            Some("Push-ups")
        );
        assert_eq!(
            catalog
                .find_by_title("jumping-jacks")
                .map(|e| e.title.as_str()),
            Some("Jumping Jacks")
        );
        assert!(catalog.find_by_title("cartwheels").is_none());
    }

    #[test]
    fn test_phase_remaining() {
        let e = exercise("Squats");
        assert_eq!(Phase::Idle.remaining(), 0);
        assert_eq!(
            Phase::Working {
                exercise: e,
                remaining: 12
            }
            .remaining(),
            12
        );
        assert_eq!(Phase::Resting { remaining: 4 }.remaining(), 4);
        assert!(!Phase::Finished.is_active());
    }
}
