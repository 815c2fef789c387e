//! Built-in exercise catalog and default workouts.
//!
//! Identities are fixed so that workouts persisted by one run keep pointing
//! at the same exercises in the next, and so that a data reset restores the
//! default workouts exactly.

use crate::types::*;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use uuid::Uuid;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Cached built-in workouts
static BUILT_IN_WORKOUTS: Lazy<Vec<WorkoutDefinition>> = Lazy::new(build_built_in_workouts);

/// Creation time stamped on the built-in workouts (2024-01-01T00:00:00Z)
const BUILT_IN_CREATED_AT: i64 = 1_704_067_200;

const EXERCISE_ID_BASE: u128 = 0x5e7e_0000_0000_4000_8000_0000_0000_0000;
const WORKOUT_ID_BASE: u128 = 0x5e7e_0001_0000_4000_8000_0000_0000_0000;
const STEP_ID_BASE: u128 = 0x5e7e_0002_0000_4000_8000_0000_0000_0000;

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// The built-in workouts shown on first run and restored by a reset
pub fn built_in_workouts() -> &'static [WorkoutDefinition] {
    &BUILT_IN_WORKOUTS
}

/// Builds the catalog of ten bodyweight exercises
///
/// Prefer `get_default_catalog()` outside of tests.
pub fn build_default_catalog() -> Catalog {
    let entries = [
        ("Squats", "figure.strengthtraining.traditional"),
        ("Push-ups", "figure.pushup"),
        ("Plank", "figure.core.training"),
        ("Crunches", "figure.core.training"),
        ("Lunges", "figure.walk"),
        ("Burpees", "flame"),
        ("Jumping Jacks", "figure.jumprope"),
        ("Mountain Climbers", "mountain.2"),
        ("High Knees", "figure.run"),
        ("Tricep Dips", "chair"),
    ];

    let exercises = entries
        .iter()
        .enumerate()
        .map(|(i, (title, icon))| Exercise {
            id: Uuid::from_u128(EXERCISE_ID_BASE + i as u128),
            title: (*title).into(),
            icon: (*icon).into(),
            duration_seconds: DEFAULT_WORK_SECONDS,
        })
        .collect();

    Catalog { exercises }
}

fn build_built_in_workouts() -> Vec<WorkoutDefinition> {
    let catalog = get_default_catalog();
    let created_at = DateTime::<Utc>::from_timestamp(BUILT_IN_CREATED_AT, 0).unwrap_or_default();
    let mut step_seq: u128 = 0;

    let mut workout = |seq: u128, name: &str, range: std::ops::Range<usize>, work: u32, rest: u32| {
        let steps = catalog.exercises[range]
            .iter()
            .map(|exercise| {
                step_seq += 1;
                WorkoutStep {
                    id: Uuid::from_u128(STEP_ID_BASE + step_seq),
                    exercise: exercise.clone(),
                    work_seconds: work,
                    rest_seconds: rest,
                }
            })
            .collect();

        WorkoutDefinition {
            id: Uuid::from_u128(WORKOUT_ID_BASE + seq),
            name: name.into(),
            steps,
            created_at,
            is_built_in: true,
        }
    };

    vec![
        workout(1, "Quick Warm-up", 0..3, 20, 5),
        workout(2, "Intensive Workout", 3..7, 45, 15),
    ]
}

impl Catalog {
    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        if self.exercises.is_empty() {
            errors.push("Catalog has no exercises".to_string());
        }

        for exercise in &self.exercises {
            if !seen.insert(exercise.id) {
                errors.push(format!("Duplicate exercise id {}", exercise.id));
            }
            if exercise.title.trim().is_empty() {
                errors.push(format!("Exercise {} has empty title", exercise.id));
            }
            if exercise.duration_seconds == 0 {
                errors.push(format!("Exercise '{}' has zero duration", exercise.title));
            }
        }

        errors
    }
}
