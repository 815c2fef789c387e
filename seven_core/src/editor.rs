//! Draft state for creating or editing a workout.
//!
//! Index-based edits that point past the end of the step list are ignored.

use crate::kv::KeyValueStore;
use crate::store::ProgressStore;
use crate::types::{
    clamp_interval, format_duration, total_seconds, Exercise, WorkoutDefinition, WorkoutStep,
};
use crate::{Error, Result};

/// Name given to a brand new workout
pub const NEW_WORKOUT_NAME: &str = "New Workout";

/// An in-progress workout edit
#[derive(Clone, Debug)]
pub struct WorkoutEditor {
    name: String,
    steps: Vec<WorkoutStep>,
    original: Option<WorkoutDefinition>,
}

impl Default for WorkoutEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkoutEditor {
    /// Start a new workout with no steps
    pub fn new() -> Self {
        Self {
            name: NEW_WORKOUT_NAME.to_string(),
            steps: Vec::new(),
            original: None,
        }
    }

    /// Start editing an existing workout
    pub fn edit(workout: &WorkoutDefinition) -> Self {
        Self {
            name: workout.name.clone(),
            steps: workout.steps.clone(),
            original: Some(workout.clone()),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.original.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[WorkoutStep] {
        &self.steps
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Append an exercise with the default 30s/10s intervals
    pub fn add_exercise(&mut self, exercise: Exercise) {
        self.steps.push(WorkoutStep::new(exercise));
    }

    pub fn remove_step(&mut self, index: usize) {
        if index < self.steps.len() {
            self.steps.remove(index);
        }
    }

    /// Move the step at `from` so that it ends up at position `to`
    pub fn move_step(&mut self, from: usize, to: usize) {
        if from >= self.steps.len() || to >= self.steps.len() {
            return;
        }
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
    }

    /// Intervals are clamped to `1..=MAX_INTERVAL_SECONDS`
    pub fn update_durations(&mut self, index: usize, work_seconds: u32, rest_seconds: u32) {
        if let Some(step) = self.steps.get_mut(index) {
            step.work_seconds = clamp_interval(work_seconds);
            step.rest_seconds = clamp_interval(rest_seconds);
        }
    }

    /// A workout needs a non-blank name and at least one step
    pub fn can_save(&self) -> bool {
        !self.name.trim().is_empty() && !self.steps.is_empty()
    }

    pub fn total_duration(&self) -> u32 {
        total_seconds(&self.steps)
    }

    pub fn formatted_duration(&self) -> String {
        format_duration(self.total_duration())
    }

    /// Produce the definition to persist
    ///
    /// Edits keep the original identity, creation time and built-in flag;
    /// new workouts get a fresh identity. Returns `None` while `can_save()` is false.
    pub fn build(&self) -> Option<WorkoutDefinition> {
        if !self.can_save() {
            return None;
        }

        let mut workout = WorkoutDefinition::new(self.name.trim());
        if let Some(original) = &self.original {
            workout.id = original.id;
            workout.created_at = original.created_at;
            workout.is_built_in = original.is_built_in;
        }
        workout.steps = self.steps.clone();
        Some(workout)
    }

    /// Build and upsert into the store
    pub fn save<S: KeyValueStore>(&self, store: &mut ProgressStore<S>) -> Result<WorkoutDefinition> {
        let workout = self.build().ok_or_else(|| {
            Error::Other("a workout needs a name and at least one exercise".into())
        })?;
        store.save_workout(&workout)?;
        Ok(workout)
    }
}
