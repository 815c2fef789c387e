#![forbid(unsafe_code)]

//! Core domain model and logic for the Seven workout timer.
//!
//! This crate provides:
//! - Domain types (exercises, workouts, session phases)
//! - The built-in exercise catalog and default workouts
//! - The tick-driven session state machine
//! - Local persistence of streak, daily history and saved workouts
//! - The workout editor and CSV history export

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod kv;
pub mod session;
pub mod store;
pub mod editor;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{built_in_workouts, get_default_catalog};
pub use config::{Config, SessionConfig};
pub use kv::{Entries, JsonFileStore, KeyValueStore, MemoryStore};
pub use session::{run, ProgressRecorder, SessionOutcome, Transition, WorkoutSession};
pub use store::{DeleteOutcome, ProgressStore, Summary};
pub use editor::WorkoutEditor;
