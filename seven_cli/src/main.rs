use clap::{Parser, Subcommand};
use seven_core::*;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "seven")]
#[command(about = "Seven-minute circuit workout timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workout session (default)
    Start {
        /// Saved workout to run (id or name); random circuit if omitted
        #[arg(long)]
        workout: Option<String>,

        /// Tick without waiting a second in between
        #[arg(long)]
        fast: bool,

        /// Stop the session after this many ticks (records nothing)
        #[arg(long)]
        stop_after: Option<u32>,
    },

    /// Show streak and today's exercise time
    Status,

    /// List the built-in exercises
    Exercises,

    /// Manage saved workouts
    Workouts {
        #[command(subcommand)]
        action: WorkoutAction,
    },

    /// Show daily totals for recent days
    History {
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=3650))]
        days: u32,
    },

    /// Export the daily history as CSV
    Export {
        #[arg(long)]
        output: PathBuf,
    },

    /// Erase streak and history and restore the default workouts
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WorkoutAction {
    /// List saved workouts
    List,

    /// Show the steps of a workout
    Show { workout: String },

    /// Create a workout from exercise steps
    New {
        #[arg(long)]
        name: String,

        /// EXERCISE[:WORK[:REST]], e.g. squats:45:15 (repeatable)
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
    },

    /// Edit an existing workout
    Edit {
        workout: String,

        /// Rename the workout
        #[arg(long)]
        name: Option<String>,

        /// Append EXERCISE[:WORK[:REST]] (repeatable)
        #[arg(long = "add")]
        add: Vec<String>,

        /// Remove the step at this 1-based position (repeatable)
        #[arg(long = "remove")]
        remove: Vec<usize>,

        /// Move a step, FROM:TO (1-based)
        #[arg(long = "move")]
        moves: Vec<String>,

        /// Change intervals, N:WORK:REST (1-based)
        #[arg(long = "durations")]
        durations: Vec<String>,
    },

    /// Delete a user workout
    Delete { workout: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        seven_core::logging::init_with_level("debug");
    } else {
        seven_core::logging::init();
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Catalog("Invalid catalog".into()));
    }

    let mut store = ProgressStore::open(config.data.store_path());

    match cli.command {
        Some(Commands::Start {
            workout,
            fast,
            stop_after,
        }) => cmd_start(&mut store, &config, workout, fast, stop_after),
        Some(Commands::Status) => cmd_status(&store, &config),
        Some(Commands::Exercises) => cmd_exercises(catalog),
        Some(Commands::Workouts { action }) => cmd_workouts(&mut store, catalog, action),
        Some(Commands::History { days }) => cmd_history(&store, days),
        Some(Commands::Export { output }) => cmd_export(&store, &output),
        Some(Commands::Reset { yes }) => cmd_reset(&mut store, yes),
        None => cmd_start(&mut store, &config, None, false, None),
    }
}

fn cmd_start(
    store: &mut ProgressStore,
    config: &Config,
    workout: Option<String>,
    fast: bool,
    stop_after: Option<u32>,
) -> Result<()> {
    let mut session = match workout {
        Some(query) => {
            let definition = find_workout(store, &query)?;
            WorkoutSession::from_definition(&definition)
        }
        None => WorkoutSession::random(
            get_default_catalog(),
            &config.session,
            &mut rand::thread_rng(),
        ),
    };

    let interval = if fast {
        Duration::ZERO
    } else {
        config.timer.tick_interval()
    };

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", session.name().unwrap_or("7-MINUTE CIRCUIT"));
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  {} exercises, ~{}",
        session.exercise_count(),
        format_duration(session.total_remaining())
    );
    println!();

    // The first observation happens before any tick
    let mut observations = 0u32;
    let outcome = seven_core::run(&mut session, store, interval, |session, transition| {
        print_transition(session, transition, !fast);
        let ticks = observations;
        observations += 1;
        match stop_after {
            Some(limit) if ticks >= limit => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })?;

    println!();
    match outcome {
        SessionOutcome::Completed { recorded_seconds } => {
            println!("✓ Workout complete! Recorded {}", format_duration(recorded_seconds));
            println!("  Streak: {} day(s)", store.streak_days());
        }
        SessionOutcome::Stopped => {
            println!("Workout stopped - nothing recorded.");
        }
    }

    Ok(())
}

fn print_transition(session: &WorkoutSession, transition: &Transition, live: bool) {
    let position = format!(
        "{}/{}",
        session.current_index() + 1,
        session.exercise_count()
    );

    match (transition, session.phase()) {
        (Transition::ExerciseStarted { .. }, Phase::Working { exercise, remaining }) => {
            println!("  [{}] WORK  {} ({}s)", position, exercise.title, remaining);
        }
        (Transition::RestStarted, Phase::Resting { remaining }) => {
            println!("  [{}] REST  {}s", position, remaining);
        }
        (Transition::Countdown, phase) if live => {
            print!(
                "\r    {:>3}s left in {}, {} total   ",
                phase.remaining(),
                phase.label(),
                format_duration(session.total_remaining())
            );
            let _ = io::stdout().flush();
            if phase.remaining() == 1 {
                println!();
            }
        }
        _ => {}
    }
}

fn cmd_status(store: &ProgressStore, config: &Config) -> Result<()> {
    let summary = store.summary(chrono::Utc::now(), config.session.target_seconds);

    println!("Streak: {} day(s)", summary.streak_days);
    println!(
        "Today:  {} / {} min ({:.0}%)",
        summary.today_minutes(),
        summary.daily_goal_seconds / 60,
        summary.progress() * 100.0
    );
    if let Some(last) = store.last_workout_date() {
        println!("Last workout: {}", last.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}

fn cmd_exercises(catalog: &Catalog) -> Result<()> {
    for (i, exercise) in catalog.exercises.iter().enumerate() {
        println!("{:>2}. {:<18} {}", i + 1, exercise.title, exercise.icon);
    }
    Ok(())
}

fn cmd_workouts(store: &mut ProgressStore, catalog: &Catalog, action: WorkoutAction) -> Result<()> {
    match action {
        WorkoutAction::List => {
            for workout in store.list_workouts() {
                println!(
                    "{}  {:<24} {:>2} exercises  {}{}",
                    workout.id,
                    workout.name,
                    workout.steps.len(),
                    workout.formatted_duration(),
                    if workout.is_built_in { "  (built-in)" } else { "" }
                );
            }
        }

        WorkoutAction::Show { workout } => {
            let workout = find_workout(store, &workout)?;
            println!("{} ({})", workout.name, workout.formatted_duration());
            for (i, step) in workout.steps.iter().enumerate() {
                println!(
                    "  {:>2}. {:<18} work {:>3}s  rest {:>3}s",
                    i + 1,
                    step.exercise.title,
                    step.work_seconds,
                    step.rest_seconds
                );
            }
        }

        WorkoutAction::New { name, steps } => {
            let mut editor = WorkoutEditor::new();
            editor.set_name(name);
            for spec in &steps {
                add_step(&mut editor, catalog, spec)?;
            }
            let saved = editor.save(store)?;
            println!("✓ Saved '{}' ({})", saved.name, saved.id);
        }

        WorkoutAction::Edit {
            workout,
            name,
            add,
            remove,
            moves,
            durations,
        } => {
            let original = find_workout(store, &workout)?;
            let mut editor = WorkoutEditor::edit(&original);

            if let Some(name) = name {
                editor.set_name(name);
            }
            for spec in &add {
                add_step(&mut editor, catalog, spec)?;
            }
            // Highest position first so earlier removals don't shift later ones
            let mut remove = remove;
            remove.sort_unstable_by(|a, b| b.cmp(a));
            for position in remove {
                if let Some(index) = position.checked_sub(1) {
                    editor.remove_step(index);
                }
            }
            for spec in &moves {
                let (from, to) = parse_move(spec)?;
                editor.move_step(from, to);
            }
            for spec in &durations {
                let (index, work, rest) = parse_durations(spec)?;
                editor.update_durations(index, work, rest);
            }

            let saved = editor.save(store)?;
            println!(
                "✓ Updated '{}' ({} exercises, {})",
                saved.name,
                saved.steps.len(),
                saved.formatted_duration()
            );
        }

        WorkoutAction::Delete { workout } => {
            let target = find_workout(store, &workout)?;
            match store.delete_workout(&target.id)? {
                DeleteOutcome::Deleted => println!("✓ Deleted '{}'", target.name),
                DeleteOutcome::NotFound => println!("No workout '{}' to delete", workout),
                DeleteOutcome::Protected => {
                    println!("'{}' is a built-in workout and cannot be deleted", target.name)
                }
            }
        }
    }

    Ok(())
}

fn cmd_history(store: &ProgressStore, days: u32) -> Result<()> {
    for (day, seconds) in store.recent_days(days, chrono::Utc::now()) {
        println!("{}  {:>5}s  {}", day, seconds, format_duration(seconds));
    }
    Ok(())
}

fn cmd_export(store: &ProgressStore, output: &std::path::Path) -> Result<()> {
    let count = seven_core::export::export_history_csv(&store.history(), output)?;
    println!("✓ Exported {} day(s) to {}", count, output.display());
    Ok(())
}

fn cmd_reset(store: &mut ProgressStore, yes: bool) -> Result<()> {
    if !yes {
        println!("This erases your streak, history and custom workouts.");
        println!("Run again with --yes to confirm.");
        return Ok(());
    }
    store.reset_all()?;
    println!("✓ All data reset");
    Ok(())
}

/// Resolve a workout by id or case-insensitive name
fn find_workout(store: &ProgressStore, query: &str) -> Result<WorkoutDefinition> {
    let workouts = store.list_workouts();
    let found = match uuid::Uuid::parse_str(query) {
        Ok(id) => workouts.into_iter().find(|w| w.id == id),
        Err(_) => workouts
            .into_iter()
            .find(|w| w.name.eq_ignore_ascii_case(query.trim())),
    };
    found.ok_or_else(|| Error::Other(format!("Unknown workout: {}", query)))
}

/// Parse `EXERCISE[:WORK[:REST]]` and append it to the editor
fn add_step(editor: &mut WorkoutEditor, catalog: &Catalog, spec: &str) -> Result<()> {
    let mut parts = spec.split(':');
    let title = parts.next().unwrap_or_default();
    let exercise = catalog
        .find_by_title(title)
        .ok_or_else(|| Error::Other(format!("Unknown exercise: {}", title)))?;

    editor.add_exercise(exercise.clone());
    let index = editor.steps().len() - 1;

    let work = parts.next().map(parse_seconds).transpose()?;
    let rest = parts.next().map(parse_seconds).transpose()?;
    if work.is_some() || rest.is_some() {
        let step = &editor.steps()[index];
        let work = work.unwrap_or(step.work_seconds);
        let rest = rest.unwrap_or(step.rest_seconds);
        editor.update_durations(index, work, rest);
    }
    Ok(())
}

fn parse_seconds(value: &str) -> Result<u32> {
    let seconds = value
        .trim()
        .parse::<u32>()
        .map_err(|e| Error::Other(format!("Invalid seconds '{}': {}", value, e)))?;
    if seconds == 0 || seconds > MAX_INTERVAL_SECONDS {
        return Err(Error::Other(format!(
            "Invalid seconds '{}': must be between 1 and {}",
            value, MAX_INTERVAL_SECONDS
        )));
    }
    Ok(seconds)
}

/// `FROM:TO`, 1-based, into 0-based indices
fn parse_move(spec: &str) -> Result<(usize, usize)> {
    let (from, to) = spec
        .split_once(':')
        .ok_or_else(|| Error::Other(format!("Expected FROM:TO, got '{}'", spec)))?;
    Ok((parse_position(from)?, parse_position(to)?))
}

/// `N:WORK:REST`, N 1-based
fn parse_durations(spec: &str) -> Result<(usize, u32, u32)> {
    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [n, work, rest] => Ok((parse_position(n)?, parse_seconds(work)?, parse_seconds(rest)?)),
        _ => Err(Error::Other(format!("Expected N:WORK:REST, got '{}'", spec))),
    }
}

fn parse_position(value: &str) -> Result<usize> {
    let position: usize = value
        .trim()
        .parse()
        .map_err(|e| Error::Other(format!("Invalid position '{}': {}", value, e)))?;
    // Position 0 maps past the end, which the editor ignores
    Ok(position.checked_sub(1).unwrap_or(usize::MAX))
}
