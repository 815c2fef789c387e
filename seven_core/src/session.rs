//! Workout session state machine.
//!
//! The session does not own a timer. The caller invokes `tick()` once per
//! second (see [`run`]) and the session moves through its phases:
//!
//! ```text
//! Idle -> Working -> Resting -> Working -> ... -> Resting -> Finished
//!   \________________ stop() from anywhere ________________/
//! ```
//!
//! Only the natural end of the last rest records progress. `stop()` lands in
//! the same `Finished` phase without recording, and ticking a finished
//! session does nothing, so a session records at most once.

use crate::config::SessionConfig;
use crate::types::{clamp_interval, Catalog, Exercise, Phase, WorkoutDefinition};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::ControlFlow;
use std::time::Duration;

/// Receives the completed-session notification
///
/// Implemented by [`crate::store::ProgressStore`]; tests use a counting fake.
pub trait ProgressRecorder {
    fn record_workout(&mut self, total_seconds: u32, at: DateTime<Utc>) -> Result<()>;
}

/// One exercise of a session with its work/rest intervals
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedStep {
    pub exercise: Exercise,
    pub work_seconds: u32,
    pub rest_seconds: u32,
}

/// What a call to `tick()` did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Idle or finished: nothing happened
    Unchanged,
    /// Same phase, one second less
    Countdown,
    /// Work interval ended, rest began
    RestStarted,
    /// Rest ended, the exercise at `index` began
    ExerciseStarted { index: usize },
    /// Last rest ended; `recorded_seconds` were credited to the store
    Finished { recorded_seconds: u32 },
}

/// How a driven session ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { recorded_seconds: u32 },
    Stopped,
}

/// A single run through a list of exercises
#[derive(Clone, Debug)]
pub struct WorkoutSession {
    name: Option<String>,
    plan: Vec<PlannedStep>,
    phase: Phase,
    index: usize,
    /// Display-only estimate shown before the first tick
    display_target: u32,
    total_remaining: u32,
    /// Credited to the store on natural completion
    record_seconds: u32,
    recorded: bool,
}

impl WorkoutSession {
    /// Create a session over an explicit plan
    ///
    /// `record_seconds` is what a natural completion credits to the daily
    /// history; it is also the initial total-remaining estimate.
    pub fn new(plan: Vec<PlannedStep>, record_seconds: u32) -> Self {
        Self {
            name: None,
            plan,
            phase: Phase::Idle,
            index: 0,
            display_target: record_seconds,
            total_remaining: record_seconds,
            record_seconds,
            recorded: false,
        }
    }

    /// The classic circuit: random exercises, fixed intervals
    ///
    /// Draws up to `exercise_count` catalog entries without replacement.
    /// Every step uses the configured work/rest seconds; the catalog's own
    /// `duration_seconds` is ignored. Completion credits `target_seconds`
    /// regardless of how many exercises were drawn.
    pub fn random<G: Rng + ?Sized>(catalog: &Catalog, config: &SessionConfig, rng: &mut G) -> Self {
        let mut exercises: Vec<Exercise> = catalog
            .exercises
            .choose_multiple(rng, config.exercise_count)
            .cloned()
            .collect();
        exercises.shuffle(rng);

        tracing::debug!(
            "Drew {} of {} catalog exercises",
            exercises.len(),
            catalog.len()
        );

        let plan = exercises
            .into_iter()
            .map(|exercise| PlannedStep {
                exercise,
                work_seconds: config.work_seconds,
                rest_seconds: config.rest_seconds,
            })
            .collect();

        Self::new(plan, config.target_seconds)
    }

    /// Run a saved workout with its own per-step intervals
    ///
    /// Completion credits the sum of its intervals, each clamped to
    /// `1..=MAX_INTERVAL_SECONDS`.
    pub fn from_definition(definition: &WorkoutDefinition) -> Self {
        let plan = definition
            .steps
            .iter()
            .map(|step| PlannedStep {
                exercise: step.exercise.clone(),
                work_seconds: clamp_interval(step.work_seconds),
                rest_seconds: clamp_interval(step.rest_seconds),
            })
            .collect::<Vec<_>>();

        let record_seconds = plan.iter().fold(0u32, |total, step| {
            total.saturating_add(step.work_seconds.saturating_add(step.rest_seconds))
        });
        let mut session = Self::new(plan, record_seconds);
        session.name = Some(definition.name.clone());
        session
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn plan(&self) -> &[PlannedStep] {
        &self.plan
    }

    pub fn exercise_count(&self) -> usize {
        self.plan.len()
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_step(&self) -> Option<&PlannedStep> {
        self.plan.get(self.index)
    }

    /// Estimated seconds left in the whole session
    pub fn total_remaining(&self) -> u32 {
        self.total_remaining
    }

    pub fn record_seconds(&self) -> u32 {
        self.record_seconds
    }

    /// True once a natural completion has been credited
    pub fn is_recorded(&self) -> bool {
        self.recorded
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the first exercise
    ///
    /// Only valid from `Idle` with a non-empty plan; returns whether the
    /// session started.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        let Some(first) = self.plan.first() else {
            tracing::warn!("Refusing to start a session with no exercises");
            return false;
        };

        self.index = 0;
        self.phase = Phase::Working {
            exercise: first.exercise.clone(),
            remaining: first.work_seconds,
        };
        self.recalc_total_remaining();
        tracing::info!("Session started with {} exercises", self.plan.len());
        true
    }

    /// Abort the session without recording progress
    pub fn stop(&mut self) {
        if self.phase != Phase::Finished {
            tracing::info!(
                "Session stopped at exercise {}/{}",
                self.index + 1,
                self.plan.len()
            );
        }
        self.phase = Phase::Finished;
        self.total_remaining = 0;
    }

    /// Advance one second using the current wall-clock time for recording
    pub fn tick<R: ProgressRecorder + ?Sized>(&mut self, recorder: &mut R) -> Result<Transition> {
        self.tick_at(recorder, Utc::now())
    }

    /// Advance one second; `now` is the completion time if this tick finishes
    pub fn tick_at<R: ProgressRecorder + ?Sized>(
        &mut self,
        recorder: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let transition = match self.phase.clone() {
            Phase::Idle | Phase::Finished => Transition::Unchanged,
            Phase::Working { exercise, remaining } => {
                if remaining > 1 {
                    self.phase = Phase::Working {
                        exercise,
                        remaining: remaining - 1,
                    };
                    Transition::Countdown
                } else {
                    match self.plan.get(self.index) {
                        Some(step) => {
                            self.phase = Phase::Resting {
                                remaining: step.rest_seconds,
                            };
                            Transition::RestStarted
                        }
                        None => Transition::Unchanged,
                    }
                }
            }
            Phase::Resting { remaining } => {
                if remaining > 1 {
                    self.phase = Phase::Resting {
                        remaining: remaining - 1,
                    };
                    Transition::Countdown
                } else {
                    self.advance_or_finish()
                }
            }
        };

        self.recalc_total_remaining();

        if let Transition::Finished { recorded_seconds } = transition {
            tracing::info!("Session complete, recording {}s", recorded_seconds);
            recorder.record_workout(recorded_seconds, now)?;
        }

        Ok(transition)
    }

    fn advance_or_finish(&mut self) -> Transition {
        let next = self.index + 1;
        if let Some(step) = self.plan.get(next) {
            self.index = next;
            self.phase = Phase::Working {
                exercise: step.exercise.clone(),
                remaining: step.work_seconds,
            };
            tracing::debug!("Advanced to exercise {}/{}", next + 1, self.plan.len());
            return Transition::ExerciseStarted { index: next };
        }

        self.phase = Phase::Finished;
        if self.recorded {
            return Transition::Unchanged;
        }
        self.recorded = true;
        Transition::Finished {
            recorded_seconds: self.record_seconds,
        }
    }

    fn recalc_total_remaining(&mut self) {
        // Full work+rest of every exercise after the current one
        let after_current = |index: usize| -> u32 {
            self.plan
                .iter()
                .skip(index + 1)
                .fold(0u32, |total, s| {
                    total.saturating_add(s.work_seconds.saturating_add(s.rest_seconds))
                })
        };

        self.total_remaining = match &self.phase {
            Phase::Idle => self.display_target,
            Phase::Finished => 0,
            Phase::Working { remaining, .. } => {
                let rest = self.plan.get(self.index).map_or(0, |s| s.rest_seconds);
                after_current(self.index)
                    .saturating_add(rest)
                    .saturating_add(*remaining)
            }
            Phase::Resting { remaining } => after_current(self.index).saturating_add(*remaining),
        };
    }
}

/// Drive a session to completion, one tick per `interval`
///
/// Starts the session, then sleeps and ticks until it finishes. `observer`
/// sees the session after the start and after every tick; returning
/// `ControlFlow::Break` stops the session without recording. A zero
/// interval ticks back-to-back without sleeping.
pub fn run<R, F>(
    session: &mut WorkoutSession,
    recorder: &mut R,
    interval: Duration,
    mut observer: F,
) -> Result<SessionOutcome>
where
    R: ProgressRecorder + ?Sized,
    F: FnMut(&WorkoutSession, &Transition) -> ControlFlow<()>,
{
    if !session.start() {
        return Err(Error::Other(
            "session cannot start: it has no exercises or already ran".into(),
        ));
    }

    if observer(session, &Transition::ExerciseStarted { index: 0 }).is_break() {
        session.stop();
        return Ok(SessionOutcome::Stopped);
    }

    loop {
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }

        let transition = session.tick(recorder)?;
        let flow = observer(session, &transition);

        match transition {
            Transition::Finished { recorded_seconds } => {
                return Ok(SessionOutcome::Completed { recorded_seconds });
            }
            _ if *session.phase() == Phase::Finished => return Ok(SessionOutcome::Stopped),
            _ => {}
        }

        if flow.is_break() {
            session.stop();
            return Ok(SessionOutcome::Stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{build_default_catalog, built_in_workouts};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    #[derive(Default)]
    struct CountingRecorder {
        calls: Vec<(u32, DateTime<Utc>)>,
    }

    impl ProgressRecorder for CountingRecorder {
        fn record_workout(&mut self, total_seconds: u32, at: DateTime<Utc>) -> Result<()> {
            self.calls.push((total_seconds, at));
            Ok(())
        }
    }

    struct FailingRecorder;

    impl ProgressRecorder for FailingRecorder {
        fn record_workout(&mut self, _: u32, _: DateTime<Utc>) -> Result<()> {
            Err(Error::Store("disk full".into()))
        }
    }

    fn exercise(title: &str) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            title: title.into(),
            icon: "figure.walk".into(),
            duration_seconds: 99,
        }
    }

    fn step(e: &Exercise) -> PlannedStep {
        PlannedStep {
            exercise: e.clone(),
            work_seconds: 30,
            rest_seconds: 10,
        }
    }

    fn two_exercise_session() -> (WorkoutSession, Exercise, Exercise) {
        let a = exercise("A");
        let b = exercise("B");
        let session = WorkoutSession::new(vec![step(&a), step(&b)], 420);
        (session, a, b)
    }

    fn tick_n(session: &mut WorkoutSession, recorder: &mut CountingRecorder, n: usize) {
        for _ in 0..n {
            session.tick(recorder).unwrap();
        }
    }

    #[test]
    fn test_start_from_idle_enters_first_work() {
        let (mut session, a, _) = two_exercise_session();
        assert_eq!(*session.phase(), Phase::Idle);
        assert_eq!(session.total_remaining(), 420);

        assert!(session.start());
        assert_eq!(
            *session.phase(),
            Phase::Working {
                exercise: a,
                remaining: 30
            }
        );
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_start_is_noop_when_not_idle() {
        let (mut session, _, _) = two_exercise_session();
        let mut recorder = CountingRecorder::default();
        session.start();
        tick_n(&mut session, &mut recorder, 5);
        let before = session.phase().clone();

        assert!(!session.start());
        assert_eq!(*session.phase(), before);

        session.stop();
        assert!(!session.start());
        assert_eq!(*session.phase(), Phase::Finished);
    }

    #[test]
    fn test_start_empty_plan_stays_idle() {
        let mut session = WorkoutSession::new(vec![], 420);
        assert!(!session.start());
        assert_eq!(*session.phase(), Phase::Idle);
    }

    #[test]
    fn test_tick_is_noop_when_idle() {
        let (mut session, _, _) = two_exercise_session();
        let mut recorder = CountingRecorder::default();
        assert_eq!(session.tick(&mut recorder).unwrap(), Transition::Unchanged);
        assert_eq!(*session.phase(), Phase::Idle);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_work_one_second_left_goes_to_full_rest() {
        let (mut session, _, _) = two_exercise_session();
        let mut recorder = CountingRecorder::default();
        session.start();
        tick_n(&mut session, &mut recorder, 29);
        assert_eq!(session.phase().remaining(), 1);

        assert_eq!(
            session.tick(&mut recorder).unwrap(),
            Transition::RestStarted
        );
        assert_eq!(*session.phase(), Phase::Resting { remaining: 10 });
    }

    #[test]
    fn test_two_exercise_walkthrough_records_once() {
        let (mut session, a, b) = two_exercise_session();
        let mut recorder = CountingRecorder::default();

        session.start();
        tick_n(&mut session, &mut recorder, 29);
        assert_eq!(
            *session.phase(),
            Phase::Working {
                exercise: a,
                remaining: 1
            }
        );

        session.tick(&mut recorder).unwrap();
        assert_eq!(*session.phase(), Phase::Resting { remaining: 10 });

        tick_n(&mut session, &mut recorder, 9);
        assert_eq!(*session.phase(), Phase::Resting { remaining: 1 });

        assert_eq!(
            session.tick(&mut recorder).unwrap(),
            Transition::ExerciseStarted { index: 1 }
        );
        assert_eq!(
            *session.phase(),
            Phase::Working {
                exercise: b,
                remaining: 30
            }
        );
        assert_eq!(session.current_index(), 1);

        // 30 work + 10 rest for B, the last tick finishes
        tick_n(&mut session, &mut recorder, 39);
        assert_eq!(*session.phase(), Phase::Resting { remaining: 1 });
        assert!(recorder.calls.is_empty());

        assert_eq!(
            session.tick(&mut recorder).unwrap(),
            Transition::Finished {
                recorded_seconds: 420
            }
        );
        assert_eq!(*session.phase(), Phase::Finished);
        assert_eq!(recorder.calls.len(), 1);
        assert_eq!(recorder.calls[0].0, 420);

        // Further ticks never record again
        tick_n(&mut session, &mut recorder, 5);
        assert_eq!(recorder.calls.len(), 1);
        assert!(session.is_recorded());
    }

    #[test]
    fn test_stop_never_records() {
        let (mut session, _, _) = two_exercise_session();
        let mut recorder = CountingRecorder::default();
        session.start();
        tick_n(&mut session, &mut recorder, 75);

        session.stop();
        assert_eq!(*session.phase(), Phase::Finished);
        assert_eq!(session.total_remaining(), 0);

        tick_n(&mut session, &mut recorder, 100);
        assert!(recorder.calls.is_empty());
        assert!(!session.is_recorded());
    }

    #[test]
    fn test_stop_from_idle_finishes() {
        let (mut session, _, _) = two_exercise_session();
        session.stop();
        assert_eq!(*session.phase(), Phase::Finished);
    }

    #[test]
    fn test_total_remaining_tracks_phases() {
        let (mut session, _, _) = two_exercise_session();
        let mut recorder = CountingRecorder::default();

        session.start();
        // Working(A,30): B's 40 + A's rest 10 + 30
        assert_eq!(session.total_remaining(), 80);

        session.tick(&mut recorder).unwrap();
        assert_eq!(session.total_remaining(), 79);

        tick_n(&mut session, &mut recorder, 29);
        // Resting(10): B's 40 + 10
        assert_eq!(*session.phase(), Phase::Resting { remaining: 10 });
        assert_eq!(session.total_remaining(), 50);

        tick_n(&mut session, &mut recorder, 10);
        // Working(B,30): 0 + 10 + 30
        assert_eq!(session.total_remaining(), 40);

        tick_n(&mut session, &mut recorder, 40);
        assert_eq!(session.total_remaining(), 0);
    }

    #[test]
    fn test_completion_uses_supplied_time() {
        let a = exercise("A");
        let plan = vec![PlannedStep {
            exercise: a,
            work_seconds: 1,
            rest_seconds: 1,
        }];
        let mut session = WorkoutSession::new(plan, 420);
        let mut recorder = CountingRecorder::default();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        session.start();
        assert_eq!(
            session.tick_at(&mut recorder, at).unwrap(),
            Transition::RestStarted
        );
        session.tick_at(&mut recorder, at).unwrap();
        assert_eq!(recorder.calls, vec![(420, at)]);
    }

    #[test]
    fn test_recorder_failure_does_not_allow_rerecord() {
        let a = exercise("A");
        let plan = vec![PlannedStep {
            exercise: a,
            work_seconds: 1,
            rest_seconds: 1,
        }];
        let mut session = WorkoutSession::new(plan, 420);
        session.start();
        session.tick(&mut FailingRecorder).unwrap();

        assert!(session.tick(&mut FailingRecorder).is_err());
        assert_eq!(*session.phase(), Phase::Finished);

        let mut recorder = CountingRecorder::default();
        assert_eq!(session.tick(&mut recorder).unwrap(), Transition::Unchanged);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_random_session_uses_fixed_intervals() {
        let catalog = build_default_catalog();
        let config = SessionConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        let session = WorkoutSession::random(&catalog, &config, &mut rng);

        // 12 requested, only 10 in the catalog
        assert_eq!(session.exercise_count(), 10);
        assert_eq!(session.total_remaining(), 420);
        assert_eq!(session.record_seconds(), 420);
        assert!(session
            .plan()
            .iter()
            .all(|s| s.work_seconds == 30 && s.rest_seconds == 10));

        let mut ids: Vec<_> = session.plan().iter().map(|s| s.exercise.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10, "exercises drawn without replacement");
    }

    #[test]
    fn test_random_session_respects_smaller_count() {
        let catalog = build_default_catalog();
        let config = SessionConfig {
            exercise_count: 3,
            ..SessionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);

        let session = WorkoutSession::random(&catalog, &config, &mut rng);
        assert_eq!(session.exercise_count(), 3);
    }

    #[test]
    fn test_from_definition_uses_step_durations() {
        let warm_up = &built_in_workouts()[0];
        let mut session = WorkoutSession::from_definition(warm_up);

        assert_eq!(session.name(), Some("Quick Warm-up"));
        assert_eq!(session.record_seconds(), 75);
        session.start();
        assert_eq!(session.phase().remaining(), 20);

        let mut recorder = CountingRecorder::default();
        tick_n(&mut session, &mut recorder, 20);
        assert_eq!(*session.phase(), Phase::Resting { remaining: 5 });
    }

    #[test]
    fn test_from_definition_clamps_stored_intervals() {
        let catalog = build_default_catalog();
        let mut def = WorkoutDefinition::new("Hand edited");
        def.steps.push(crate::types::WorkoutStep::with_durations(
            catalog.exercises[0].clone(),
            u32::MAX,
            0,
        ));

        let mut session = WorkoutSession::from_definition(&def);
        assert_eq!(session.plan()[0].work_seconds, crate::types::MAX_INTERVAL_SECONDS);
        assert_eq!(session.plan()[0].rest_seconds, 1);
        assert_eq!(session.record_seconds(), crate::types::MAX_INTERVAL_SECONDS + 1);

        assert!(session.start());
        assert_eq!(session.total_remaining(), crate::types::MAX_INTERVAL_SECONDS + 1);
    }

    #[test]
    fn test_run_to_completion() {
        crate::logging::init_test();
        let (mut session, _, _) = two_exercise_session();
        let mut recorder = CountingRecorder::default();
        let mut observed = 0;

        let outcome = run(&mut session, &mut recorder, Duration::ZERO, |_, _| {
            observed += 1;
            ControlFlow::Continue(())
        })
        .unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::Completed {
                recorded_seconds: 420
            }
        );
        // Initial start plus one observation per second of the 80s circuit
        assert_eq!(observed, 81);
        assert_eq!(recorder.calls.len(), 1);
    }

    #[test]
    fn test_run_observer_can_abort() {
        let (mut session, _, _) = two_exercise_session();
        let mut recorder = CountingRecorder::default();
        let mut ticks = 0;

        let outcome = run(&mut session, &mut recorder, Duration::ZERO, |_, _| {
            ticks += 1;
            if ticks > 45 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

        assert_eq!(outcome, SessionOutcome::Stopped);
        assert_eq!(*session.phase(), Phase::Finished);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_run_rejects_empty_session() {
        let mut session = WorkoutSession::new(vec![], 420);
        let mut recorder = CountingRecorder::default();
        let result = run(&mut session, &mut recorder, Duration::ZERO, |_, _| {
            ControlFlow::Continue(())
        });
        assert!(result.is_err());
    }
}
