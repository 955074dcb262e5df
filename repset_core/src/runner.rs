//! Session runner.
//!
//! Drives one user through one workout template, exercise by exercise and
//! set by set, and produces a [`WorkoutLog`] when the user commits.
//!
//! ```text
//!            complete_set (rest > 0)
//!   Active ─────────────────────────▶ Resting
//!     ▲  ◀──────────────────────────────┘  tick (expired) / skip_rest / next_exercise
//!     │
//!     │ continue_workout     last exercise done / request_finish
//!     └──────────────── ReviewPending ──────────────▶ Committed
//!                                       commit
//! ```
//!
//! The runner never reads the clock itself; every time-dependent operation
//! takes `now`. It holds no threads or callbacks, so dropping it (or just
//! not ticking it any more) is all the teardown a front end needs.

use crate::store::TemplateStore;
use crate::timer::RestTimer;
use crate::wal::LogSink;
use crate::{Error, Result, TemplateExercise, WorkoutLog, WorkoutTemplate};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Default amount added by [`SessionRunner::extend_rest`]
pub const DEFAULT_REST_EXTENSION_SECONDS: u32 = 15;

/// Observable phase of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Active,
    Resting,
    ReviewPending,
    Committed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Active => "active",
            Phase::Resting => "resting",
            Phase::ReviewPending => "pending review",
            Phase::Committed => "committed",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug)]
enum RunnerState {
    Active,
    Resting(RestTimer),
    ReviewPending,
    Committed(WorkoutLog),
}

impl RunnerState {
    fn phase(&self) -> Phase {
        match self {
            RunnerState::Active => Phase::Active,
            RunnerState::Resting(_) => Phase::Resting,
            RunnerState::ReviewPending => Phase::ReviewPending,
            RunnerState::Committed(_) => Phase::Committed,
        }
    }
}

/// Read-only picture of a running session for display
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub template_name: String,
    pub phase: Phase,
    pub exercise_index: usize,
    pub exercise_count: usize,
    pub entry: TemplateExercise,
    pub current_set: u32,
    pub total_sets: u32,
    pub rest_remaining: Option<u32>,
    pub completed_count: usize,
    pub elapsed_minutes: u32,
}

/// In-memory state machine for one workout session
#[derive(Clone, Debug)]
pub struct SessionRunner {
    user_id: String,
    template_id: Uuid,
    template_name: String,
    exercises: Vec<TemplateExercise>,
    current_index: usize,
    current_set: u32,
    completed: Vec<Uuid>,
    state: RunnerState,
    started_at: DateTime<Utc>,
    rest_extension_seconds: u32,
}

impl SessionRunner {
    /// Begin a session on `template` for `user_id`.
    ///
    /// A template without exercises is refused with [`Error::EmptyWorkout`].
    pub fn start(
        user_id: impl Into<String>,
        template: &WorkoutTemplate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(Error::Validation("user id must not be empty".into()));
        }
        let exercises = template.ordered_exercises();
        if exercises.is_empty() {
            return Err(Error::EmptyWorkout(template.id));
        }

        tracing::info!(
            "Starting session of '{}' ({} exercises) for {}",
            template.name,
            exercises.len(),
            user_id
        );

        Ok(Self {
            user_id,
            template_id: template.id,
            template_name: template.name.clone(),
            exercises,
            current_index: 0,
            current_set: 1,
            completed: Vec::new(),
            state: RunnerState::Active,
            started_at: now,
            rest_extension_seconds: DEFAULT_REST_EXTENSION_SECONDS,
        })
    }

    /// Load a template from `store` and begin a session on it.
    ///
    /// Another owner's private template is reported as not found.
    pub fn start_from_store(
        store: &dyn TemplateStore,
        template_id: Uuid,
        user_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let template = store
            .load_template(template_id)?
            .filter(|t| t.is_public || t.owner_id == user_id)
            .ok_or_else(|| Error::WorkoutNotFound(template_id.to_string()))?;
        Self::start(user_id, &template, now)
    }

    /// Use a different increment for [`SessionRunner::extend_rest`]
    pub fn with_rest_extension(mut self, seconds: u32) -> Self {
        self.rest_extension_seconds = seconds.max(1);
        self
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn template_id(&self) -> Uuid {
        self.template_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn exercises(&self) -> &[TemplateExercise] {
        &self.exercises
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_exercise(&self) -> &TemplateExercise {
        &self.exercises[self.current_index]
    }

    /// 1-based set currently being performed
    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    /// Template exercise ids marked complete, in completion order
    pub fn completed_ids(&self) -> &[Uuid] {
        &self.completed
    }

    pub fn is_completed(&self, entry_id: Uuid) -> bool {
        self.completed.contains(&entry_id)
    }

    /// Phase as of `now`: a rest whose end has passed counts as over,
    /// whether or not a tick has arrived yet
    pub fn phase_at(&self, now: DateTime<Utc>) -> Phase {
        match &self.state {
            RunnerState::Resting(timer) if timer.is_expired(now) => Phase::Active,
            other => other.phase(),
        }
    }

    /// Seconds of rest left at `now`; `None` once the rest is over
    pub fn rest_remaining(&self, now: DateTime<Utc>) -> Option<u32> {
        match &self.state {
            RunnerState::Resting(timer) if !timer.is_expired(now) => {
                Some(timer.remaining_seconds(now))
            }
            _ => None,
        }
    }

    /// The committed log, once the session is over
    pub fn log(&self) -> Option<&WorkoutLog> {
        match &self.state {
            RunnerState::Committed(log) => Some(log),
            _ => None,
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionView {
        let entry = self.current_exercise().clone();
        SessionView {
            template_name: self.template_name.clone(),
            phase: self.phase_at(now),
            exercise_index: self.current_index,
            exercise_count: self.exercises.len(),
            total_sets: entry.effective_sets(),
            entry,
            current_set: self.current_set,
            rest_remaining: self.rest_remaining(now),
            completed_count: self.completed.len(),
            elapsed_minutes: elapsed_minutes(self.started_at, now),
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Finish the current set.
    ///
    /// Before the last set this moves to the next set, resting first when
    /// the entry prescribes rest. After the last set the entry is marked
    /// complete and the session advances.
    pub fn complete_set(&mut self, now: DateTime<Utc>) -> Result<Phase> {
        self.tick(now);
        self.require(Phase::Active, "complete a set")?;

        let entry = &self.exercises[self.current_index];
        let total_sets = entry.effective_sets();
        let rest = entry.effective_rest();
        let entry_id = entry.id;

        if self.current_set < total_sets {
            self.current_set += 1;
            if rest > 0 {
                self.state = RunnerState::Resting(RestTimer::start(rest, now));
            }
            tracing::debug!(
                "Set done, now on set {}/{} of exercise {}",
                self.current_set,
                total_sets,
                self.current_index + 1
            );
            return Ok(self.phase());
        }

        if !self.completed.contains(&entry_id) {
            self.completed.push(entry_id);
        }
        tracing::debug!("Exercise {} completed", self.current_index + 1);
        self.advance();
        Ok(self.phase())
    }

    /// Driven by the front end's timer; returns to `Active` once the rest is over
    pub fn tick(&mut self, now: DateTime<Utc>) -> Phase {
        if let RunnerState::Resting(timer) = &self.state {
            if timer.is_expired(now) {
                tracing::debug!("Rest finished");
                self.state = RunnerState::Active;
            }
        }
        self.phase()
    }

    /// Add the rest extension to the running countdown; returns seconds left
    pub fn extend_rest(&mut self, now: DateTime<Utc>) -> Result<u32> {
        self.tick(now);
        let extension = self.rest_extension_seconds;
        match &mut self.state {
            RunnerState::Resting(timer) => {
                timer.extend(extension);
                Ok(timer.remaining_seconds(now))
            }
            other => Err(Error::InvalidTransition {
                action: "extend rest",
                phase: other.phase().to_string(),
            }),
        }
    }

    /// Drop the countdown and go straight back to work
    pub fn skip_rest(&mut self) -> Result<Phase> {
        self.require(Phase::Resting, "skip rest")?;
        self.state = RunnerState::Active;
        Ok(self.phase())
    }

    /// Teardown: stop any running countdown, leaving everything else as is
    pub fn cancel(&mut self) -> Phase {
        if let RunnerState::Resting(_) = self.state {
            tracing::debug!("Rest countdown cancelled");
            self.state = RunnerState::Active;
        }
        self.phase()
    }

    /// Move to the next exercise, or to review after the last one
    pub fn next_exercise(&mut self) -> Result<Phase> {
        match self.phase() {
            Phase::Active | Phase::Resting => {
                self.advance();
                Ok(self.phase())
            }
            other => Err(Error::InvalidTransition {
                action: "move to the next exercise",
                phase: other.to_string(),
            }),
        }
    }

    /// Go back one exercise; no-op on the first one
    pub fn previous_exercise(&mut self, now: DateTime<Utc>) -> Result<Phase> {
        self.tick(now);
        self.require(Phase::Active, "go back an exercise")?;
        if self.current_index > 0 {
            self.current_index -= 1;
            self.current_set = 1;
        }
        Ok(self.phase())
    }

    /// Advance without marking the current exercise complete
    pub fn skip_exercise(&mut self, now: DateTime<Utc>) -> Result<Phase> {
        self.tick(now);
        self.require(Phase::Active, "skip an exercise")?;
        tracing::debug!("Exercise {} skipped", self.current_index + 1);
        self.advance();
        Ok(self.phase())
    }

    /// End early: go to review regardless of what is left
    pub fn request_finish(&mut self) -> Result<Phase> {
        if let RunnerState::Committed(_) = self.state {
            return Err(Error::InvalidTransition {
                action: "finish",
                phase: Phase::Committed.to_string(),
            });
        }
        self.state = RunnerState::ReviewPending;
        Ok(self.phase())
    }

    /// Leave review without committing and keep training
    pub fn continue_workout(&mut self) -> Result<Phase> {
        self.require(Phase::ReviewPending, "continue the workout")?;
        self.state = RunnerState::Active;
        Ok(self.phase())
    }

    /// Write the session log through `sink` and close the session.
    ///
    /// The rating is checked before anything else happens. If the sink
    /// fails the session stays in review with everything intact, so the
    /// same commit can be retried.
    pub fn commit(
        &mut self,
        rating: u8,
        notes: &str,
        now: DateTime<Utc>,
        sink: &mut dyn LogSink,
    ) -> Result<WorkoutLog> {
        self.require(Phase::ReviewPending, "commit")?;
        if !(1..=5).contains(&rating) {
            return Err(Error::Validation(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let log = WorkoutLog {
            id: Uuid::new_v4(),
            user_id: self.user_id.clone(),
            template_id: self.template_id,
            template_name: self.template_name.clone(),
            session_date: self.started_at.date_naive(),
            started_at: self.started_at,
            finished_at: now,
            duration_minutes: elapsed_minutes(self.started_at, now),
            rating,
            notes: notes.trim().to_string(),
            completed_exercise_ids: self.completed.clone(),
        };

        sink.append(&log).map_err(|e| {
            tracing::warn!("Failed to write workout log {}: {}", log.id, e);
            Error::Persistence(e.to_string())
        })?;

        tracing::info!(
            "Committed session of '{}' for {}: {} of {} exercises, {} min",
            self.template_name,
            self.user_id,
            log.completed_exercise_ids.len(),
            self.exercises.len(),
            log.duration_minutes
        );

        self.state = RunnerState::Committed(log.clone());
        Ok(log)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require(&self, expected: Phase, action: &'static str) -> Result<()> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                action,
                phase: phase.to_string(),
            })
        }
    }

    fn advance(&mut self) {
        if self.current_index + 1 < self.exercises.len() {
            self.current_index += 1;
            self.current_set = 1;
            self.state = RunnerState::Active;
        } else {
            tracing::debug!("Last exercise reached, awaiting review");
            self.state = RunnerState::ReviewPending;
        }
    }
}

/// Minutes between two instants, rounded to the nearest minute
fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    let seconds = (to - from).num_seconds().max(0);
    u32::try_from((seconds + 30) / 60).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonTemplateStore;
    use crate::wal::{read_logs, JsonlLogSink};
    use chrono::Duration;

    fn entry(exercise_id: &str, sets: Option<u32>, rest: Option<u32>) -> TemplateExercise {
        TemplateExercise {
            id: Uuid::new_v4(),
            exercise_id: exercise_id.into(),
            order_index: 0,
            sets,
            reps: Some("10".into()),
            duration_seconds: None,
            rest_seconds: rest,
            notes: None,
            superset_group: None,
        }
    }

    fn template(entries: Vec<TemplateExercise>) -> WorkoutTemplate {
        let mut template = WorkoutTemplate::new("coach", "Session Test").unwrap();
        template.exercises = entries
            .into_iter()
            .enumerate()
            .map(|(i, e)| TemplateExercise {
                order_index: i as u32,
                ..e
            })
            .collect();
        template
    }

    /// A(sets=2, rest=30), B(sets=1, rest=0)
    fn two_exercise_template() -> WorkoutTemplate {
        template(vec![
            entry("goblet_squat", Some(2), Some(30)),
            entry("plank", Some(1), Some(0)),
        ])
    }

    #[derive(Default)]
    struct MemorySink {
        logs: Vec<WorkoutLog>,
        fail_next: bool,
    }

    impl LogSink for MemorySink {
        fn append(&mut self, log: &WorkoutLog) -> Result<()> {
            if self.fail_next {
                self.fail_next = false;
                return Err(Error::Other("store unavailable".into()));
            }
            self.logs.push(log.clone());
            Ok(())
        }
    }

    #[test]
    fn test_progression_through_sets_and_rest() {
        crate::logging::init_test();
        let t0 = Utc::now();
        let template = two_exercise_template();
        let a = template.exercises[0].id;
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();

        assert_eq!(runner.phase(), Phase::Active);
        assert_eq!(runner.current_set(), 1);

        assert_eq!(runner.complete_set(t0).unwrap(), Phase::Resting);
        assert_eq!(runner.current_set(), 2);
        assert_eq!(runner.rest_remaining(t0), Some(30));

        // Rest still running
        assert_eq!(runner.tick(t0 + Duration::seconds(10)), Phase::Resting);
        assert!(runner.complete_set(t0).is_err());

        // Rest expires on its own
        assert_eq!(runner.tick(t0 + Duration::seconds(30)), Phase::Active);

        assert_eq!(runner.complete_set(t0).unwrap(), Phase::Active);
        assert_eq!(runner.current_index(), 1);
        assert_eq!(runner.current_set(), 1);
        assert_eq!(runner.completed_ids(), &[a]);

        // B has no rest: straight to review
        assert_eq!(runner.complete_set(t0).unwrap(), Phase::ReviewPending);
        assert_eq!(runner.completed_ids().len(), 2);
    }

    #[test]
    fn test_unset_sets_default_to_one() {
        let t0 = Utc::now();
        let template = template(vec![entry("plank", None, Some(60))]);
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        assert_eq!(runner.complete_set(t0).unwrap(), Phase::ReviewPending);
    }

    #[test]
    fn test_rest_controls() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();

        assert!(runner.extend_rest(t0).is_err());
        assert!(runner.skip_rest().is_err());

        runner.complete_set(t0).unwrap();
        assert_eq!(runner.extend_rest(t0).unwrap(), 45);
        assert_eq!(runner.extend_rest(t0).unwrap(), 60);
        assert_eq!(runner.tick(t0 + Duration::seconds(45)), Phase::Resting);

        assert_eq!(runner.skip_rest().unwrap(), Phase::Active);
        assert_eq!(runner.rest_remaining(t0), None);
        assert_eq!(runner.current_set(), 2);
    }

    #[test]
    fn test_cancel_stops_countdown() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();

        assert_eq!(runner.cancel(), Phase::Active);

        runner.complete_set(t0).unwrap();
        assert_eq!(runner.cancel(), Phase::Active);
        assert_eq!(runner.rest_remaining(t0), None);
        assert_eq!(runner.current_set(), 2);

        runner.request_finish().unwrap();
        assert_eq!(runner.cancel(), Phase::ReviewPending);
    }

    #[test]
    fn test_custom_rest_extension() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0)
            .unwrap()
            .with_rest_extension(30);
        runner.complete_set(t0).unwrap();
        assert_eq!(runner.extend_rest(t0).unwrap(), 60);
    }

    #[test]
    fn test_next_exercise_clears_rest() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();

        runner.complete_set(t0).unwrap();
        assert_eq!(runner.next_exercise().unwrap(), Phase::Active);
        assert_eq!(runner.current_index(), 1);
        assert_eq!(runner.current_set(), 1);
        assert_eq!(runner.rest_remaining(t0), None);
        assert!(runner.completed_ids().is_empty());
    }

    #[test]
    fn test_skip_and_previous() {
        let t0 = Utc::now();
        let template = template(vec![
            entry("goblet_squat", Some(3), Some(0)),
            entry("push_up", Some(3), Some(0)),
            entry("plank", Some(1), None),
        ]);
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();

        // No-op at the first exercise
        assert_eq!(runner.previous_exercise(t0).unwrap(), Phase::Active);
        assert_eq!(runner.current_index(), 0);

        runner.complete_set(t0).unwrap();
        runner.skip_exercise(t0).unwrap();
        assert_eq!(runner.current_index(), 1);
        assert!(runner.completed_ids().is_empty());

        runner.complete_set(t0).unwrap();
        assert_eq!(runner.current_set(), 2);
        runner.previous_exercise(t0).unwrap();
        assert_eq!(runner.current_index(), 0);
        assert_eq!(runner.current_set(), 1);

        runner.skip_exercise(t0).unwrap();
        runner.skip_exercise(t0).unwrap();
        assert_eq!(runner.skip_exercise(t0).unwrap(), Phase::ReviewPending);
        assert!(runner.completed_ids().is_empty());
    }

    #[test]
    fn test_skip_and_previous_require_active() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        runner.complete_set(t0).unwrap();

        assert!(matches!(
            runner.skip_exercise(t0),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(runner.previous_exercise(t0).is_err());
        assert_eq!(runner.phase(), Phase::Resting);
    }

    #[test]
    fn test_early_finish_keeps_partial_progress() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let a = template.exercises[0].id;
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();

        runner.complete_set(t0).unwrap();
        runner.skip_rest().unwrap();
        runner.complete_set(t0).unwrap();
        assert_eq!(runner.request_finish().unwrap(), Phase::ReviewPending);

        let mut sink = MemorySink::default();
        let finished = t0 + Duration::minutes(37) + Duration::seconds(10);
        let log = runner.commit(4, "", finished, &mut sink).unwrap();

        assert_eq!(log.completed_exercise_ids, vec![a]);
        assert_eq!(log.duration_minutes, 37);
        assert_eq!(log.rating, 4);
        assert_eq!(log.started_at, t0);
        assert_eq!(log.finished_at, finished);
        assert_eq!(log.session_date, t0.date_naive());
        assert_eq!(sink.logs, vec![log]);
        assert_eq!(runner.phase(), Phase::Committed);
    }

    #[test]
    fn test_review_can_continue() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();

        runner.request_finish().unwrap();
        assert_eq!(runner.continue_workout().unwrap(), Phase::Active);
        assert_eq!(runner.current_index(), 0);
        assert!(runner.continue_workout().is_err());
    }

    #[test]
    fn test_commit_only_once() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        let mut sink = MemorySink::default();

        assert!(runner.commit(5, "", t0, &mut sink).is_err());

        runner.request_finish().unwrap();
        runner.commit(5, "great", t0, &mut sink).unwrap();

        assert!(matches!(
            runner.commit(5, "again", t0, &mut sink),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(runner.request_finish().is_err());
        assert!(runner.next_exercise().is_err());
        assert_eq!(sink.logs.len(), 1);
        assert_eq!(runner.log().unwrap().notes, "great");
    }

    #[test]
    fn test_commit_rejects_bad_rating() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        let mut sink = MemorySink::default();
        runner.request_finish().unwrap();

        for rating in [0, 6] {
            assert!(matches!(
                runner.commit(rating, "", t0, &mut sink),
                Err(Error::Validation(_))
            ));
        }
        assert_eq!(runner.phase(), Phase::ReviewPending);
        assert!(sink.logs.is_empty());
    }

    #[test]
    fn test_failed_commit_can_be_retried() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        runner.complete_set(t0).unwrap();
        runner.skip_rest().unwrap();
        runner.complete_set(t0).unwrap();
        runner.request_finish().unwrap();

        let mut sink = MemorySink {
            fail_next: true,
            ..MemorySink::default()
        };
        let err = runner.commit(3, "tired", t0, &mut sink).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(err.is_recoverable());
        assert_eq!(runner.phase(), Phase::ReviewPending);
        assert_eq!(runner.completed_ids().len(), 1);

        let log = runner.commit(3, "tired", t0, &mut sink).unwrap();
        assert_eq!(log.completed_exercise_ids.len(), 1);
        assert_eq!(sink.logs.len(), 1);
    }

    #[test]
    fn test_empty_template_is_refused() {
        let template = template(vec![]);
        assert!(matches!(
            SessionRunner::start("member", &template, Utc::now()),
            Err(Error::EmptyWorkout(id)) if id == template.id
        ));
    }

    #[test]
    fn test_start_from_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonTemplateStore::new(temp_dir.path().join("templates"));
        let template = two_exercise_template();
        store.save_template(&template).unwrap();

        let runner =
            SessionRunner::start_from_store(&store, template.id, "coach", Utc::now()).unwrap();
        assert_eq!(runner.template_id(), template.id);

        assert!(matches!(
            SessionRunner::start_from_store(&store, Uuid::new_v4(), "coach", Utc::now()),
            Err(Error::WorkoutNotFound(_))
        ));
    }

    #[test]
    fn test_private_template_hidden_from_other_users() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonTemplateStore::new(temp_dir.path().join("templates"));
        let mut template = two_exercise_template();
        store.save_template(&template).unwrap();

        assert!(matches!(
            SessionRunner::start_from_store(&store, template.id, "stranger", Utc::now()),
            Err(Error::WorkoutNotFound(_))
        ));

        template.is_public = true;
        store.save_template(&template).unwrap();
        let runner =
            SessionRunner::start_from_store(&store, template.id, "stranger", Utc::now()).unwrap();
        assert_eq!(runner.user_id(), "stranger");
    }

    #[test]
    fn test_commit_writes_to_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("logs.wal");
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        runner.request_finish().unwrap();

        let mut sink = JsonlLogSink::new(&wal_path);
        let id = runner.commit(2, "short one", t0, &mut sink).unwrap().id;

        let logs = read_logs(&wal_path).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, id);
        assert!(logs[0].completed_exercise_ids.is_empty());
    }

    #[test]
    fn test_snapshot() {
        let t0 = Utc::now();
        let template = two_exercise_template();
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        runner.complete_set(t0).unwrap();

        let view = runner.snapshot(t0 + Duration::seconds(10));
        assert_eq!(view.template_name, "Session Test");
        assert_eq!(view.phase, Phase::Resting);
        assert_eq!(view.exercise_index, 0);
        assert_eq!(view.exercise_count, 2);
        assert_eq!(view.current_set, 2);
        assert_eq!(view.total_sets, 2);
        assert_eq!(view.rest_remaining, Some(20));
        assert_eq!(view.elapsed_minutes, 0);

        // Rest ended without a tick
        let view = runner.snapshot(t0 + Duration::seconds(90));
        assert_eq!(view.phase, Phase::Active);
        assert_eq!(view.rest_remaining, None);
        assert_eq!(view.elapsed_minutes, 2);
    }

    #[test]
    fn test_superset_entries_keep_their_own_rest() {
        let t0 = Utc::now();
        let mut a = entry("push_up", Some(2), Some(0));
        let mut b = entry("db_row", Some(2), Some(45));
        a.superset_group = Some(1);
        b.superset_group = Some(1);
        let template = template(vec![a, b]);
        let mut runner = SessionRunner::start("member", &template, t0).unwrap();

        // Group members run in list order; rest comes from each entry
        assert_eq!(runner.complete_set(t0).unwrap(), Phase::Active);
        assert_eq!(runner.complete_set(t0).unwrap(), Phase::Active);
        assert_eq!(runner.current_index(), 1);
        assert_eq!(runner.complete_set(t0).unwrap(), Phase::Resting);
        assert_eq!(runner.rest_remaining(t0), Some(45));
    }

    #[test]
    fn test_expired_rest_resolves_without_tick() {
        let t0 = Utc::now();
        let later = t0 + Duration::seconds(120);
        let template = two_exercise_template();
        let a = template.exercises[0].id;

        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        runner.complete_set(t0).unwrap();
        assert_eq!(runner.phase_at(later), Phase::Active);
        assert_eq!(runner.rest_remaining(later), None);

        // Extending a finished rest is refused rather than silently ignored
        assert!(matches!(
            runner.extend_rest(later),
            Err(Error::InvalidTransition { .. })
        ));
        assert_eq!(runner.phase(), Phase::Active);

        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        runner.complete_set(t0).unwrap();
        assert_eq!(runner.complete_set(later).unwrap(), Phase::Active);
        assert_eq!(runner.completed_ids(), &[a]);

        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        runner.complete_set(t0).unwrap();
        assert_eq!(runner.skip_exercise(later).unwrap(), Phase::Active);
        assert_eq!(runner.current_index(), 1);

        let mut runner = SessionRunner::start("member", &template, t0).unwrap();
        runner.complete_set(t0).unwrap();
        assert_eq!(runner.previous_exercise(later).unwrap(), Phase::Active);
        assert_eq!(runner.current_set(), 1);
    }
}
