// src/lib.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Instant;

// --- Declare modules ---
pub mod commands;
mod config;
pub mod db;
pub mod drag;
pub mod insertion;
pub mod keys;
pub mod model;
pub mod optimistic;
pub mod permissions;

// --- Expose public types ---
pub use commands::{
    resolve_drop, validate, CommandError, NewExercise, PlanCommand, DEFAULT_REP_RANGE,
    DEFAULT_SET_COUNT,
};
pub use config::{
    get_config_path as get_config_path_util, load_config as load_config_util,
    save_config as save_config_util, Config, ConfigError, Theme,
};
pub use db::{get_db_path as get_db_path_util, DbError, LibraryFilters};
pub use drag::{
    Bounds, DragController, DragItem, DragState, DragThresholds, DropEvent, HoverTarget, Point,
    PointerKind, RegionMap,
};
pub use insertion::{compute_insertion, IndicatorCalculator, InsertionPoint};
pub use keys::{resolve_keys, ExerciseCoord, StableKey};
pub use model::{
    Day, DayOfWeek, DayPatch, EntityId, Exercise, ExerciseParams, LibraryExercise, ModelError,
    Plan, RepRange, Set, Week, WorkoutTag, DAYS_PER_WEEK,
};
pub use optimistic::{Applied, MutationId, MutationLayer, Notice, SettleOutcome, Severity};
pub use permissions::{GateError, PermissionLevel};

/// Owns the config and the database connection; sessions are opened per
/// plan and borrow neither.
pub struct PlanService {
    pub config: Config,
    pub conn: Connection,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl PlanService {
    /// Creates the service instance by loading config and initializing the DB.
    ///
    /// # Errors
    /// Returns an error on config or database initialization failure.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load_config(&config_path)
            .context(format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let conn = db::open_db(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        db::init(&conn).context("Failed to initialize database schema")?;

        Ok(Self {
            config,
            conn,
            db_path,
            config_path,
        })
    }

    /// In-memory variant for tests and scratch sessions.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory(config: Config) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        db::init(&conn).context("Failed to initialize database schema")?;
        Ok(Self {
            config,
            conn,
            db_path: PathBuf::from(":memory:"),
            config_path: PathBuf::new(),
        })
    }

    /// # Errors
    /// Returns an error if saving the config file fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save_config(&self.config_path, &self.config)
    }

    /// # Errors
    /// Returns an error if the library query fails.
    pub fn search_library(&self, filters: &LibraryFilters) -> Result<Vec<LibraryExercise>> {
        db::search_library(&self.conn, filters).context("Failed to search exercise library")
    }

    /// Loads a plan and opens an editor session on it for the given
    /// user, with thresholds taken from the config.
    ///
    /// # Errors
    /// Returns an error if the plan does not exist or cannot be loaded.
    pub fn open_session(&self, plan_id: i64, user_id: i64) -> Result<EditorSession> {
        let (plan, permission) = db::load_plan(&self.conn, plan_id, user_id)
            .with_context(|| format!("Failed to load plan ID {plan_id}"))?;
        Ok(EditorSession::new(plan, user_id, permission, &self.config))
    }
}

/// One user's live editing session on one plan: the local hierarchy,
/// the drag state machine, the insertion indicator, and the optimistic
/// mutation pipeline.
pub struct EditorSession {
    pub plan: Plan,
    pub user_id: i64,
    pub permission: PermissionLevel,
    pub drag: DragController,
    pub indicator: IndicatorCalculator,
    pub mutations: MutationLayer,
    /// Week currently shown by the frontend.
    pub active_week: usize,
}

impl EditorSession {
    #[must_use]
    pub fn new(plan: Plan, user_id: i64, permission: PermissionLevel, config: &Config) -> Self {
        Self {
            plan,
            user_id,
            permission,
            drag: DragController::new(DragThresholds {
                activation_distance: config.drag_activation_distance,
                touch_hold: config.touch_hold(),
            }),
            indicator: IndicatorCalculator::new(config.indicator_interval()),
            mutations: MutationLayer::new(config.refetch_debounce()),
            active_week: 0,
        }
    }

    // --- Pointer plumbing ---

    pub fn pointer_down(&mut self, item: DragItem, kind: PointerKind, at: Point, now: Instant) {
        self.drag.pointer_down(item, kind, at, now);
    }

    /// Feeds a pointer move through the drag machine and, while a drag
    /// is live, schedules an insertion-indicator recompute.
    pub fn pointer_move(&mut self, at: Point, now: Instant, regions: &RegionMap) {
        self.drag.pointer_move(at, now, regions);
        if self.drag.is_dragging() {
            self.indicator.on_pointer(&self.plan, &self.drag, now);
        }
    }

    /// Flushes throttled indicator work; call once per frame.
    pub fn tick(&mut self, now: Instant) {
        self.indicator.tick(&self.plan, &self.drag, now);
    }

    /// Ends the drag session and, if the drop resolves to a command,
    /// dispatches it. The indicator is cancelled first so it cannot
    /// flash a stale position after the hierarchy changed.
    pub fn pointer_up(
        &mut self,
        conn: &Connection,
        at: Point,
        regions: &RegionMap,
    ) -> Option<Notice> {
        let insertion = self.indicator.current();
        self.indicator.cancel();
        let drop = self.drag.pointer_up(at, regions)?;
        let command = resolve_drop(&self.plan, &drop.item, drop.hover.as_ref(), insertion)?;
        self.dispatch(conn, command)
    }

    /// Aborts any drag in progress (escape, focus loss) with no state
    /// change and no command.
    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
        self.indicator.cancel();
    }

    #[must_use]
    pub fn insertion_point(&self) -> Option<InsertionPoint> {
        self.indicator.current()
    }

    // --- Commands ---

    /// Runs one mutation end to end: stage the persistence call against
    /// ids the server knows, apply optimistically, persist, settle.
    /// Returns a notice for the status line when the command was
    /// rejected or rolled back; `None` means done (or a silent stale
    /// no-op).
    pub fn dispatch(&mut self, conn: &Connection, command: PlanCommand) -> Option<Notice> {
        let staged = match stage(&self.plan, &command) {
            Ok(staged) => staged,
            Err(StageError::Stale(err)) => {
                debug!("dropping stale command: {err}");
                return None;
            }
            Err(StageError::Unsynced) => {
                return Some(Notice::warning(
                    "Waiting for an earlier change to save; try again shortly",
                ));
            }
        };

        let applied = match self.mutations.apply(&self.plan, self.permission, command) {
            Ok(applied) => applied,
            Err(err) if err.is_stale() => {
                debug!("dropping stale command: {err}");
                return None;
            }
            Err(err) => return Some(Notice::warning(err.to_string())),
        };
        self.plan = applied.plan;

        let outcome = match run_persist(conn, staged) {
            Ok(server_ids) => SettleOutcome::Success {
                assigned: applied.created.iter().copied().zip(server_ids).collect(),
            },
            Err(err) => SettleOutcome::Failure {
                message: err.to_string(),
            },
        };
        self.mutations
            .settle(&mut self.plan, applied.id, &outcome, Instant::now())
    }

    /// Marks a day complete (locking it) or reopens it. Not optimistic:
    /// the write is synchronous and the local model follows on success.
    ///
    /// # Errors
    /// Returns an error if the user cannot edit content or the write
    /// fails.
    pub fn set_day_completed(
        &mut self,
        conn: &Connection,
        week_index: usize,
        day_of_week: DayOfWeek,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if !self.permission.can_edit_content() {
            anyhow::bail!("{} rights are not sufficient for this edit", self.permission);
        }
        let day = self.plan.day(week_index, day_of_week)?;
        let day_id = day.id.as_db().ok_or(DbError::UnsyncedEntity)?;
        db::set_day_completed(conn, day_id, completed_at)
            .context("Failed to update day completion")?;
        if let Some(week) = self.plan.weeks.get_mut(week_index) {
            week.day_mut(day_of_week).completed_at = completed_at;
        }
        Ok(())
    }

    // --- Refresh ---

    /// Replaces the local hierarchy from the store when the mutation
    /// layer allows it (nothing in flight, debounce elapsed). Returns
    /// whether a reload happened.
    ///
    /// # Errors
    /// Returns an error if the reload query fails.
    pub fn refresh(&mut self, conn: &Connection, now: Instant) -> Result<bool> {
        if !self.mutations.refetch_allowed(now) {
            debug!("refetch suppressed: pending mutations or debounce window");
            return Ok(false);
        }
        let (plan, permission) = db::load_plan(conn, self.plan.id, self.user_id)
            .context("Failed to reload plan")?;
        self.plan = plan;
        self.permission = permission;
        Ok(true)
    }

    // --- View helpers ---

    /// Sets of an exercise stay read-only until the exercise itself has
    /// a server id, so no set mutation can reference a parent the
    /// server does not know yet.
    #[must_use]
    pub fn sets_locked(&self, coord: ExerciseCoord) -> bool {
        self.plan
            .exercise(coord.week_index, coord.day_of_week, coord.index)
            .map_or(true, Exercise::is_pending)
    }

    /// Render identity for every exercise slot, in render order.
    #[must_use]
    pub fn stable_keys(&self) -> Vec<(StableKey, ExerciseCoord)> {
        resolve_keys(&self.plan)
    }

    pub fn next_week(&mut self) {
        if self.active_week + 1 < self.plan.weeks.len() {
            self.active_week += 1;
        }
    }

    pub fn prev_week(&mut self) {
        self.active_week = self.active_week.saturating_sub(1);
    }
}

// --- Persistence staging ---

/// One store call, expressed in server ids. Staged from the pre-apply
/// hierarchy because the command's coordinates may no longer resolve
/// once the optimistic change lands.
#[derive(Debug)]
enum PersistCall {
    CreateExercise {
        day_id: i64,
        base_id: i64,
        name: String,
        position: u32,
        params: ExerciseParams,
        sets: Vec<(RepRange, Option<f64>, Option<f64>)>,
    },
    RemoveExercise {
        exercise_id: i64,
    },
    Reorder {
        day_id: i64,
        ordered_ids: Vec<i64>,
    },
    Move {
        exercise_id: i64,
        to_day_id: i64,
        to_position: u32,
    },
    MoveDay {
        from_day_id: i64,
        to_day_id: i64,
    },
    UpdateDay {
        day_id: i64,
        is_rest_day: Option<bool>,
        tag: Option<Option<WorkoutTag>>,
    },
    AddWeek {
        plan_id: i64,
    },
    RemoveWeek {
        week_id: i64,
    },
    CloneWeek {
        week_id: i64,
    },
    UpdateParams {
        exercise_id: i64,
        params: ExerciseParams,
    },
    AddSet {
        exercise_id: i64,
        reps: RepRange,
        weight: Option<f64>,
        rpe: Option<f64>,
    },
    RemoveSet {
        set_id: i64,
    },
    UpdateSet {
        set_id: i64,
        reps: RepRange,
        weight: Option<f64>,
        rpe: Option<f64>,
    },
}

enum StageError {
    /// A referenced coordinate no longer exists; benign, drop silently.
    Stale(ModelError),
    /// A referenced entity only has a temp id so far.
    Unsynced,
}

impl From<ModelError> for StageError {
    fn from(err: ModelError) -> Self {
        Self::Stale(err)
    }
}

fn require_db(id: EntityId) -> Result<i64, StageError> {
    id.as_db().ok_or(StageError::Unsynced)
}

fn stage(plan: &Plan, command: &PlanCommand) -> Result<PersistCall, StageError> {
    match command {
        PlanCommand::AddExercise {
            week_index,
            day_of_week,
            exercise,
            position,
        } => Ok(PersistCall::CreateExercise {
            day_id: require_db(plan.day(*week_index, *day_of_week)?.id)?,
            base_id: exercise.base_id,
            name: exercise.name.clone(),
            position: *position,
            params: exercise.params.clone(),
            sets: NewExercise::default_sets(),
        }),
        PlanCommand::RemoveExercise { coord } => Ok(PersistCall::RemoveExercise {
            exercise_id: require_db(
                plan.exercise(coord.week_index, coord.day_of_week, coord.index)?.id,
            )?,
        }),
        PlanCommand::ReorderWithinDay {
            week_index,
            day_of_week,
            from,
            to,
        } => {
            let day = plan.day(*week_index, *day_of_week)?;
            let mut ids = day
                .exercises
                .iter()
                .map(|e| require_db(e.id))
                .collect::<Result<Vec<_>, _>>()?;
            if *from >= ids.len() {
                return Err(ModelError::ExerciseOutOfRange {
                    week: *week_index,
                    day: day_of_week.index(),
                    index: *from,
                }
                .into());
            }
            let moved = ids.remove(*from);
            ids.insert((*to).min(ids.len()), moved);
            Ok(PersistCall::Reorder {
                day_id: require_db(day.id)?,
                ordered_ids: ids,
            })
        }
        PlanCommand::MoveExercise { from, to } => Ok(PersistCall::Move {
            exercise_id: require_db(
                plan.exercise(from.week_index, from.day_of_week, from.index)?.id,
            )?,
            to_day_id: require_db(plan.day(to.week_index, to.day_of_week)?.id)?,
            to_position: to.index as u32 + 1,
        }),
        PlanCommand::MoveDayExercises {
            from_week,
            from_day,
            to_week,
            to_day,
        } => Ok(PersistCall::MoveDay {
            from_day_id: require_db(plan.day(*from_week, *from_day)?.id)?,
            to_day_id: require_db(plan.day(*to_week, *to_day)?.id)?,
        }),
        PlanCommand::UpdateDay {
            week_index,
            day_of_week,
            patch,
        } => Ok(PersistCall::UpdateDay {
            day_id: require_db(plan.day(*week_index, *day_of_week)?.id)?,
            is_rest_day: patch.is_rest_day,
            tag: patch.tag,
        }),
        PlanCommand::AddWeek => Ok(PersistCall::AddWeek { plan_id: plan.id }),
        PlanCommand::RemoveWeek { week_index } => Ok(PersistCall::RemoveWeek {
            week_id: require_db(plan.week(*week_index)?.id)?,
        }),
        PlanCommand::CloneWeek { week_index } => Ok(PersistCall::CloneWeek {
            week_id: require_db(plan.week(*week_index)?.id)?,
        }),
        PlanCommand::UpdateExerciseParams { coord, params } => Ok(PersistCall::UpdateParams {
            exercise_id: require_db(
                plan.exercise(coord.week_index, coord.day_of_week, coord.index)?.id,
            )?,
            params: params.clone(),
        }),
        PlanCommand::AddSet {
            coord,
            reps,
            weight,
            rpe,
        } => Ok(PersistCall::AddSet {
            exercise_id: require_db(
                plan.exercise(coord.week_index, coord.day_of_week, coord.index)?.id,
            )?,
            reps: *reps,
            weight: *weight,
            rpe: *rpe,
        }),
        PlanCommand::RemoveSet { coord, set_index } => Ok(PersistCall::RemoveSet {
            set_id: require_db(set_at(plan, coord, *set_index)?.id)?,
        }),
        PlanCommand::UpdateSet {
            coord,
            set_index,
            reps,
            weight,
            rpe,
        } => Ok(PersistCall::UpdateSet {
            set_id: require_db(set_at(plan, coord, *set_index)?.id)?,
            reps: *reps,
            weight: *weight,
            rpe: *rpe,
        }),
    }
}

fn set_at<'a>(
    plan: &'a Plan,
    coord: &ExerciseCoord,
    set_index: usize,
) -> Result<&'a Set, ModelError> {
    plan.exercise(coord.week_index, coord.day_of_week, coord.index)?
        .sets
        .get(set_index)
        .ok_or(ModelError::SetOutOfRange(set_index))
}

/// Executes the staged call; returns server-assigned ids for created
/// entities, in the same tree order the optimistic apply minted temp
/// ids in.
fn run_persist(conn: &Connection, call: PersistCall) -> Result<Vec<i64>, DbError> {
    match call {
        PersistCall::CreateExercise {
            day_id,
            base_id,
            name,
            position,
            params,
            sets,
        } => {
            let (exercise_id, set_ids) =
                db::create_exercise_in_day(conn, day_id, base_id, &name, position, &params, &sets)?;
            let mut ids = vec![exercise_id];
            ids.extend(set_ids);
            Ok(ids)
        }
        PersistCall::RemoveExercise { exercise_id } => {
            db::remove_exercise_from_day(conn, exercise_id)?;
            Ok(Vec::new())
        }
        PersistCall::Reorder {
            day_id,
            ordered_ids,
        } => {
            db::reorder_day_exercises(conn, day_id, &ordered_ids)?;
            Ok(Vec::new())
        }
        PersistCall::Move {
            exercise_id,
            to_day_id,
            to_position,
        } => {
            db::move_exercise(conn, exercise_id, to_day_id, to_position)?;
            Ok(Vec::new())
        }
        PersistCall::MoveDay {
            from_day_id,
            to_day_id,
        } => {
            db::move_day_exercises(conn, from_day_id, to_day_id)?;
            Ok(Vec::new())
        }
        PersistCall::UpdateDay {
            day_id,
            is_rest_day,
            tag,
        } => {
            db::update_day(conn, day_id, is_rest_day, tag)?;
            Ok(Vec::new())
        }
        PersistCall::AddWeek { plan_id } => {
            let (week_id, day_ids) = db::add_week(conn, plan_id)?;
            let mut ids = vec![week_id];
            ids.extend(day_ids);
            Ok(ids)
        }
        PersistCall::RemoveWeek { week_id } => {
            db::remove_week(conn, week_id)?;
            Ok(Vec::new())
        }
        PersistCall::CloneWeek { week_id } => db::clone_week(conn, week_id),
        PersistCall::UpdateParams {
            exercise_id,
            params,
        } => {
            db::update_exercise_params(conn, exercise_id, &params)?;
            Ok(Vec::new())
        }
        PersistCall::AddSet {
            exercise_id,
            reps,
            weight,
            rpe,
        } => Ok(vec![db::add_set(conn, exercise_id, reps, weight, rpe)?]),
        PersistCall::RemoveSet { set_id } => {
            db::remove_set(conn, set_id)?;
            Ok(Vec::new())
        }
        PersistCall::UpdateSet {
            set_id,
            reps,
            weight,
            rpe,
        } => {
            db::update_set(conn, set_id, reps, weight, rpe)?;
            Ok(Vec::new())
        }
    }
}
