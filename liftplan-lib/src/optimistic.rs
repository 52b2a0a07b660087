//src/optimistic.rs
use crate::commands::{validate, CommandError, NewExercise, PlanCommand};
use crate::model::{Day, DayOfWeek, EntityId, Exercise, ModelError, Plan, Set, TempIds, Week};
use crate::permissions::PermissionLevel;
use log::{debug, warn};
use std::time::{Duration, Instant};

pub type MutationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Raised to whatever notification channel the frontend provides. The
/// editor core only produces these; formatting and routing are not its
/// business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Exactly what a failed mutation restores. Scoped to the affected
/// aggregate (a day's exercise list, one day, or the week vector) and
/// never the whole plan, so an unrelated confirmed change elsewhere is
/// never wiped by someone else's rollback.
#[derive(Debug, Clone)]
enum RollbackScope {
    DayLists(Vec<(usize, DayOfWeek, Vec<Exercise>)>),
    Day { week_index: usize, day: Day },
    /// Week-level ops restore the whole week vector: the single
    /// ordered collection those ops act on.
    Weeks(Vec<Week>),
}

#[derive(Debug)]
struct PendingMutation {
    id: MutationId,
    command: PlanCommand,
    scope: RollbackScope,
}

/// How a persistence call settled.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// Server confirmed; `assigned` maps client temp ids to
    /// server-assigned ids, in the tree order the optimistic create
    /// produced them.
    Success { assigned: Vec<(u64, i64)> },
    Failure { message: String },
}

/// Result of an optimistic apply: the new hierarchy, the pending
/// mutation's handle, and any temp ids minted for created entities (in
/// tree order, for pairing with the persistence call's returned ids).
#[derive(Debug)]
pub struct Applied {
    pub plan: Plan,
    pub id: MutationId,
    pub created: Vec<u64>,
}

/// Optimistic mutation protocol: `apply` validates and updates local
/// state synchronously, recording a scoped snapshot; `settle` later
/// confirms (swapping temp ids) or rolls back exactly that snapshot.
/// Settlement order is independent of apply order.
#[derive(Debug)]
pub struct MutationLayer {
    pending: Vec<PendingMutation>,
    next_id: MutationId,
    temp_ids: TempIds,
    refetch_hold: Duration,
    last_settled: Option<Instant>,
}

impl MutationLayer {
    #[must_use]
    pub fn new(refetch_hold: Duration) -> Self {
        Self {
            pending: Vec::new(),
            next_id: 1,
            temp_ids: TempIds::default(),
            refetch_hold,
            last_settled: None,
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// A background refetch may replace the plan only while nothing is
    /// in flight and the debounce window after the last settlement has
    /// passed; otherwise it would clobber unconfirmed local state.
    #[must_use]
    pub fn refetch_allowed(&self, now: Instant) -> bool {
        self.pending.is_empty()
            && self
                .last_settled
                .map_or(true, |at| now - at >= self.refetch_hold)
    }

    /// Validates the command, captures the rollback scope, and applies
    /// the change to a fresh hierarchy.
    ///
    /// # Errors
    /// `CommandError` for guard violations; `CommandError::Stale` when
    /// the command's coordinates no longer exist.
    pub fn apply(
        &mut self,
        plan: &Plan,
        level: PermissionLevel,
        command: PlanCommand,
    ) -> Result<Applied, CommandError> {
        validate(plan, level, &command)?;
        let scope = capture_scope(plan, &command);
        let (new_plan, created) = execute(plan, &command, &mut self.temp_ids)?;
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(PendingMutation { id, command, scope });
        Ok(Applied {
            plan: new_plan,
            id,
            created,
        })
    }

    /// Settles one pending mutation. Success swaps temp ids for
    /// server-assigned ids; failure restores the captured scope onto the
    /// *current* plan and reports a recoverable error. Settling an
    /// unknown id is a no-op (already settled, or a benign race).
    pub fn settle(
        &mut self,
        plan: &mut Plan,
        id: MutationId,
        outcome: &SettleOutcome,
        now: Instant,
    ) -> Option<Notice> {
        let Some(pos) = self.pending.iter().position(|p| p.id == id) else {
            debug!("settle for unknown mutation {id}; ignoring");
            return None;
        };
        let mutation = self.pending.remove(pos);
        self.last_settled = Some(now);
        match outcome {
            SettleOutcome::Success { assigned } => {
                if !assigned.is_empty() {
                    plan.assign_ids(assigned);
                }
                None
            }
            SettleOutcome::Failure { message } => {
                warn!(
                    "mutation {id} ({:?}) failed, rolling back: {message}",
                    kind_name(&mutation.command)
                );
                restore_scope(plan, mutation.scope);
                Some(Notice::error(format!("Change not saved: {message}")))
            }
        }
    }
}

fn kind_name(command: &PlanCommand) -> &'static str {
    match command {
        PlanCommand::AddExercise { .. } => "add-exercise",
        PlanCommand::RemoveExercise { .. } => "remove-exercise",
        PlanCommand::ReorderWithinDay { .. } => "reorder-within-day",
        PlanCommand::MoveExercise { .. } => "move-exercise",
        PlanCommand::MoveDayExercises { .. } => "move-day-exercises",
        PlanCommand::UpdateDay { .. } => "update-day",
        PlanCommand::AddWeek => "add-week",
        PlanCommand::RemoveWeek { .. } => "remove-week",
        PlanCommand::CloneWeek { .. } => "clone-week",
        PlanCommand::UpdateExerciseParams { .. } => "update-exercise-params",
        PlanCommand::AddSet { .. } => "add-set",
        PlanCommand::RemoveSet { .. } => "remove-set",
        PlanCommand::UpdateSet { .. } => "update-set",
    }
}

fn day_list_snapshot(plan: &Plan, week_index: usize, dow: DayOfWeek) -> (usize, DayOfWeek, Vec<Exercise>) {
    let exercises = plan
        .day(week_index, dow)
        .map(|d| d.exercises.clone())
        .unwrap_or_default();
    (week_index, dow, exercises)
}

fn capture_scope(plan: &Plan, command: &PlanCommand) -> RollbackScope {
    match command {
        PlanCommand::AddExercise {
            week_index,
            day_of_week,
            ..
        }
        | PlanCommand::ReorderWithinDay {
            week_index,
            day_of_week,
            ..
        } => RollbackScope::DayLists(vec![day_list_snapshot(plan, *week_index, *day_of_week)]),
        PlanCommand::RemoveExercise { coord }
        | PlanCommand::UpdateExerciseParams { coord, .. }
        | PlanCommand::AddSet { coord, .. }
        | PlanCommand::RemoveSet { coord, .. }
        | PlanCommand::UpdateSet { coord, .. } => RollbackScope::DayLists(vec![day_list_snapshot(
            plan,
            coord.week_index,
            coord.day_of_week,
        )]),
        PlanCommand::MoveExercise { from, to } => {
            let mut lists = vec![day_list_snapshot(plan, from.week_index, from.day_of_week)];
            if !from.same_day(to) {
                lists.push(day_list_snapshot(plan, to.week_index, to.day_of_week));
            }
            RollbackScope::DayLists(lists)
        }
        PlanCommand::MoveDayExercises {
            from_week,
            from_day,
            to_week,
            to_day,
        } => RollbackScope::DayLists(vec![
            day_list_snapshot(plan, *from_week, *from_day),
            day_list_snapshot(plan, *to_week, *to_day),
        ]),
        PlanCommand::UpdateDay {
            week_index,
            day_of_week,
            ..
        } => {
            let day = plan
                .day(*week_index, *day_of_week)
                .cloned()
                .unwrap_or_else(|_| Day::new(EntityId::Temp(0), *day_of_week));
            RollbackScope::Day {
                week_index: *week_index,
                day,
            }
        }
        PlanCommand::AddWeek | PlanCommand::RemoveWeek { .. } | PlanCommand::CloneWeek { .. } => {
            RollbackScope::Weeks(plan.weeks.clone())
        }
    }
}

fn restore_scope(plan: &mut Plan, scope: RollbackScope) {
    match scope {
        RollbackScope::DayLists(lists) => {
            for (week_index, dow, exercises) in lists {
                if week_index < plan.weeks.len() {
                    plan.weeks[week_index].day_mut(dow).exercises = exercises;
                } else {
                    debug!("rollback target week {week_index} no longer exists; skipping");
                }
            }
        }
        RollbackScope::Day { week_index, day } => {
            if week_index < plan.weeks.len() {
                let dow = day.day_of_week;
                *plan.weeks[week_index].day_mut(dow) = day;
            } else {
                debug!("rollback target week {week_index} no longer exists; skipping");
            }
        }
        RollbackScope::Weeks(weeks) => plan.weeks = weeks,
    }
}

/// Runs the pure model operation for a command, returning the new
/// hierarchy and the temp ids of any created entities in tree order
/// (entity before its children, siblings in position order), the same
/// order the persistence layer reports server-assigned ids in.
fn execute(
    plan: &Plan,
    command: &PlanCommand,
    temp_ids: &mut TempIds,
) -> Result<(Plan, Vec<u64>), ModelError> {
    match command {
        PlanCommand::AddExercise {
            week_index,
            day_of_week,
            exercise,
            position,
        } => {
            let instance = instantiate(exercise, *position, temp_ids);
            let created = temp_ids_of_exercise(&instance);
            let index = position.saturating_sub(1) as usize;
            let plan = plan.add_exercise(*week_index, *day_of_week, instance, index)?;
            Ok((plan, created))
        }
        PlanCommand::RemoveExercise { coord } => Ok((
            plan.remove_exercise(coord.week_index, coord.day_of_week, coord.index)?,
            Vec::new(),
        )),
        PlanCommand::ReorderWithinDay {
            week_index,
            day_of_week,
            from,
            to,
        } => Ok((
            plan.move_exercise(*week_index, *day_of_week, *from, *week_index, *day_of_week, *to)?,
            Vec::new(),
        )),
        PlanCommand::MoveExercise { from, to } => Ok((
            plan.move_exercise(
                from.week_index,
                from.day_of_week,
                from.index,
                to.week_index,
                to.day_of_week,
                to.index,
            )?,
            Vec::new(),
        )),
        PlanCommand::MoveDayExercises {
            from_week,
            from_day,
            to_week,
            to_day,
        } => {
            let count = plan.day(*from_week, *from_day)?.exercises.len();
            let mut next = plan.clone();
            for _ in 0..count {
                // Pop the head of the source each round; usize::MAX clamps
                // to an append on the destination.
                next = next.move_exercise(*from_week, *from_day, 0, *to_week, *to_day, usize::MAX)?;
            }
            Ok((next, Vec::new()))
        }
        PlanCommand::UpdateDay {
            week_index,
            day_of_week,
            patch,
        } => Ok((plan.update_day(*week_index, *day_of_week, patch)?, Vec::new())),
        PlanCommand::AddWeek => {
            let next = plan.add_week(temp_ids);
            let created = next
                .weeks
                .last()
                .map(temp_ids_of_week)
                .unwrap_or_default();
            Ok((next, created))
        }
        PlanCommand::RemoveWeek { week_index } => Ok((plan.remove_week(*week_index)?, Vec::new())),
        PlanCommand::CloneWeek { week_index } => {
            let next = plan.clone_week(*week_index, temp_ids)?;
            let created = temp_ids_of_week(&next.weeks[week_index + 1]);
            Ok((next, created))
        }
        PlanCommand::UpdateExerciseParams { coord, params } => Ok((
            plan.update_exercise_params(
                coord.week_index,
                coord.day_of_week,
                coord.index,
                params.clone(),
            )?,
            Vec::new(),
        )),
        PlanCommand::AddSet {
            coord,
            reps,
            weight,
            rpe,
        } => {
            let set = Set {
                id: temp_ids.next_id(),
                order: 0, // renumbered by the model op
                reps: *reps,
                weight: *weight,
                rpe: *rpe,
            };
            let created = temp_values(&[set.id]);
            let plan = plan.add_set(coord.week_index, coord.day_of_week, coord.index, set)?;
            Ok((plan, created))
        }
        PlanCommand::RemoveSet { coord, set_index } => Ok((
            plan.remove_set(coord.week_index, coord.day_of_week, coord.index, *set_index)?,
            Vec::new(),
        )),
        PlanCommand::UpdateSet {
            coord,
            set_index,
            reps,
            weight,
            rpe,
        } => Ok((
            plan.update_set(
                coord.week_index,
                coord.day_of_week,
                coord.index,
                *set_index,
                *reps,
                *weight,
                *rpe,
            )?,
            Vec::new(),
        )),
    }
}

fn instantiate(new: &NewExercise, position: u32, temp_ids: &mut TempIds) -> Exercise {
    let id = temp_ids.next_id();
    let sets = NewExercise::default_sets()
        .into_iter()
        .enumerate()
        .map(|(i, (reps, weight, rpe))| Set {
            id: temp_ids.next_id(),
            order: i as u32 + 1,
            reps,
            weight,
            rpe,
        })
        .collect();
    Exercise {
        id,
        base_id: new.base_id,
        name: new.name.clone(),
        order: position,
        params: new.params.clone(),
        sets,
    }
}

fn temp_ids_of_exercise(exercise: &Exercise) -> Vec<u64> {
    let mut out = Vec::with_capacity(1 + exercise.sets.len());
    if let EntityId::Temp(t) = exercise.id {
        out.push(t);
    }
    for set in &exercise.sets {
        if let EntityId::Temp(t) = set.id {
            out.push(t);
        }
    }
    out
}

fn temp_ids_of_week(week: &Week) -> Vec<u64> {
    let mut out = Vec::new();
    if let EntityId::Temp(t) = week.id {
        out.push(t);
    }
    for day in &week.days {
        if let EntityId::Temp(t) = day.id {
            out.push(t);
        }
        for exercise in &day.exercises {
            out.extend(temp_ids_of_exercise(exercise));
        }
    }
    out
}

fn temp_values(ids: &[EntityId]) -> Vec<u64> {
    ids.iter()
        .filter_map(|id| match id {
            EntityId::Temp(t) => Some(*t),
            EntityId::Db(_) => None,
        })
        .collect()
}
