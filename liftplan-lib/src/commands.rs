//src/commands.rs
use crate::drag::{DragItem, HoverTarget};
use crate::insertion::InsertionPoint;
use crate::keys::ExerciseCoord;
use crate::model::{
    DayOfWeek, DayPatch, ExerciseParams, LibraryExercise, ModelError, Plan, RepRange,
};
use crate::permissions::GateError;
use thiserror::Error;

/// New sets instantiated for an exercise dragged in from the library.
pub const DEFAULT_SET_COUNT: usize = 3;
pub const DEFAULT_REP_RANGE: RepRange = RepRange::new(8, 12);

/// Payload for a new-from-library add: the library reference plus the
/// default parameters the instance starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExercise {
    pub base_id: i64,
    pub name: String,
    pub params: ExerciseParams,
}

impl NewExercise {
    #[must_use]
    pub fn from_library(library: &LibraryExercise) -> Self {
        Self {
            base_id: library.id,
            name: library.name.clone(),
            params: ExerciseParams::default(),
        }
    }

    /// Default set prescription for a freshly added exercise.
    #[must_use]
    pub fn default_sets() -> Vec<(RepRange, Option<f64>, Option<f64>)> {
        vec![(DEFAULT_REP_RANGE, None, None); DEFAULT_SET_COUNT]
    }
}

/// Every structural or content mutation the editor can issue. Each
/// variant maps to exactly one persistence call.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanCommand {
    /// New-from-library; `position` is the 1-based order slot
    /// (calculated insertion index + 1).
    AddExercise {
        week_index: usize,
        day_of_week: DayOfWeek,
        exercise: NewExercise,
        position: u32,
    },
    RemoveExercise {
        coord: ExerciseCoord,
    },
    ReorderWithinDay {
        week_index: usize,
        day_of_week: DayOfWeek,
        from: usize,
        to: usize,
    },
    MoveExercise {
        from: ExerciseCoord,
        to: ExerciseCoord,
    },
    /// Day-level menu action: move every exercise of one day to another.
    MoveDayExercises {
        from_week: usize,
        from_day: DayOfWeek,
        to_week: usize,
        to_day: DayOfWeek,
    },
    UpdateDay {
        week_index: usize,
        day_of_week: DayOfWeek,
        patch: DayPatch,
    },
    AddWeek,
    RemoveWeek {
        week_index: usize,
    },
    CloneWeek {
        week_index: usize,
    },
    UpdateExerciseParams {
        coord: ExerciseCoord,
        params: ExerciseParams,
    },
    AddSet {
        coord: ExerciseCoord,
        reps: RepRange,
        weight: Option<f64>,
        rpe: Option<f64>,
    },
    RemoveSet {
        coord: ExerciseCoord,
        set_index: usize,
    },
    UpdateSet {
        coord: ExerciseCoord,
        set_index: usize,
        reps: RepRange,
        weight: Option<f64>,
        rpe: Option<f64>,
    },
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("Cannot drop onto a rest day")]
    RestDayTarget,
    #[error("Source and destination are the same day")]
    SameDayMove,
    #[error("Sets of an unsaved exercise are locked until it syncs")]
    PendingParent,
    /// The referenced coordinate no longer exists; a benign race with a
    /// background refresh, treated as a silent no-op by the caller.
    #[error("Stale coordinate: {0}")]
    Stale(#[from] ModelError),
}

impl CommandError {
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Translates a finished drag into a command, or `None` when the drop is
/// a no-op (released outside any droppable, over a rest day, or a
/// same-index reorder). Rights and completed-day locks are checked
/// later, at apply time; this stage only decides *which* command the
/// gesture means.
#[must_use]
pub fn resolve_drop(
    plan: &Plan,
    item: &DragItem,
    hover: Option<&HoverTarget>,
    insertion: Option<InsertionPoint>,
) -> Option<PlanCommand> {
    let hover = hover?;
    let (week_index, day_of_week) = hover.day_coord();
    let day = plan.day(week_index, day_of_week).ok()?;
    if day.is_rest_day {
        return None;
    }

    // The indicator is throttled, so a point computed just before the
    // pointer crossed into this day still names the previous day.
    // Only its index for *this* day is trustworthy.
    let insertion =
        insertion.filter(|p| p.week_index == week_index && p.day_of_week == day_of_week);

    // Insert-before when over a row, append when over the container.
    let target_index = match hover {
        HoverTarget::Exercise(coord) => coord.index.min(day.exercises.len()),
        HoverTarget::Day { .. } => day.exercises.len(),
    };

    match item {
        DragItem::Library(library) => {
            let index = insertion.map_or(target_index, |p| p.index);
            Some(PlanCommand::AddExercise {
                week_index,
                day_of_week,
                exercise: NewExercise::from_library(library),
                position: index as u32 + 1,
            })
        }
        DragItem::InPlan(origin) => {
            if origin.week_index == week_index && origin.day_of_week == day_of_week {
                let to = match hover {
                    HoverTarget::Exercise(coord) => coord.index,
                    HoverTarget::Day { .. } => day.exercises.len().saturating_sub(1),
                };
                if to == origin.index {
                    return None;
                }
                Some(PlanCommand::ReorderWithinDay {
                    week_index,
                    day_of_week,
                    from: origin.index,
                    to,
                })
            } else {
                let index = insertion.map_or(target_index, |p| p.index);
                Some(PlanCommand::MoveExercise {
                    from: *origin,
                    to: ExerciseCoord::new(week_index, day_of_week, index),
                })
            }
        }
    }
}

/// Guard conditions checked before any state change or persistence
/// call: permission tier, rest-day targets, completed-day lock on both
/// ends, and the day-menu same-day rule.
///
/// # Errors
/// `CommandError` naming the violated guard; `Stale` for coordinates the
/// current model no longer has.
pub fn validate(
    plan: &Plan,
    level: crate::permissions::PermissionLevel,
    command: &PlanCommand,
) -> Result<(), CommandError> {
    use crate::permissions::{ensure_day_open, ensure_destructive_edit, ensure_structural_edit};

    match command {
        PlanCommand::AddExercise {
            week_index,
            day_of_week,
            ..
        } => {
            ensure_structural_edit(level)?;
            let day = plan.day(*week_index, *day_of_week)?;
            ensure_day_open(day)?;
            if day.is_rest_day {
                return Err(CommandError::RestDayTarget);
            }
            Ok(())
        }
        PlanCommand::RemoveExercise { coord } => {
            ensure_structural_edit(level)?;
            plan.exercise(coord.week_index, coord.day_of_week, coord.index)?;
            ensure_day_open(plan.day(coord.week_index, coord.day_of_week)?)?;
            Ok(())
        }
        PlanCommand::ReorderWithinDay {
            week_index,
            day_of_week,
            from,
            ..
        } => {
            ensure_structural_edit(level)?;
            plan.exercise(*week_index, *day_of_week, *from)?;
            ensure_day_open(plan.day(*week_index, *day_of_week)?)?;
            Ok(())
        }
        PlanCommand::MoveExercise { from, to } => {
            ensure_structural_edit(level)?;
            plan.exercise(from.week_index, from.day_of_week, from.index)?;
            ensure_day_open(plan.day(from.week_index, from.day_of_week)?)?;
            let dest = plan.day(to.week_index, to.day_of_week)?;
            ensure_day_open(dest)?;
            if dest.is_rest_day {
                return Err(CommandError::RestDayTarget);
            }
            Ok(())
        }
        PlanCommand::MoveDayExercises {
            from_week,
            from_day,
            to_week,
            to_day,
        } => {
            ensure_structural_edit(level)?;
            if from_week == to_week && from_day == to_day {
                return Err(CommandError::SameDayMove);
            }
            ensure_day_open(plan.day(*from_week, *from_day)?)?;
            let dest = plan.day(*to_week, *to_day)?;
            ensure_day_open(dest)?;
            if dest.is_rest_day {
                return Err(CommandError::RestDayTarget);
            }
            Ok(())
        }
        PlanCommand::UpdateDay {
            week_index,
            day_of_week,
            ..
        } => {
            ensure_structural_edit(level)?;
            ensure_day_open(plan.day(*week_index, *day_of_week)?)?;
            Ok(())
        }
        PlanCommand::AddWeek | PlanCommand::CloneWeek { .. } => {
            ensure_structural_edit(level)?;
            if let PlanCommand::CloneWeek { week_index } = command {
                plan.week(*week_index)?;
            }
            Ok(())
        }
        PlanCommand::RemoveWeek { week_index } => {
            ensure_destructive_edit(level)?;
            plan.week(*week_index)?;
            Ok(())
        }
        PlanCommand::UpdateExerciseParams { coord, .. } => {
            ensure_structural_edit(level)?;
            plan.exercise(coord.week_index, coord.day_of_week, coord.index)?;
            ensure_day_open(plan.day(coord.week_index, coord.day_of_week)?)?;
            Ok(())
        }
        PlanCommand::AddSet { coord, .. }
        | PlanCommand::RemoveSet { coord, .. }
        | PlanCommand::UpdateSet { coord, .. } => {
            ensure_structural_edit(level)?;
            let exercise = plan.exercise(coord.week_index, coord.day_of_week, coord.index)?;
            if exercise.is_pending() {
                return Err(CommandError::PendingParent);
            }
            ensure_day_open(plan.day(coord.week_index, coord.day_of_week)?)?;
            Ok(())
        }
    }
}
