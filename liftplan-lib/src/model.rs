//src/model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

pub const DAYS_PER_WEEK: usize = 7;

/// Identity of a persisted or not-yet-persisted entity.
///
/// `Temp` ids are client-generated while a create mutation is in flight;
/// the reconciliation layer swaps them for `Db` ids once the server
/// response arrives (see `Plan::assign_ids`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Db(i64),
    Temp(u64),
}

impl EntityId {
    #[must_use]
    pub const fn is_temp(&self) -> bool {
        matches!(self, Self::Temp(_))
    }

    #[must_use]
    pub const fn as_db(&self) -> Option<i64> {
        match self {
            Self::Db(id) => Some(*id),
            Self::Temp(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Db(id) => write!(f, "{id}"),
            Self::Temp(t) => write!(f, "tmp-{t}"),
        }
    }
}

/// Generator for client-side temporary ids.
#[derive(Debug, Default)]
pub struct TempIds {
    next: u64,
}

impl TempIds {
    pub fn next_id(&mut self) -> EntityId {
        self.next += 1;
        EntityId::Temp(self.next)
    }
}

/// Day-of-week slot, Monday = 0 .. Sunday = 6.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [Self; DAYS_PER_WEEK] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Optional workout-type tag on a day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum WorkoutTag {
    Push,
    Pull,
    Legs,
    UpperBody,
    LowerBody,
    FullBody,
    Cardio,
    Mobility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepRange {
    pub min: u32,
    pub max: u32,
}

impl RepRange {
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Set {
    pub id: EntityId,
    pub order: u32,
    pub reps: RepRange,
    pub weight: Option<f64>,
    pub rpe: Option<f64>,
}

/// Per-exercise tuning parameters, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseParams {
    pub rest_seconds: Option<u32>,
    pub tempo: Option<String>,
    pub warmup_sets: Option<u32>,
    pub instructions: Option<String>,
}

/// A catalogue entry from the exercise library, as returned by the
/// library lookup. Dragging one into the plan instantiates an
/// `Exercise` referencing it through `base_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryExercise {
    pub id: i64,
    pub name: String,
    pub equipment: Option<String>,
    pub muscle_groups: Vec<String>,
}

/// An exercise instance placed in a plan day, distinct from the library
/// exercise (`base_id`) it was instantiated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: EntityId,
    pub base_id: i64,
    pub name: String,
    /// Dense 1-based position within the owning day.
    pub order: u32,
    pub params: ExerciseParams,
    pub sets: Vec<Set>,
}

impl Exercise {
    /// True while the exercise's create mutation has not resolved yet.
    /// Sets under a pending exercise are read-only.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.id.is_temp()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub id: EntityId,
    pub day_of_week: DayOfWeek,
    pub is_rest_day: bool,
    pub tag: Option<WorkoutTag>,
    pub completed_at: Option<DateTime<Utc>>,
    pub exercises: Vec<Exercise>,
}

impl Day {
    #[must_use]
    pub fn new(id: EntityId, day_of_week: DayOfWeek) -> Self {
        Self {
            id,
            day_of_week,
            is_rest_day: false,
            tag: None,
            completed_at: None,
            exercises: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    pub id: EntityId,
    /// 1-based, unique within the plan.
    pub week_number: u32,
    /// Exactly 7 days, one per slot, stored Monday..Sunday.
    pub days: Vec<Day>,
}

impl Week {
    /// Builds a week with 7 empty days in slot order.
    #[must_use]
    pub fn empty(id: EntityId, week_number: u32, ids: &mut TempIds) -> Self {
        let days = DayOfWeek::ALL
            .iter()
            .map(|&dow| Day::new(ids.next_id(), dow))
            .collect();
        Self {
            id,
            week_number,
            days,
        }
    }

    #[must_use]
    pub fn day(&self, dow: DayOfWeek) -> &Day {
        &self.days[dow.index()]
    }

    pub fn day_mut(&mut self, dow: DayOfWeek) -> &mut Day {
        &mut self.days[dow.index()]
    }
}

/// Patch applied to a day by `Plan::update_day`. `tag` uses a double
/// option so "set to None" and "leave unchanged" stay distinct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayPatch {
    pub is_rest_day: Option<bool>,
    pub tag: Option<Option<WorkoutTag>>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Week index {0} out of range")]
    WeekOutOfRange(usize),
    #[error("Day slot {0} out of range")]
    DayOutOfRange(usize),
    #[error("Exercise index {index} out of range in week {week}, day {day}")]
    ExerciseOutOfRange {
        week: usize,
        day: usize,
        index: usize,
    },
    #[error("Set index {0} out of range")]
    SetOutOfRange(usize),
    #[error("Plan must keep at least one week")]
    LastWeek,
}

/// Root aggregate for one training plan.
///
/// All structural operations are pure: they return a new hierarchy and
/// never mutate shared state in place, so callers can compare before and
/// after cheaply and keep scoped snapshots for rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub title: String,
    pub is_draft: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub weeks: Vec<Week>,
}

impl Plan {
    /// # Errors
    /// `ModelError::WeekOutOfRange` if `index` is invalid.
    pub fn week(&self, index: usize) -> Result<&Week, ModelError> {
        self.weeks.get(index).ok_or(ModelError::WeekOutOfRange(index))
    }

    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn day(&self, week_index: usize, dow: DayOfWeek) -> Result<&Day, ModelError> {
        Ok(self.week(week_index)?.day(dow))
    }

    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn exercise(
        &self,
        week_index: usize,
        dow: DayOfWeek,
        index: usize,
    ) -> Result<&Exercise, ModelError> {
        self.day(week_index, dow)?
            .exercises
            .get(index)
            .ok_or(ModelError::ExerciseOutOfRange {
                week: week_index,
                day: dow.index(),
                index,
            })
    }

    #[must_use]
    pub fn total_exercises(&self) -> usize {
        self.weeks
            .iter()
            .flat_map(|w| &w.days)
            .map(|d| d.exercises.len())
            .sum()
    }

    /// Appends a new empty week after the last one.
    #[must_use]
    pub fn add_week(&self, ids: &mut TempIds) -> Self {
        let mut plan = self.clone();
        let number = plan.weeks.len() as u32 + 1;
        plan.weeks.push(Week::empty(ids.next_id(), number, ids));
        plan
    }

    /// Removes a week and renumbers the remainder.
    ///
    /// # Errors
    /// `WeekOutOfRange` for a bad index; `LastWeek` when only one week
    /// remains (a plan is never empty).
    pub fn remove_week(&self, week_index: usize) -> Result<Self, ModelError> {
        self.week(week_index)?;
        if self.weeks.len() == 1 {
            return Err(ModelError::LastWeek);
        }
        let mut plan = self.clone();
        plan.weeks.remove(week_index);
        plan.renumber_weeks();
        Ok(plan)
    }

    /// Deep-clones a week with freshly assigned (temporary) identifiers
    /// for the week, its days, exercises and sets, inserting it
    /// immediately after the source week. Completion marks are not
    /// carried over: the clone starts unfinished.
    ///
    /// # Errors
    /// `WeekOutOfRange` for a bad index.
    pub fn clone_week(&self, week_index: usize, ids: &mut TempIds) -> Result<Self, ModelError> {
        let source = self.week(week_index)?;
        let mut copy = source.clone();
        copy.id = ids.next_id();
        for day in &mut copy.days {
            day.id = ids.next_id();
            day.completed_at = None;
            for exercise in &mut day.exercises {
                exercise.id = ids.next_id();
                for set in &mut exercise.sets {
                    set.id = ids.next_id();
                }
            }
        }
        let mut plan = self.clone();
        plan.weeks.insert(week_index + 1, copy);
        plan.renumber_weeks();
        Ok(plan)
    }

    /// Applies a rest-flag / workout-tag patch to a day. Marking a day
    /// as a rest day clears its exercise list.
    ///
    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn update_day(
        &self,
        week_index: usize,
        dow: DayOfWeek,
        patch: &DayPatch,
    ) -> Result<Self, ModelError> {
        self.day(week_index, dow)?;
        let mut plan = self.clone();
        let day = plan.weeks[week_index].day_mut(dow);
        if let Some(rest) = patch.is_rest_day {
            day.is_rest_day = rest;
            if rest {
                day.exercises.clear();
            }
        }
        if let Some(tag) = patch.tag {
            day.tag = tag;
        }
        Ok(plan)
    }

    /// Inserts an exercise into a day at a 0-based index, clamped to
    /// `[0, len]`, and renumbers the day.
    ///
    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn add_exercise(
        &self,
        week_index: usize,
        dow: DayOfWeek,
        exercise: Exercise,
        index: usize,
    ) -> Result<Self, ModelError> {
        self.day(week_index, dow)?;
        let mut plan = self.clone();
        let day = plan.weeks[week_index].day_mut(dow);
        let at = index.min(day.exercises.len());
        day.exercises.insert(at, exercise);
        renumber_day(day);
        Ok(plan)
    }

    /// Removes the exercise at `index` and renumbers the day.
    ///
    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn remove_exercise(
        &self,
        week_index: usize,
        dow: DayOfWeek,
        index: usize,
    ) -> Result<Self, ModelError> {
        self.exercise(week_index, dow, index)?;
        let mut plan = self.clone();
        let day = plan.weeks[week_index].day_mut(dow);
        day.exercises.remove(index);
        renumber_day(day);
        Ok(plan)
    }

    /// Moves one exercise between (or within) days. The item is removed
    /// from the source first, then inserted at `to_index` clamped to the
    /// destination length; when source and destination are the same day
    /// the clamp runs against the post-removal length, which is what
    /// keeps same-day moves free of off-by-one drift.
    ///
    /// # Errors
    /// `ModelError` variants for invalid source coordinates.
    #[allow(clippy::too_many_arguments)]
    pub fn move_exercise(
        &self,
        from_week: usize,
        from_dow: DayOfWeek,
        from_index: usize,
        to_week: usize,
        to_dow: DayOfWeek,
        to_index: usize,
    ) -> Result<Self, ModelError> {
        self.exercise(from_week, from_dow, from_index)?;
        self.day(to_week, to_dow)?;
        let mut plan = self.clone();
        let item = plan.weeks[from_week]
            .day_mut(from_dow)
            .exercises
            .remove(from_index);
        renumber_day(plan.weeks[from_week].day_mut(from_dow));
        let dest = plan.weeks[to_week].day_mut(to_dow);
        let at = to_index.min(dest.exercises.len());
        dest.exercises.insert(at, item);
        renumber_day(dest);
        Ok(plan)
    }

    /// Replaces the tuning parameters of one exercise.
    ///
    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn update_exercise_params(
        &self,
        week_index: usize,
        dow: DayOfWeek,
        index: usize,
        params: ExerciseParams,
    ) -> Result<Self, ModelError> {
        self.exercise(week_index, dow, index)?;
        let mut plan = self.clone();
        plan.weeks[week_index].day_mut(dow).exercises[index].params = params;
        Ok(plan)
    }

    /// Appends a set to an exercise and renumbers the set list.
    ///
    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn add_set(
        &self,
        week_index: usize,
        dow: DayOfWeek,
        index: usize,
        set: Set,
    ) -> Result<Self, ModelError> {
        self.exercise(week_index, dow, index)?;
        let mut plan = self.clone();
        let exercise = &mut plan.weeks[week_index].day_mut(dow).exercises[index];
        exercise.sets.push(set);
        renumber_sets(exercise);
        Ok(plan)
    }

    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn remove_set(
        &self,
        week_index: usize,
        dow: DayOfWeek,
        index: usize,
        set_index: usize,
    ) -> Result<Self, ModelError> {
        let exercise = self.exercise(week_index, dow, index)?;
        if set_index >= exercise.sets.len() {
            return Err(ModelError::SetOutOfRange(set_index));
        }
        let mut plan = self.clone();
        let exercise = &mut plan.weeks[week_index].day_mut(dow).exercises[index];
        exercise.sets.remove(set_index);
        renumber_sets(exercise);
        Ok(plan)
    }

    /// # Errors
    /// `ModelError` variants for invalid coordinates.
    pub fn update_set(
        &self,
        week_index: usize,
        dow: DayOfWeek,
        index: usize,
        set_index: usize,
        reps: RepRange,
        weight: Option<f64>,
        rpe: Option<f64>,
    ) -> Result<Self, ModelError> {
        let exercise = self.exercise(week_index, dow, index)?;
        if set_index >= exercise.sets.len() {
            return Err(ModelError::SetOutOfRange(set_index));
        }
        let mut plan = self.clone();
        let set = &mut plan.weeks[week_index].day_mut(dow).exercises[index].sets[set_index];
        set.reps = reps;
        set.weight = weight;
        set.rpe = rpe;
        Ok(plan)
    }

    /// Swaps temporary ids for server-assigned ids across the whole
    /// tree. Reconciliation-only: this is the one in-place mutation the
    /// model allows, because identity substitution must not look like a
    /// structural change.
    pub fn assign_ids(&mut self, assignments: &[(u64, i64)]) {
        let resolve = |id: &mut EntityId| {
            if let EntityId::Temp(t) = *id {
                if let Some(&(_, db)) = assignments.iter().find(|(temp, _)| *temp == t) {
                    *id = EntityId::Db(db);
                }
            }
        };
        for week in &mut self.weeks {
            resolve(&mut week.id);
            for day in &mut week.days {
                resolve(&mut day.id);
                for exercise in &mut day.exercises {
                    resolve(&mut exercise.id);
                    for set in &mut exercise.sets {
                        resolve(&mut set.id);
                    }
                }
            }
        }
    }

    fn renumber_weeks(&mut self) {
        for (i, week) in self.weeks.iter_mut().enumerate() {
            week.week_number = i as u32 + 1;
        }
    }
}

fn renumber_day(day: &mut Day) {
    for (i, exercise) in day.exercises.iter_mut().enumerate() {
        exercise.order = i as u32 + 1;
    }
}

fn renumber_sets(exercise: &mut Exercise) {
    for (i, set) in exercise.sets.iter_mut().enumerate() {
        set.order = i as u32 + 1;
    }
}
