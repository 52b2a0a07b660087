//src/keys.rs
use crate::model::{DayOfWeek, Plan};
use std::fmt;

/// Logical position of one exercise inside the plan hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExerciseCoord {
    pub week_index: usize,
    pub day_of_week: DayOfWeek,
    pub index: usize,
}

impl ExerciseCoord {
    #[must_use]
    pub const fn new(week_index: usize, day_of_week: DayOfWeek, index: usize) -> Self {
        Self {
            week_index,
            day_of_week,
            index,
        }
    }

    #[must_use]
    pub const fn same_day(&self, other: &Self) -> bool {
        self.week_index == other.week_index
            && self.day_of_week as usize == other.day_of_week as usize
    }
}

/// Positionally-stable drag identity, rendered as
/// `{weekIndex}-{dayOfWeek}-{exerciseIndex}`.
///
/// Derived from coordinates, never from persisted ids, so an active drag
/// session survives background refetches that replace every object in
/// the hierarchy. Two exercises can never collide on a key at the same
/// instant; a single exercise's key changes the moment it moves. The key
/// is recomputed every render and must never be persisted or sent to the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StableKey(String);

impl StableKey {
    #[must_use]
    pub fn for_coord(coord: ExerciseCoord) -> Self {
        Self(format!(
            "{}-{}-{}",
            coord.week_index,
            coord.day_of_week.index(),
            coord.index
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recomputes the key of every draggable exercise in the current
/// hierarchy, in render order.
#[must_use]
pub fn resolve_keys(plan: &Plan) -> Vec<(StableKey, ExerciseCoord)> {
    let mut keys = Vec::with_capacity(plan.total_exercises());
    for (week_index, week) in plan.weeks.iter().enumerate() {
        for day in &week.days {
            for index in 0..day.exercises.len() {
                let coord = ExerciseCoord::new(week_index, day.day_of_week, index);
                keys.push((StableKey::for_coord(coord), coord));
            }
        }
    }
    keys
}
