//src/insertion.rs
use crate::drag::{DragController, DragItem, HoverTarget};
use crate::model::{DayOfWeek, Plan};
use std::time::{Duration, Instant};

/// Where the dragged item would land if dropped right now; drives the
/// visual insertion indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    pub week_index: usize,
    pub day_of_week: DayOfWeek,
    /// 0-based index within the hovered day's exercise list.
    pub index: usize,
}

/// Throttled insertion-index computation.
///
/// Pointer-move fires far more often than the hierarchy needs to
/// re-render, so recomputation runs at a fixed cadence: a move landing
/// inside the window only marks a recompute as pending, and `tick`
/// flushes it once the window elapses. `cancel` discards both the
/// current indicator and any pending recompute, which is what prevents a
/// stale indicator flashing up after the drop already happened.
#[derive(Debug)]
pub struct IndicatorCalculator {
    interval: Duration,
    last_computed: Option<Instant>,
    pending: bool,
    current: Option<InsertionPoint>,
}

impl IndicatorCalculator {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_computed: None,
            pending: false,
            current: None,
        }
    }

    #[must_use]
    pub const fn current(&self) -> Option<InsertionPoint> {
        self.current
    }

    /// Called on every pointer move while a drag session is open.
    pub fn on_pointer(&mut self, plan: &Plan, drag: &DragController, now: Instant) {
        if self
            .last_computed
            .is_some_and(|last| now - last < self.interval)
        {
            self.pending = true;
            return;
        }
        self.recompute(plan, drag, now);
    }

    /// Flushes a pending recompute once the throttle window has elapsed.
    pub fn tick(&mut self, plan: &Plan, drag: &DragController, now: Instant) {
        if !self.pending {
            return;
        }
        if self
            .last_computed
            .is_some_and(|last| now - last < self.interval)
        {
            return;
        }
        self.pending = false;
        self.recompute(plan, drag, now);
    }

    /// Drops the indicator and any pending recompute. Must run the
    /// instant a drag ends so no late callback re-applies stale state.
    pub fn cancel(&mut self) {
        self.pending = false;
        self.current = None;
        self.last_computed = None;
    }

    fn recompute(&mut self, plan: &Plan, drag: &DragController, now: Instant) {
        self.last_computed = Some(now);
        self.pending = false;
        self.current = match (drag.active_item(), drag.hover()) {
            (Some(item), Some(hover)) => compute_insertion(plan, item, &hover),
            _ => None,
        };
    }
}

/// Pure insertion-index rule set:
/// - hovered day missing (stale) or a rest day: no indicator;
/// - dragging an in-plan exercise over its own day: suppressed, the
///   sortable list already previews the reorder;
/// - over a specific exercise: insert-before, so that exercise's index;
/// - over the day container (including an empty day): append.
#[must_use]
pub fn compute_insertion(
    plan: &Plan,
    item: &DragItem,
    hover: &HoverTarget,
) -> Option<InsertionPoint> {
    let (week_index, day_of_week) = hover.day_coord();
    let day = plan.day(week_index, day_of_week).ok()?;
    if day.is_rest_day {
        return None;
    }
    if let DragItem::InPlan(origin) = item {
        if origin.week_index == week_index && origin.day_of_week == day_of_week {
            return None;
        }
    }
    let index = match hover {
        HoverTarget::Exercise(coord) => coord.index.min(day.exercises.len()),
        HoverTarget::Day { .. } => day.exercises.len(),
    };
    Some(InsertionPoint {
        week_index,
        day_of_week,
        index,
    })
}
