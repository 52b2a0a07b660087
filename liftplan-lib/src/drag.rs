//src/drag.rs
use crate::keys::ExerciseCoord;
use crate::model::{DayOfWeek, LibraryExercise};
use std::time::{Duration, Instant};

/// Pointer position in whatever space the frontend renders (pixels in a
/// browser-like host, cells in the TUI). Only distances and containment
/// are computed on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }
}

/// Axis-aligned droppable region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// Which kind of input started the gesture. Mouse drags activate on
/// travelled distance; touch drags activate on hold duration, so a
/// scroll-swipe is not mistaken for a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

/// The thing being dragged: a library exercise not yet in the plan, or
/// an in-plan exercise identified by its coordinate.
#[derive(Debug, Clone, PartialEq)]
pub enum DragItem {
    Library(LibraryExercise),
    InPlan(ExerciseCoord),
}

/// Current droppable under the pointer: a whole day container, or a
/// specific in-plan exercise acting as a reorder anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTarget {
    Day {
        week_index: usize,
        day_of_week: DayOfWeek,
    },
    Exercise(ExerciseCoord),
}

impl HoverTarget {
    /// The day the target belongs to.
    #[must_use]
    pub const fn day_coord(&self) -> (usize, DayOfWeek) {
        match self {
            Self::Day {
                week_index,
                day_of_week,
            } => (*week_index, *day_of_week),
            Self::Exercise(coord) => (coord.week_index, coord.day_of_week),
        }
    }
}

/// Droppable regions registered for the current frame. Rebuilt by the
/// rendering layer on every draw, so hit-testing always runs against
/// what is actually on screen.
#[derive(Debug, Default)]
pub struct RegionMap {
    days: Vec<(usize, DayOfWeek, Bounds)>,
    exercises: Vec<(ExerciseCoord, Bounds)>,
}

impl RegionMap {
    pub fn clear(&mut self) {
        self.days.clear();
        self.exercises.clear();
    }

    pub fn push_day(&mut self, week_index: usize, day_of_week: DayOfWeek, bounds: Bounds) {
        self.days.push((week_index, day_of_week, bounds));
    }

    pub fn push_exercise(&mut self, coord: ExerciseCoord, bounds: Bounds) {
        self.exercises.push((coord, bounds));
    }

    /// Pointer-within collision: the target is whichever region actually
    /// contains the pointer, not the nearest-center one. Exercise rows
    /// win over their enclosing day container.
    #[must_use]
    pub fn hit_test(&self, p: Point) -> Option<HoverTarget> {
        if let Some((coord, _)) = self.exercises.iter().find(|(_, b)| b.contains(p)) {
            return Some(HoverTarget::Exercise(*coord));
        }
        self.days
            .iter()
            .find(|(_, _, b)| b.contains(p))
            .map(|&(week_index, day_of_week, _)| HoverTarget::Day {
                week_index,
                day_of_week,
            })
    }
}

/// Activation gates distinguishing a drag gesture from a tap/click.
#[derive(Debug, Clone, Copy)]
pub struct DragThresholds {
    /// Minimum pointer travel before a mouse press becomes a drag.
    pub activation_distance: f64,
    /// Minimum hold before a touch press becomes a drag.
    pub touch_hold: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    /// Pressed, but the activation gate has not been passed yet.
    Pending {
        item: DragItem,
        kind: PointerKind,
        origin: Point,
        pressed_at: Instant,
    },
    Dragging {
        item: DragItem,
        pointer: Point,
        hover: Option<HoverTarget>,
    },
}

/// Emitted by `pointer_up` when an active drag ends over the tracked
/// regions. `hover == None` means the pointer was released outside every
/// droppable; the drop is then a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub item: DragItem,
    pub hover: Option<HoverTarget>,
}

/// Idle → Pending → Dragging → Idle state machine around pointer/touch
/// input. Only one drag session exists at a time; cancellation at any
/// point leaves no side effects because no command is produced until a
/// drop resolves.
#[derive(Debug)]
pub struct DragController {
    thresholds: DragThresholds,
    state: DragState,
}

impl DragController {
    #[must_use]
    pub const fn new(thresholds: DragThresholds) -> Self {
        Self {
            thresholds,
            state: DragState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &DragState {
        &self.state
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    #[must_use]
    pub fn active_item(&self) -> Option<&DragItem> {
        match &self.state {
            DragState::Dragging { item, .. } => Some(item),
            _ => None,
        }
    }

    #[must_use]
    pub fn hover(&self) -> Option<HoverTarget> {
        match &self.state {
            DragState::Dragging { hover, .. } => *hover,
            _ => None,
        }
    }

    /// A press on a draggable. Ignored while a session is already open.
    pub fn pointer_down(&mut self, item: DragItem, kind: PointerKind, at: Point, now: Instant) {
        if matches!(self.state, DragState::Idle) {
            self.state = DragState::Pending {
                item,
                kind,
                origin: at,
                pressed_at: now,
            };
        }
    }

    /// Returns true when the hover target (or activation state) changed,
    /// so callers know a reindex pass is due.
    pub fn pointer_move(&mut self, at: Point, now: Instant, regions: &RegionMap) -> bool {
        match &self.state {
            DragState::Idle => false,
            DragState::Pending {
                item,
                kind,
                origin,
                pressed_at,
            } => {
                let activated = match kind {
                    PointerKind::Mouse => {
                        origin.distance_to(at) >= self.thresholds.activation_distance
                    }
                    PointerKind::Touch => now - *pressed_at >= self.thresholds.touch_hold,
                };
                if activated {
                    self.state = DragState::Dragging {
                        item: item.clone(),
                        pointer: at,
                        hover: regions.hit_test(at),
                    };
                    true
                } else {
                    false
                }
            }
            DragState::Dragging { item, hover, .. } => {
                let new_hover = regions.hit_test(at);
                let changed = new_hover != *hover;
                self.state = DragState::Dragging {
                    item: item.clone(),
                    pointer: at,
                    hover: new_hover,
                };
                changed
            }
        }
    }

    /// Ends the session. A release while still `Pending` was a tap, not
    /// a drag, and produces nothing.
    pub fn pointer_up(&mut self, at: Point, regions: &RegionMap) -> Option<DropEvent> {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        match state {
            DragState::Dragging { item, .. } => Some(DropEvent {
                item,
                hover: regions.hit_test(at),
            }),
            _ => None,
        }
    }

    /// Aborts the session (escape, focus loss) with zero side effects.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
