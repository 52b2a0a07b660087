// liftplan-tui/src/app/state.rs
use anyhow::Result;
use liftplan_lib::{
    DayOfWeek, EditorSession, LibraryExercise, LibraryFilters, Notice, PlanService, RegionMap,
    Severity,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};

/// Which pane has keyboard focus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Library,
    Grid,
}

/// Active modal overlays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActiveModal {
    None,
    Help,
    /// Day menu: pick the destination day for "move all exercises".
    DayMenu {
        week_index: usize,
        day_of_week: DayOfWeek,
        selected: usize,
    },
}

// Holds the application state
pub struct App {
    pub service: PlanService,
    pub session: EditorSession,
    pub should_quit: bool,
    pub active_modal: ActiveModal,
    pub last_status: Option<(Severity, String)>, // For the status bar
    pub status_clear_time: Option<Instant>,

    // === Focus / selection ===
    pub focus: Focus,
    pub selected_day: DayOfWeek,
    /// Selected exercise row within the selected day.
    pub selected_index: usize,

    // === Library pane ===
    pub library: Vec<LibraryExercise>,
    pub library_state: ListState,
    pub library_filter: String,
    pub filter_editing: bool,

    // === Droppable regions, rebuilt on every draw ===
    pub regions: RegionMap,
    pub library_area: Rect,
    pub grid_area: Rect,

    last_refresh: Instant,
}

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(5);
/// Cadence of background plan reloads (multi-editor convergence).
const REFRESH_EVERY: Duration = Duration::from_secs(10);

impl App {
    /// # Errors
    /// Returns an error if the plan or library cannot be loaded.
    pub fn new(service: PlanService, plan_id: i64, user_id: i64) -> Result<Self> {
        let session = service.open_session(plan_id, user_id)?;
        let library = service.search_library(&LibraryFilters::default())?;
        let mut library_state = ListState::default();
        if !library.is_empty() {
            library_state.select(Some(0));
        }
        Ok(Self {
            service,
            session,
            should_quit: false,
            active_modal: ActiveModal::None,
            last_status: None,
            status_clear_time: None,
            focus: Focus::Grid,
            selected_day: DayOfWeek::Monday,
            selected_index: 0,
            library,
            library_state,
            library_filter: String::new(),
            filter_editing: false,
            regions: RegionMap::default(),
            library_area: Rect::default(),
            grid_area: Rect::default(),
            last_refresh: Instant::now(),
        })
    }

    /// Per-frame upkeep: flush throttled indicator work, expire status
    /// text, and occasionally pull remote edits.
    pub fn on_tick(&mut self) {
        let now = Instant::now();
        self.session.tick(now);

        if let Some(clear_time) = self.status_clear_time {
            if now >= clear_time {
                self.last_status = None;
                self.status_clear_time = None;
            }
        }

        if now - self.last_refresh >= REFRESH_EVERY && !self.session.drag.is_dragging() {
            self.last_refresh = now;
            match self.session.refresh(&self.service.conn, now) {
                Ok(true) => self.clamp_selection(),
                Ok(false) => log::debug!("background refresh held back by the mutation layer"),
                Err(err) => {
                    log::warn!("background refresh failed: {err:?}");
                    self.set_status(Severity::Error, err.to_string());
                }
            }
        }
    }

    pub fn set_status(&mut self, severity: Severity, msg: String) {
        self.last_status = Some((severity, msg));
        self.status_clear_time = Some(Instant::now() + STATUS_CLEAR_AFTER);
    }

    pub fn apply_notice(&mut self, notice: Option<Notice>) {
        if let Some(notice) = notice {
            self.set_status(notice.severity, notice.message);
        }
    }

    /// Re-fetches the library list with the current filter text.
    pub fn reload_library(&mut self) {
        let filters = LibraryFilters {
            query: if self.library_filter.is_empty() {
                None
            } else {
                Some(self.library_filter.as_str())
            },
            ..LibraryFilters::default()
        };
        match self.service.search_library(&filters) {
            Ok(list) => {
                self.library = list;
                let selected = self
                    .library_state
                    .selected()
                    .map_or(0, |i| i.min(self.library.len().saturating_sub(1)));
                self.library_state
                    .select(if self.library.is_empty() { None } else { Some(selected) });
            }
            Err(err) => self.set_status(Severity::Error, err.to_string()),
        }
    }

    /// Keeps the cursor inside the current day's exercise list after
    /// the hierarchy changed under it.
    pub fn clamp_selection(&mut self) {
        self.session.active_week = self
            .session
            .active_week
            .min(self.session.plan.weeks.len().saturating_sub(1));
        let len = self
            .session
            .plan
            .day(self.session.active_week, self.selected_day)
            .map_or(0, |d| d.exercises.len());
        self.selected_index = self.selected_index.min(len.saturating_sub(1));
    }
}
