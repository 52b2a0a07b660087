// liftplan-tui/src/app/input.rs
use super::actions::{
    add_selected_exercise, add_week, clone_week, confirm_day_menu, cycle_tag, move_selected,
    refresh_now, remove_selected, remove_week, toggle_completed, toggle_rest_day,
};
use super::state::{ActiveModal, App, Focus};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use liftplan_lib::{DayOfWeek, DragItem, HoverTarget, Point, PointerKind, DAYS_PER_WEEK};
use std::time::Instant;

// Main key event handler method on App
impl App {
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        // Handle based on active modal first
        if self.active_modal != ActiveModal::None {
            self.handle_modal_input(key);
            return Ok(());
        }
        if self.filter_editing {
            self.handle_filter_input(key);
            return Ok(());
        }

        // Global keys
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.active_modal = ActiveModal::Help,
            KeyCode::Esc => self.session.cancel_drag(),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Library => Focus::Grid,
                    Focus::Grid => Focus::Library,
                };
            }
            KeyCode::Char('[') => {
                self.session.prev_week();
                self.clamp_selection();
            }
            KeyCode::Char(']') => {
                self.session.next_week();
                self.clamp_selection();
            }
            KeyCode::Char('n') => add_week(self),
            KeyCode::Char('x') => remove_week(self),
            KeyCode::Char('c') => clone_week(self),
            KeyCode::Char('g') => refresh_now(self),
            KeyCode::Char('/') => {
                self.focus = Focus::Library;
                self.filter_editing = true;
            }
            _ => match self.focus {
                Focus::Library => self.handle_library_input(key),
                Focus::Grid => self.handle_grid_input(key),
            },
        }
        Ok(())
    }

    // --- Modal Input Handling ---
    fn handle_modal_input(&mut self, key: KeyEvent) {
        match &mut self.active_modal {
            ActiveModal::Help => match key.code {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter | KeyCode::Char('?') => {
                    self.active_modal = ActiveModal::None;
                }
                _ => {} // Ignore other keys in help
            },
            ActiveModal::DayMenu { selected, .. } => match key.code {
                KeyCode::Esc => self.active_modal = ActiveModal::None,
                KeyCode::Char('k') | KeyCode::Up => {
                    *selected = selected.checked_sub(1).unwrap_or(DAYS_PER_WEEK - 1);
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    *selected = (*selected + 1) % DAYS_PER_WEEK;
                }
                KeyCode::Enter => {
                    if let Some(dest) = DayOfWeek::from_index(*selected) {
                        confirm_day_menu(self, dest);
                    }
                }
                _ => {}
            },
            ActiveModal::None => {}
        }
    }

    fn handle_filter_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.filter_editing = false,
            KeyCode::Backspace => {
                self.library_filter.pop();
                self.reload_library();
            }
            KeyCode::Char(c) => {
                self.library_filter.push(c);
                self.reload_library();
            }
            _ => {}
        }
    }

    // --- Pane-specific handling ---
    fn handle_library_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('k') | KeyCode::Up => self.library_previous(),
            KeyCode::Char('j') | KeyCode::Down => self.library_next(),
            KeyCode::Char('a') | KeyCode::Enter => add_selected_exercise(self),
            _ => {}
        }
    }

    fn handle_grid_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => {
                let i = self.selected_day.index();
                self.selected_day = DayOfWeek::from_index(i.checked_sub(1).unwrap_or(DAYS_PER_WEEK - 1))
                    .unwrap_or(self.selected_day);
                self.selected_index = 0;
                self.clamp_selection();
            }
            KeyCode::Char('l') | KeyCode::Right => {
                let i = (self.selected_day.index() + 1) % DAYS_PER_WEEK;
                self.selected_day = DayOfWeek::from_index(i).unwrap_or(self.selected_day);
                self.selected_index = 0;
                self.clamp_selection();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_index = self.selected_index.saturating_sub(1);
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.selected_index += 1;
                self.clamp_selection();
            }
            KeyCode::Char('K') => move_selected(self, -1),
            KeyCode::Char('J') => move_selected(self, 1),
            KeyCode::Char('a') => add_selected_exercise(self),
            KeyCode::Char('d') | KeyCode::Delete => remove_selected(self),
            KeyCode::Char('r') => toggle_rest_day(self),
            KeyCode::Char('t') => cycle_tag(self),
            KeyCode::Char('C') => toggle_completed(self),
            KeyCode::Char('m') => {
                self.active_modal = ActiveModal::DayMenu {
                    week_index: self.session.active_week,
                    day_of_week: self.selected_day,
                    selected: self.selected_day.index(),
                };
            }
            _ => {}
        }
    }

    fn library_previous(&mut self) {
        if self.library.is_empty() {
            return;
        }
        let i = self.library_state.selected().unwrap_or(0);
        self.library_state
            .select(Some(i.checked_sub(1).unwrap_or(self.library.len() - 1)));
    }

    fn library_next(&mut self) {
        if self.library.is_empty() {
            return;
        }
        let i = self.library_state.selected().unwrap_or(0);
        self.library_state.select(Some((i + 1) % self.library.len()));
    }

    // --- Mouse handling: drives the drag state machine ---
    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        let at = Point::new(f64::from(mouse.column), f64::from(mouse.row));
        let now = Instant::now();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.mouse_down(at, mouse, now),
            MouseEventKind::Drag(MouseButton::Left) => {
                self.session.pointer_move(at, now, &self.regions);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let notice = self.session.pointer_up(&self.service.conn, at, &self.regions);
                self.apply_notice(notice);
                self.clamp_selection();
            }
            MouseEventKind::ScrollUp => {
                if self.point_in_library(mouse.column, mouse.row) {
                    self.library_previous();
                }
            }
            MouseEventKind::ScrollDown => {
                if self.point_in_library(mouse.column, mouse.row) {
                    self.library_next();
                }
            }
            _ => {}
        }
    }

    fn mouse_down(&mut self, at: Point, mouse: MouseEvent, now: Instant) {
        if self.point_in_library(mouse.column, mouse.row) {
            self.focus = Focus::Library;
            if let Some(index) = self.library_row_at(mouse.row) {
                self.library_state.select(Some(index));
                let item = DragItem::Library(self.library[index].clone());
                self.session.pointer_down(item, PointerKind::Mouse, at, now);
            }
            return;
        }
        self.focus = Focus::Grid;
        if let Some(HoverTarget::Exercise(coord)) = self.regions.hit_test(at) {
            if coord.week_index == self.session.active_week {
                self.selected_day = coord.day_of_week;
                self.selected_index = coord.index;
            }
            self.session
                .pointer_down(DragItem::InPlan(coord), PointerKind::Mouse, at, now);
        } else if let Some(HoverTarget::Day { day_of_week, .. }) = self.regions.hit_test(at) {
            self.selected_day = day_of_week;
            self.selected_index = 0;
            self.clamp_selection();
        }
    }

    fn point_in_library(&self, column: u16, row: u16) -> bool {
        let a = self.library_area;
        column >= a.x && column < a.x + a.width && row >= a.y && row < a.y + a.height
    }

    /// Maps a terminal row inside the library pane to a list index,
    /// accounting for the block border and list scroll offset.
    fn library_row_at(&self, row: u16) -> Option<usize> {
        let inner_top = self.library_area.y + 1;
        if row < inner_top {
            return None;
        }
        let index = self.library_state.offset() + usize::from(row - inner_top);
        (index < self.library.len()).then_some(index)
    }
}
