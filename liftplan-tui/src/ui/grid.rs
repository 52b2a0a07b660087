// liftplan-tui/src/ui/grid.rs
use crate::app::{App, Focus};
use liftplan_lib::{Bounds, DayOfWeek, DragItem, DragState, Exercise, ExerciseCoord};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn to_bounds(rect: Rect) -> Bounds {
    Bounds::new(
        f64::from(rect.x),
        f64::from(rect.y),
        f64::from(rect.width),
        f64::from(rect.height),
    )
}

/// One column per day slot of the active week. Every drawn day and
/// exercise row registers its bounds so mouse hit-testing matches the
/// frame exactly.
pub fn render_grid(f: &mut Frame, app: &mut App, area: Rect) {
    app.grid_area = area;
    let week_index = app.session.active_week;
    let Ok(week) = app.session.plan.week(week_index) else {
        return;
    };
    let week = week.clone(); // Short-lived copy; regions need &mut app below

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 7); 7])
        .split(area);

    for (slot, day_of_week) in DayOfWeek::ALL.into_iter().enumerate() {
        let day = week.day(day_of_week);
        let column = columns[slot];

        let selected = app.focus == Focus::Grid && app.selected_day == day_of_week;
        let mut title = format!("{day_of_week}");
        if let Some(tag) = day.tag {
            title.push_str(&format!(" {tag}"));
        }
        if day.is_rest_day {
            title.push_str(" (rest)");
        }
        if day.is_completed() {
            title.push_str(" ✓");
        }

        let border_style = if selected {
            Style::new().fg(Color::Cyan)
        } else if day.is_completed() {
            Style::new().fg(Color::DarkGray)
        } else {
            Style::new()
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style);
        let inner = block.inner(column);
        f.render_widget(block, column);

        // Whole-column droppable (append target, covers empty days)
        app.regions.push_day(week_index, day_of_week, to_bounds(column));

        render_day_rows(f, app, inner, week_index, day_of_week, day, selected);
    }
}

#[allow(clippy::too_many_arguments)]
fn render_day_rows(
    f: &mut Frame,
    app: &mut App,
    inner: Rect,
    week_index: usize,
    day_of_week: DayOfWeek,
    day: &liftplan_lib::Day,
    day_selected: bool,
) {
    if day.is_rest_day {
        f.render_widget(
            Paragraph::new("— rest —").style(Style::new().dim()),
            inner,
        );
        return;
    }

    let indicator = app.session.insertion_point().filter(|p| {
        p.week_index == week_index && p.day_of_week == day_of_week
    });
    let dragged = match app.session.drag.state() {
        DragState::Dragging {
            item: DragItem::InPlan(coord),
            ..
        } => Some(*coord),
        _ => None,
    };

    let mut y = inner.y;
    for (i, exercise) in day.exercises.iter().enumerate() {
        if y >= inner.y + inner.height {
            break;
        }
        if indicator.is_some_and(|p| p.index == i) {
            y = render_indicator(f, inner, y);
            if y >= inner.y + inner.height {
                break;
            }
        }
        let row = Rect::new(inner.x, y, inner.width, 1);
        let coord = ExerciseCoord::new(week_index, day_of_week, i);
        app.regions.push_exercise(coord, to_bounds(row));

        let mut style = Style::new();
        if day_selected && i == app.selected_index {
            style = style.add_modifier(Modifier::REVERSED);
        }
        if exercise.is_pending() {
            style = style.dim();
        }
        if dragged == Some(coord) {
            style = style.italic().fg(Color::Yellow);
        }
        f.render_widget(
            Paragraph::new(exercise_line(exercise)).style(style),
            row,
        );
        y += 1;
    }
    // Append position
    if indicator.is_some_and(|p| p.index >= day.exercises.len()) && y < inner.y + inner.height {
        render_indicator(f, inner, y);
    }
}

fn render_indicator(f: &mut Frame, inner: Rect, y: u16) -> u16 {
    let row = Rect::new(inner.x, y, inner.width, 1);
    f.render_widget(
        Paragraph::new("▶ ━━━━━━━━").style(Style::new().fg(Color::Green)),
        row,
    );
    y + 1
}

fn exercise_line(exercise: &Exercise) -> Line {
    let sets = exercise.sets.len();
    let summary = exercise
        .sets
        .first()
        .map_or_else(String::new, |s| format!(" {sets}×{}-{}", s.reps.min, s.reps.max));
    let marker = if exercise.is_pending() { "…" } else { "" };
    Line::from(vec![
        Span::raw(format!("{} {}", exercise.order, exercise.name)),
        Span::raw(summary).dim(),
        Span::raw(marker.to_string()),
    ])
}
