// liftplan-tui/src/ui/layout.rs
use crate::{
    app::{ActiveModal, App},
    ui::{
        grid::render_grid, library::render_library, modals::render_modal,
        status_bar::render_status_bar,
    },
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::str::FromStr;

pub fn render_ui(f: &mut Frame, app: &mut App) {
    let size = f.size();

    // Droppable regions are rebuilt from what this frame actually draws
    app.regions.clear();

    // Header on top, content below, status bar at bottom
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status Bar
        ])
        .split(size);

    render_header(f, app, main_chunks[0]);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(main_chunks[1]);

    render_library(f, app, content_chunks[0]);
    render_grid(f, app, content_chunks[1]);
    render_status_bar(f, app, main_chunks[2]);

    // Render modal last if active
    if app.active_modal != ActiveModal::None {
        render_modal(f, app);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let plan = &app.session.plan;
    let week = app.session.active_week + 1;
    let header_color =
        Color::from_str(&app.service.config.theme.header_color).unwrap_or(Color::Green);
    let mut spans = vec![
        Span::styled(plan.title.clone(), Style::new().fg(header_color).bold()),
        Span::raw(format!("  Week {week}/{}", plan.weeks.len())),
        Span::raw(format!("  [{}]", app.session.permission)),
    ];
    if plan.is_draft {
        spans.push(Span::raw("  (draft)").italic());
    }
    if app.session.mutations.pending_count() > 0 {
        spans.push(Span::raw("  saving…").yellow());
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Helper function to create a centered rectangle for modals
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
