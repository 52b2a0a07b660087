// liftplan-tui/src/ui/status_bar.rs
use crate::app::{ActiveModal, App, Focus};
use liftplan_lib::Severity;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

pub fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let status_text = match app.active_modal {
        ActiveModal::None => {
            if app.filter_editing {
                " Type to filter | [Esc/Enter] Done ".to_string()
            } else {
                match app.focus {
                    Focus::Library => "[↑↓/jk] Nav | [a/Enter] Add to Day | [/] Filter | [Tab] Grid | [?] Help | [q]uit ".to_string(),
                    Focus::Grid => "[hjkl] Nav | [JK] Reorder | [a]dd | [d]elete | [r]est | [t]ag | [m]ove day | [n/x/c] Week | [[/]] Week Nav | [?] Help | [q]uit ".to_string(),
                }
            }
        }
        ActiveModal::Help => " [Esc/Enter/?] Close Help ".to_string(),
        ActiveModal::DayMenu { .. } => " [↑↓/jk] Pick Day | [Enter] Move Exercises | [Esc] Cancel ".to_string(),
    };

    let status_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let status_paragraph =
        Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(status_paragraph, status_chunks[0]);

    let (notice_text, notice_fg) = match &app.last_status {
        Some((Severity::Error, msg)) => (msg.as_str(), Color::Red),
        Some((Severity::Warning, msg)) => (msg.as_str(), Color::Yellow),
        Some((Severity::Info, msg)) => (msg.as_str(), Color::White),
        None => ("", Color::White),
    };
    let notice_paragraph = Paragraph::new(notice_text)
        .style(Style::default().bg(Color::DarkGray).fg(notice_fg))
        .alignment(ratatui::layout::Alignment::Right);
    f.render_widget(notice_paragraph, status_chunks[1]);
}
