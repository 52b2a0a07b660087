// liftplan-tui/src/ui/modals.rs
use crate::{
    app::{ActiveModal, App},
    ui::layout::centered_rect,
};
use liftplan_lib::DayOfWeek;
use ratatui::{
    style::{Color, Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

pub fn render_modal(f: &mut Frame, app: &App) {
    match &app.active_modal {
        ActiveModal::Help => render_help_modal(f),
        ActiveModal::DayMenu { .. } => render_day_menu_modal(f, app),
        ActiveModal::None => {}
    }
}

fn render_help_modal(f: &mut Frame) {
    let block = Block::default()
        .title("Help (?)")
        .borders(Borders::ALL)
        .title_style(Style::new().bold())
        .border_style(Style::new().yellow());
    let area = centered_rect(60, 70, f.size());
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let help_text = vec![
        Line::from("--- Global ---").style(Style::new().bold().underlined()),
        Line::from(" q: Quit Application"),
        Line::from(" ?: Show/Hide This Help"),
        Line::from(" Tab: Switch Focus (Library <=> Week Grid)"),
        Line::from(" [ / ]: Previous / Next Week"),
        Line::from(" n: Add Week   x: Remove Week   c: Duplicate Week"),
        Line::from(" g: Reload Plan From Store"),
        Line::from(""),
        Line::from("--- Week Grid ---").style(Style::new().bold().underlined()),
        Line::from(" h/l / ←→: Select Day"),
        Line::from(" k/j / ↑↓: Select Exercise"),
        Line::from(" K / J: Reorder Selected Exercise"),
        Line::from(" a: Add Highlighted Library Exercise"),
        Line::from(" d / Delete: Remove Selected Exercise"),
        Line::from(" r: Toggle Rest Day   t: Cycle Workout Tag"),
        Line::from(" C: Toggle Day Completed"),
        Line::from(" m: Move All Exercises to Another Day"),
        Line::from(""),
        Line::from("--- Library ---").style(Style::new().bold().underlined()),
        Line::from(" k/j / ↑↓: Navigate"),
        Line::from(" a / Enter: Add to Selected Day"),
        Line::from(" /: Filter by Name"),
        Line::from(""),
        Line::from("--- Mouse ---").style(Style::new().bold().underlined()),
        Line::from(" Drag a library row or an exercise onto a day"),
        Line::from(" The green marker previews where it will land"),
        Line::from(" Esc: Cancel an In-Flight Drag"),
    ];

    let paragraph = Paragraph::new(help_text).block(Block::default().padding(
        ratatui::widgets::Padding::new(2, 2, 1, 1),
    ));
    f.render_widget(paragraph, area);
}

fn render_day_menu_modal(f: &mut Frame, app: &App) {
    let ActiveModal::DayMenu {
        week_index,
        day_of_week,
        selected,
    } = &app.active_modal
    else {
        return;
    };

    let block = Block::default()
        .title(format!("Move {day_of_week}'s exercises to…"))
        .borders(Borders::ALL)
        .border_style(Style::new().fg(Color::Cyan));
    let area = centered_rect(30, 40, f.size());
    f.render_widget(Clear, area);

    let items: Vec<ListItem> = DayOfWeek::ALL
        .into_iter()
        .map(|dow| {
            let mut label = dow.to_string();
            if let Ok(day) = app.session.plan.day(*week_index, dow) {
                if day.is_rest_day {
                    label.push_str(" (rest)");
                }
                if day.is_completed() {
                    label.push_str(" ✓");
                }
            }
            if dow == *day_of_week {
                label.push_str("  ← source");
            }
            ListItem::new(label)
        })
        .collect();

    let mut state = ratatui::widgets::ListState::default();
    state.select(Some(*selected));
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::new().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut state);
}
