// liftplan-tui/src/ui/library.rs
use crate::app::{App, Focus};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Exercise catalogue pane; rows here are drag sources for
/// new-from-library adds.
pub fn render_library(f: &mut Frame, app: &mut App, area: Rect) {
    app.library_area = area;

    let title = if app.filter_editing {
        format!("Library /{}", app.library_filter)
    } else if app.library_filter.is_empty() {
        "Library".to_string()
    } else {
        format!("Library ({})", app.library_filter)
    };
    let border_style = if app.focus == Focus::Library {
        Style::new().fg(Color::Cyan)
    } else {
        Style::new()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let items: Vec<ListItem> = app
        .library
        .iter()
        .map(|e| {
            let equipment = e.equipment.as_deref().unwrap_or("-");
            ListItem::new(format!("{} [{equipment}]", e.name))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::new().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.library_state);
}
