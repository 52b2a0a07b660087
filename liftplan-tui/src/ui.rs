// liftplan-tui/src/ui.rs

mod grid;
mod layout;
mod library;
mod modals;
mod status_bar;

// Re-export the main render function
pub use layout::render_ui;
