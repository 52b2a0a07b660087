// liftplan-tui/src/main.rs
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use liftplan_lib::PlanService;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{io, time::Duration};

mod app; // Application state
mod ui; // UI rendering logic

use crate::app::App;

/// Single-user build: the local profile owns every plan it creates.
const LOCAL_USER_ID: i64 = 1;

fn main() -> Result<()> {
    env_logger::init(); // Honors RUST_LOG; silent by default

    // Initialize the library service
    let service = PlanService::initialize().expect("Failed to initialize PlanService");
    let plan_id = bootstrap_plan(&service)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and run it
    let mut app = App::new(service, plan_id, LOCAL_USER_ID)?;
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {err:?}"); // Print errors to stderr
    }

    Ok(())
}

/// Opens the most recent plan for the local user, creating a starter
/// plan (and seeding the library) on first launch.
fn bootstrap_plan(service: &PlanService) -> Result<i64> {
    if let Some(plan_id) = liftplan_lib::db::latest_plan_for_user(&service.conn, LOCAL_USER_ID)? {
        return Ok(plan_id);
    }
    seed_library(service)?;
    let plan_id =
        liftplan_lib::db::create_plan(&service.conn, LOCAL_USER_ID, "My Training Block", 4)?;
    Ok(plan_id)
}

fn seed_library(service: &PlanService) -> Result<()> {
    let existing = service.search_library(&liftplan_lib::LibraryFilters::default())?;
    if !existing.is_empty() {
        return Ok(());
    }
    let conn = &service.conn;
    liftplan_lib::db::add_library_exercise(conn, "Back Squat", Some("Barbell"), &["Quads", "Glutes"])?;
    liftplan_lib::db::add_library_exercise(conn, "Bench Press", Some("Barbell"), &["Chest", "Triceps"])?;
    liftplan_lib::db::add_library_exercise(conn, "Deadlift", Some("Barbell"), &["Back", "Hamstrings"])?;
    liftplan_lib::db::add_library_exercise(conn, "Overhead Press", Some("Barbell"), &["Shoulders"])?;
    liftplan_lib::db::add_library_exercise(conn, "Pull Up", Some("Bodyweight"), &["Back", "Biceps"])?;
    liftplan_lib::db::add_library_exercise(conn, "Barbell Row", Some("Barbell"), &["Back"])?;
    liftplan_lib::db::add_library_exercise(conn, "Leg Press", Some("Machine"), &["Quads"])?;
    liftplan_lib::db::add_library_exercise(conn, "Dumbbell Curl", Some("Dumbbell"), &["Biceps"])?;
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Flush throttled work and expired status text before drawing
        app.on_tick();

        terminal.draw(|f| ui::render_ui(f, app))?;

        // Poll with a short timeout so drag feedback stays responsive
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key_event(key)?;
                }
                Event::Mouse(mouse) => app.handle_mouse_event(mouse),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
