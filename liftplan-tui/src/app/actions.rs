// liftplan-tui/src/app/actions.rs
use super::state::{ActiveModal, App};
use chrono::Utc;
use liftplan_lib::{
    DayOfWeek, DayPatch, ExerciseCoord, NewExercise, PlanCommand, Severity, WorkoutTag,
};
use std::time::Instant;

/// Runs one command through the session and routes any notice to the
/// status bar.
fn dispatch(app: &mut App, command: PlanCommand) {
    let notice = app.session.dispatch(&app.service.conn, command);
    app.apply_notice(notice);
    app.clamp_selection();
}

/// Adds the highlighted library exercise to the end of the selected day.
pub fn add_selected_exercise(app: &mut App) {
    let Some(library) = app
        .library_state
        .selected()
        .and_then(|i| app.library.get(i))
        .cloned()
    else {
        app.set_status(Severity::Warning, "No library exercise selected".into());
        return;
    };
    let week_index = app.session.active_week;
    let day_of_week = app.selected_day;
    let Ok(day) = app.session.plan.day(week_index, day_of_week) else {
        return;
    };
    let position = day.exercises.len() as u32 + 1;
    dispatch(
        app,
        PlanCommand::AddExercise {
            week_index,
            day_of_week,
            exercise: NewExercise::from_library(&library),
            position,
        },
    );
}

pub fn remove_selected(app: &mut App) {
    let coord = match selected_coord(app) {
        Some(coord) => coord,
        None => return,
    };
    dispatch(app, PlanCommand::RemoveExercise { coord });
}

/// Moves the selected exercise up or down within its day.
pub fn move_selected(app: &mut App, delta: i64) {
    let Some(coord) = selected_coord(app) else {
        return;
    };
    let to = if delta < 0 {
        match coord.index.checked_sub(1) {
            Some(to) => to,
            None => return,
        }
    } else {
        coord.index + 1
    };
    let len = app
        .session
        .plan
        .day(coord.week_index, coord.day_of_week)
        .map_or(0, |d| d.exercises.len());
    if to >= len {
        return;
    }
    dispatch(
        app,
        PlanCommand::ReorderWithinDay {
            week_index: coord.week_index,
            day_of_week: coord.day_of_week,
            from: coord.index,
            to,
        },
    );
    app.selected_index = to;
}

pub fn toggle_rest_day(app: &mut App) {
    let week_index = app.session.active_week;
    let day_of_week = app.selected_day;
    let Ok(day) = app.session.plan.day(week_index, day_of_week) else {
        return;
    };
    let patch = DayPatch {
        is_rest_day: Some(!day.is_rest_day),
        tag: None,
    };
    dispatch(
        app,
        PlanCommand::UpdateDay {
            week_index,
            day_of_week,
            patch,
        },
    );
}

pub fn cycle_tag(app: &mut App) {
    let week_index = app.session.active_week;
    let day_of_week = app.selected_day;
    let Ok(day) = app.session.plan.day(week_index, day_of_week) else {
        return;
    };
    let patch = DayPatch {
        is_rest_day: None,
        tag: Some(next_tag(day.tag)),
    };
    dispatch(
        app,
        PlanCommand::UpdateDay {
            week_index,
            day_of_week,
            patch,
        },
    );
}

fn next_tag(tag: Option<WorkoutTag>) -> Option<WorkoutTag> {
    match tag {
        None => Some(WorkoutTag::Push),
        Some(WorkoutTag::Push) => Some(WorkoutTag::Pull),
        Some(WorkoutTag::Pull) => Some(WorkoutTag::Legs),
        Some(WorkoutTag::Legs) => Some(WorkoutTag::UpperBody),
        Some(WorkoutTag::UpperBody) => Some(WorkoutTag::LowerBody),
        Some(WorkoutTag::LowerBody) => Some(WorkoutTag::FullBody),
        Some(WorkoutTag::FullBody) => Some(WorkoutTag::Cardio),
        Some(WorkoutTag::Cardio) => Some(WorkoutTag::Mobility),
        Some(WorkoutTag::Mobility) => None,
    }
}

pub fn add_week(app: &mut App) {
    dispatch(app, PlanCommand::AddWeek);
}

pub fn remove_week(app: &mut App) {
    let week_index = app.session.active_week;
    dispatch(app, PlanCommand::RemoveWeek { week_index });
}

pub fn clone_week(app: &mut App) {
    let week_index = app.session.active_week;
    dispatch(app, PlanCommand::CloneWeek { week_index });
}

/// Toggles the completion lock on the selected day.
pub fn toggle_completed(app: &mut App) {
    let week_index = app.session.active_week;
    let day_of_week = app.selected_day;
    let completed = app
        .session
        .plan
        .day(week_index, day_of_week)
        .map_or(false, liftplan_lib::Day::is_completed);
    let stamp = if completed { None } else { Some(Utc::now()) };
    if let Err(err) =
        app.session
            .set_day_completed(&app.service.conn, week_index, day_of_week, stamp)
    {
        app.set_status(Severity::Error, err.to_string());
    }
}

/// Day-menu confirm: move every exercise of the menu's day to `dest`.
pub fn confirm_day_menu(app: &mut App, dest: DayOfWeek) {
    let ActiveModal::DayMenu {
        week_index,
        day_of_week,
        ..
    } = app.active_modal
    else {
        return;
    };
    app.active_modal = ActiveModal::None;
    dispatch(
        app,
        PlanCommand::MoveDayExercises {
            from_week: week_index,
            from_day: day_of_week,
            to_week: week_index,
            to_day: dest,
        },
    );
}

pub fn refresh_now(app: &mut App) {
    match app.session.refresh(&app.service.conn, Instant::now()) {
        Ok(true) => {
            app.clamp_selection();
            app.set_status(Severity::Info, "Plan reloaded".into());
        }
        Ok(false) => app.set_status(
            Severity::Info,
            "Reload held back while changes are settling".into(),
        ),
        Err(err) => app.set_status(Severity::Error, err.to_string()),
    }
}

fn selected_coord(app: &App) -> Option<ExerciseCoord> {
    let coord = ExerciseCoord::new(app.session.active_week, app.selected_day, app.selected_index);
    app.session
        .plan
        .exercise(coord.week_index, coord.day_of_week, coord.index)
        .ok()
        .map(|_| coord)
}
