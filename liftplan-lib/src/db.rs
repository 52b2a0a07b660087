//src/db.rs
use crate::model::{
    Day, DayOfWeek, EntityId, Exercise, ExerciseParams, LibraryExercise, Plan, RepRange, Set,
    Week, WorkoutTag, DAYS_PER_WEEK,
};
use crate::permissions::PermissionLevel;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Custom Error type for DB operations
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Plan not found: ID {0}")]
    PlanNotFound(i64),
    #[error("Week not found: ID {0}")]
    WeekNotFound(i64),
    #[error("Day not found: ID {0}")]
    DayNotFound(i64),
    #[error("Exercise not found: ID {0}")]
    ExerciseNotFound(i64),
    #[error("Set not found: ID {0}")]
    SetNotFound(i64),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database insert failed: {0}")]
    InsertFailed(rusqlite::Error),
    #[error("Database update failed: {0}")]
    UpdateFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
    #[error("Library exercise name must be unique (case-insensitive): '{0}' already exists.")]
    LibraryNameNotUnique(String),
    #[error("Entity has not been persisted yet; cannot target it server-side")]
    UnsyncedEntity,
    #[error("Invalid stored value: {0}")]
    InvalidStoredValue(String),
}

const DB_FILE_NAME: &str = "liftplan.sqlite";

/// Gets the path to the SQLite database file within the app's data directory.
pub fn get_db_path() -> Result<PathBuf, DbError> {
    let data_dir = dirs::data_dir().ok_or(DbError::DataDir)?;
    let app_dir = data_dir.join("liftplan"); // Same dir name as config
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, DbError> {
    let conn = Connection::open(path).map_err(DbError::Connection)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Initializes the database schema.
pub fn init(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS plans (
            id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            is_draft INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT
        );
        CREATE TABLE IF NOT EXISTS weeks (
            id INTEGER PRIMARY KEY,
            plan_id INTEGER NOT NULL REFERENCES plans(id) ON DELETE CASCADE,
            week_number INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS days (
            id INTEGER PRIMARY KEY,
            week_id INTEGER NOT NULL REFERENCES weeks(id) ON DELETE CASCADE,
            day_of_week INTEGER NOT NULL,
            is_rest_day INTEGER NOT NULL DEFAULT 0,
            tag TEXT,
            completed_at TEXT,
            UNIQUE(week_id, day_of_week)
        );
        CREATE TABLE IF NOT EXISTS exercises (
            id INTEGER PRIMARY KEY,
            day_id INTEGER NOT NULL REFERENCES days(id) ON DELETE CASCADE,
            base_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            ord INTEGER NOT NULL,
            rest_seconds INTEGER,
            tempo TEXT,
            warmup_sets INTEGER,
            instructions TEXT
        );
        CREATE TABLE IF NOT EXISTS sets (
            id INTEGER PRIMARY KEY,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
            ord INTEGER NOT NULL,
            rep_min INTEGER NOT NULL,
            rep_max INTEGER NOT NULL,
            weight REAL,
            rpe REAL
        );
        CREATE TABLE IF NOT EXISTS library_exercises (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            equipment TEXT,
            muscle_groups TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE IF NOT EXISTS collaborators (
            plan_id INTEGER NOT NULL REFERENCES plans(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL,
            level TEXT NOT NULL,
            PRIMARY KEY (plan_id, user_id)
        );
        COMMIT;",
    )?;
    Ok(())
}

// --- Plan loader ---

/// Loads the full hierarchy for one plan plus the requesting user's
/// effective permission level (owner of the plan, else their
/// collaborator tier, else read-only).
pub fn load_plan(
    conn: &Connection,
    plan_id: i64,
    user_id: i64,
) -> Result<(Plan, PermissionLevel), DbError> {
    let (owner_id, title, is_draft, completed_at): (i64, String, bool, Option<DateTime<Utc>>) =
        conn.query_row(
            "SELECT owner_id, title, is_draft, completed_at FROM plans WHERE id = ?1",
            params![plan_id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                ))
            },
        )
        .optional()
        .map_err(DbError::QueryFailed)?
        .ok_or(DbError::PlanNotFound(plan_id))?;

    let permission = if owner_id == user_id {
        PermissionLevel::Owner
    } else {
        lookup_collaborator_level(conn, plan_id, user_id)?.unwrap_or(PermissionLevel::Viewer)
    };

    let mut stmt = conn
        .prepare("SELECT id, week_number FROM weeks WHERE plan_id = ?1 ORDER BY week_number")
        .map_err(DbError::QueryFailed)?;
    let week_rows = stmt
        .query_map(params![plan_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(DbError::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)?;

    let mut weeks = Vec::with_capacity(week_rows.len());
    for (week_id, week_number) in week_rows {
        let days = load_days(conn, week_id)?;
        if days.len() != DAYS_PER_WEEK {
            return Err(DbError::InvalidStoredValue(format!(
                "week {week_id} has {} days, expected {DAYS_PER_WEEK}",
                days.len()
            )));
        }
        weeks.push(Week {
            id: EntityId::Db(week_id),
            week_number: week_number as u32,
            days,
        });
    }

    Ok((
        Plan {
            id: plan_id,
            title,
            is_draft,
            completed_at,
            weeks,
        },
        permission,
    ))
}

fn lookup_collaborator_level(
    conn: &Connection,
    plan_id: i64,
    user_id: i64,
) -> Result<Option<PermissionLevel>, DbError> {
    let level: Option<String> = conn
        .query_row(
            "SELECT level FROM collaborators WHERE plan_id = ?1 AND user_id = ?2",
            params![plan_id, user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::QueryFailed)?;
    level
        .map(|s| {
            s.parse::<PermissionLevel>()
                .map_err(|_| DbError::InvalidStoredValue(format!("collaborator level '{s}'")))
        })
        .transpose()
}

fn load_days(conn: &Connection, week_id: i64) -> Result<Vec<Day>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, day_of_week, is_rest_day, tag, completed_at
             FROM days WHERE week_id = ?1 ORDER BY day_of_week",
        )
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![week_id], map_day_row)
        .map_err(DbError::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)?;

    let mut days = Vec::with_capacity(rows.len());
    for (day_id, dow_index, is_rest_day, tag, completed_at) in rows {
        let day_of_week = DayOfWeek::from_index(dow_index as usize).ok_or_else(|| {
            DbError::InvalidStoredValue(format!("day_of_week {dow_index} on day {day_id}"))
        })?;
        let tag = tag
            .map(|s: String| {
                s.parse::<WorkoutTag>()
                    .map_err(|_| DbError::InvalidStoredValue(format!("workout tag '{s}'")))
            })
            .transpose()?;
        days.push(Day {
            id: EntityId::Db(day_id),
            day_of_week,
            is_rest_day,
            tag,
            completed_at,
            exercises: load_exercises(conn, day_id)?,
        });
    }
    Ok(days)
}

#[allow(clippy::type_complexity)]
fn map_day_row(
    row: &Row,
) -> Result<(i64, i64, bool, Option<String>, Option<DateTime<Utc>>), rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn load_exercises(conn: &Connection, day_id: i64) -> Result<Vec<Exercise>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, base_id, name, ord, rest_seconds, tempo, warmup_sets, instructions
             FROM exercises WHERE day_id = ?1 ORDER BY ord",
        )
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![day_id], |row| {
            Ok(Exercise {
                id: EntityId::Db(row.get(0)?),
                base_id: row.get(1)?,
                name: row.get(2)?,
                order: row.get::<_, i64>(3)? as u32,
                params: ExerciseParams {
                    rest_seconds: row.get::<_, Option<i64>>(4)?.map(|v| v as u32),
                    tempo: row.get(5)?,
                    warmup_sets: row.get::<_, Option<i64>>(6)?.map(|v| v as u32),
                    instructions: row.get(7)?,
                },
                sets: Vec::new(),
            })
        })
        .map_err(DbError::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)?;

    let mut exercises = rows;
    for exercise in &mut exercises {
        let id = exercise.id.as_db().ok_or(DbError::UnsyncedEntity)?;
        exercise.sets = load_sets(conn, id)?;
    }
    Ok(exercises)
}

fn load_sets(conn: &Connection, exercise_id: i64) -> Result<Vec<Set>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, ord, rep_min, rep_max, weight, rpe
             FROM sets WHERE exercise_id = ?1 ORDER BY ord",
        )
        .map_err(DbError::QueryFailed)?;
    let sets = stmt
        .query_map(params![exercise_id], |row| {
            Ok(Set {
                id: EntityId::Db(row.get(0)?),
                order: row.get::<_, i64>(1)? as u32,
                reps: RepRange {
                    min: row.get::<_, i64>(2)? as u32,
                    max: row.get::<_, i64>(3)? as u32,
                },
                weight: row.get(4)?,
                rpe: row.get(5)?,
            })
        })
        .map_err(DbError::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)?;
    Ok(sets)
}

// --- Exercise library lookup ---

#[derive(Default, Debug)]
pub struct LibraryFilters<'a> {
    pub query: Option<&'a str>,
    pub muscle: Option<&'a str>,
    pub equipment: Option<&'a str>,
    pub limit: Option<u32>,
}

/// Searches the exercise library by free-text query plus muscle-group
/// and equipment filters.
pub fn search_library(
    conn: &Connection,
    filters: &LibraryFilters,
) -> Result<Vec<LibraryExercise>, DbError> {
    let mut sql =
        "SELECT id, name, equipment, muscle_groups FROM library_exercises WHERE 1=1".to_string();
    let mut params_map: HashMap<String, Box<dyn ToSql>> = HashMap::new();

    if let Some(q) = filters.query {
        sql.push_str(" AND name LIKE :query");
        params_map.insert(":query".into(), Box::new(format!("%{q}%")));
    }
    if let Some(m) = filters.muscle {
        sql.push_str(" AND muscle_groups LIKE :muscle");
        params_map.insert(":muscle".into(), Box::new(format!("%{m}%")));
    }
    if let Some(e) = filters.equipment {
        sql.push_str(" AND equipment = :equipment COLLATE NOCASE");
        params_map.insert(":equipment".into(), Box::new(e.to_string()));
    }
    sql.push_str(" ORDER BY name ASC");
    if let Some(limit) = filters.limit {
        sql.push_str(" LIMIT :limit");
        params_map.insert(":limit".into(), Box::new(limit));
    }

    let params_for_query: Vec<(&str, &dyn ToSql)> = params_map
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_ref()))
        .collect();

    let mut stmt = conn.prepare(&sql).map_err(DbError::QueryFailed)?;
    let iter = stmt
        .query_map(params_for_query.as_slice(), |row| {
            let muscles: String = row.get(3)?;
            Ok(LibraryExercise {
                id: row.get(0)?,
                name: row.get(1)?,
                equipment: row.get(2)?,
                muscle_groups: muscles
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .map_err(DbError::QueryFailed)?;

    iter.collect::<Result<Vec<_>, _>>().map_err(DbError::QueryFailed)
}

/// Adds a library catalogue entry.
pub fn add_library_exercise(
    conn: &Connection,
    name: &str,
    equipment: Option<&str>,
    muscle_groups: &[&str],
) -> Result<i64, DbError> {
    let exists: bool = conn
        .query_row(
            "SELECT 1 FROM library_exercises WHERE name = ?1 COLLATE NOCASE",
            params![name],
            |_| Ok(true),
        )
        .optional()
        .map_err(DbError::QueryFailed)?
        .unwrap_or(false);
    if exists {
        return Err(DbError::LibraryNameNotUnique(name.to_string()));
    }
    conn.execute(
        "INSERT INTO library_exercises (name, equipment, muscle_groups) VALUES (?1, ?2, ?3)",
        params![name, equipment, muscle_groups.join(",")],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

// --- Plan / collaborator seeding ---

/// Creates a plan with `week_count` empty weeks of 7 days each.
pub fn create_plan(
    conn: &Connection,
    owner_id: i64,
    title: &str,
    week_count: u32,
) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO plans (owner_id, title, is_draft) VALUES (?1, ?2, 1)",
        params![owner_id, title],
    )
    .map_err(DbError::InsertFailed)?;
    let plan_id = conn.last_insert_rowid();
    for _ in 0..week_count.max(1) {
        add_week(conn, plan_id)?;
    }
    Ok(plan_id)
}

/// Most recently created plan owned by the user, if any.
pub fn latest_plan_for_user(conn: &Connection, user_id: i64) -> Result<Option<i64>, DbError> {
    conn.query_row(
        "SELECT id FROM plans WHERE owner_id = ?1 ORDER BY id DESC LIMIT 1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(DbError::QueryFailed)
}

pub fn add_collaborator(
    conn: &Connection,
    plan_id: i64,
    user_id: i64,
    level: PermissionLevel,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO collaborators (plan_id, user_id, level) VALUES (?1, ?2, ?3)",
        params![plan_id, user_id, level.to_string()],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(())
}

// --- Persistence calls (each safe to retry at the caller's discretion) ---

/// Creates an exercise (with its initial sets) in a day at a 1-based
/// position, shifting later rows down. Returns the new exercise id and
/// the new set ids in order.
pub fn create_exercise_in_day(
    conn: &Connection,
    day_id: i64,
    base_id: i64,
    name: &str,
    position: u32,
    exercise_params: &ExerciseParams,
    sets: &[(RepRange, Option<f64>, Option<f64>)],
) -> Result<(i64, Vec<i64>), DbError> {
    day_exists(conn, day_id)?;
    conn.execute(
        "UPDATE exercises SET ord = ord + 1 WHERE day_id = ?1 AND ord >= ?2",
        params![day_id, position],
    )
    .map_err(DbError::UpdateFailed)?;
    conn.execute(
        "INSERT INTO exercises (day_id, base_id, name, ord, rest_seconds, tempo, warmup_sets, instructions)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            day_id,
            base_id,
            name,
            position,
            exercise_params.rest_seconds,
            exercise_params.tempo,
            exercise_params.warmup_sets,
            exercise_params.instructions,
        ],
    )
    .map_err(DbError::InsertFailed)?;
    let exercise_id = conn.last_insert_rowid();

    let mut set_ids = Vec::with_capacity(sets.len());
    for (i, (reps, weight, rpe)) in sets.iter().enumerate() {
        conn.execute(
            "INSERT INTO sets (exercise_id, ord, rep_min, rep_max, weight, rpe)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![exercise_id, i as i64 + 1, reps.min, reps.max, weight, rpe],
        )
        .map_err(DbError::InsertFailed)?;
        set_ids.push(conn.last_insert_rowid());
    }
    compact_day_order(conn, day_id)?;
    Ok((exercise_id, set_ids))
}

/// Removes an exercise and closes the order gap it leaves.
pub fn remove_exercise_from_day(conn: &Connection, exercise_id: i64) -> Result<(), DbError> {
    let day_id = exercise_day(conn, exercise_id)?;
    let deleted = conn
        .execute("DELETE FROM exercises WHERE id = ?1", params![exercise_id])
        .map_err(DbError::DeleteFailed)?;
    if deleted == 0 {
        return Err(DbError::ExerciseNotFound(exercise_id));
    }
    compact_day_order(conn, day_id)
}

/// Moves an exercise to (possibly) another day at a 1-based position.
pub fn move_exercise(
    conn: &Connection,
    exercise_id: i64,
    to_day_id: i64,
    to_position: u32,
) -> Result<(), DbError> {
    let from_day_id = exercise_day(conn, exercise_id)?;
    day_exists(conn, to_day_id)?;
    conn.execute(
        "UPDATE exercises SET ord = ord + 1 WHERE day_id = ?1 AND ord >= ?2 AND id != ?3",
        params![to_day_id, to_position, exercise_id],
    )
    .map_err(DbError::UpdateFailed)?;
    conn.execute(
        "UPDATE exercises SET day_id = ?1, ord = ?2 WHERE id = ?3",
        params![to_day_id, to_position, exercise_id],
    )
    .map_err(DbError::UpdateFailed)?;
    compact_day_order(conn, from_day_id)?;
    compact_day_order(conn, to_day_id)
}

/// Rewrites a day's order column to match the given id sequence.
pub fn reorder_day_exercises(
    conn: &Connection,
    day_id: i64,
    ordered_ids: &[i64],
) -> Result<(), DbError> {
    for (i, id) in ordered_ids.iter().enumerate() {
        conn.execute(
            "UPDATE exercises SET ord = ?1 WHERE id = ?2 AND day_id = ?3",
            params![i as i64 + 1, id, day_id],
        )
        .map_err(DbError::UpdateFailed)?;
    }
    Ok(())
}

/// Appends every exercise of one day to the end of another (day-level
/// menu move).
pub fn move_day_exercises(
    conn: &Connection,
    from_day_id: i64,
    to_day_id: i64,
) -> Result<(), DbError> {
    day_exists(conn, from_day_id)?;
    day_exists(conn, to_day_id)?;
    let mut stmt = conn
        .prepare("SELECT id FROM exercises WHERE day_id = ?1 ORDER BY ord")
        .map_err(DbError::QueryFailed)?;
    let ids = stmt
        .query_map(params![from_day_id], |row| row.get::<_, i64>(0))
        .map_err(DbError::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)?;
    let base: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(ord), 0) FROM exercises WHERE day_id = ?1",
            params![to_day_id],
            |row| row.get(0),
        )
        .map_err(DbError::QueryFailed)?;
    for (i, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE exercises SET day_id = ?1, ord = ?2 WHERE id = ?3",
            params![to_day_id, base + i as i64 + 1, id],
        )
        .map_err(DbError::UpdateFailed)?;
    }
    Ok(())
}

/// Updates a day's rest flag and/or workout tag. Turning a day into a
/// rest day deletes its exercises, keeping the rest-days-are-empty
/// invariant true in the store as well.
pub fn update_day(
    conn: &Connection,
    day_id: i64,
    is_rest_day: Option<bool>,
    tag: Option<Option<WorkoutTag>>,
) -> Result<(), DbError> {
    if let Some(rest) = is_rest_day {
        let updated = conn
            .execute(
                "UPDATE days SET is_rest_day = ?1 WHERE id = ?2",
                params![rest, day_id],
            )
            .map_err(DbError::UpdateFailed)?;
        if updated == 0 {
            return Err(DbError::DayNotFound(day_id));
        }
        if rest {
            conn.execute("DELETE FROM exercises WHERE day_id = ?1", params![day_id])
                .map_err(DbError::DeleteFailed)?;
        }
    }
    if let Some(tag) = tag {
        let updated = conn
            .execute(
                "UPDATE days SET tag = ?1 WHERE id = ?2",
                params![tag.map(|t| t.to_string()), day_id],
            )
            .map_err(DbError::UpdateFailed)?;
        if updated == 0 {
            return Err(DbError::DayNotFound(day_id));
        }
    }
    Ok(())
}

/// Marks or clears a day's completion timestamp.
pub fn set_day_completed(
    conn: &Connection,
    day_id: i64,
    completed_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let updated = conn
        .execute(
            "UPDATE days SET completed_at = ?1 WHERE id = ?2",
            params![completed_at, day_id],
        )
        .map_err(DbError::UpdateFailed)?;
    if updated == 0 {
        return Err(DbError::DayNotFound(day_id));
    }
    Ok(())
}

/// Appends an empty week; returns the week id and its 7 day ids in
/// slot order.
pub fn add_week(conn: &Connection, plan_id: i64) -> Result<(i64, Vec<i64>), DbError> {
    let number: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(week_number), 0) + 1 FROM weeks WHERE plan_id = ?1",
            params![plan_id],
            |row| row.get(0),
        )
        .map_err(DbError::QueryFailed)?;
    conn.execute(
        "INSERT INTO weeks (plan_id, week_number) VALUES (?1, ?2)",
        params![plan_id, number],
    )
    .map_err(DbError::InsertFailed)?;
    let week_id = conn.last_insert_rowid();
    let mut day_ids = Vec::with_capacity(DAYS_PER_WEEK);
    for slot in 0..DAYS_PER_WEEK {
        conn.execute(
            "INSERT INTO days (week_id, day_of_week) VALUES (?1, ?2)",
            params![week_id, slot as i64],
        )
        .map_err(DbError::InsertFailed)?;
        day_ids.push(conn.last_insert_rowid());
    }
    Ok((week_id, day_ids))
}

/// Deletes a week (cascading) and renumbers the remainder.
pub fn remove_week(conn: &Connection, week_id: i64) -> Result<(), DbError> {
    let (plan_id, number): (i64, i64) = conn
        .query_row(
            "SELECT plan_id, week_number FROM weeks WHERE id = ?1",
            params![week_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(DbError::QueryFailed)?
        .ok_or(DbError::WeekNotFound(week_id))?;
    conn.execute("DELETE FROM weeks WHERE id = ?1", params![week_id])
        .map_err(DbError::DeleteFailed)?;
    conn.execute(
        "UPDATE weeks SET week_number = week_number - 1 WHERE plan_id = ?1 AND week_number > ?2",
        params![plan_id, number],
    )
    .map_err(DbError::UpdateFailed)?;
    Ok(())
}

/// Deep-copies a week (days, exercises, sets) directly after the
/// source, shifting later week numbers. Returns every new row id in
/// tree order: week, then per day-slot the day id, its exercise ids
/// (each immediately followed by its set ids).
pub fn clone_week(conn: &Connection, week_id: i64) -> Result<Vec<i64>, DbError> {
    let (plan_id, number): (i64, i64) = conn
        .query_row(
            "SELECT plan_id, week_number FROM weeks WHERE id = ?1",
            params![week_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(DbError::QueryFailed)?
        .ok_or(DbError::WeekNotFound(week_id))?;

    conn.execute(
        "UPDATE weeks SET week_number = week_number + 1 WHERE plan_id = ?1 AND week_number > ?2",
        params![plan_id, number],
    )
    .map_err(DbError::UpdateFailed)?;
    conn.execute(
        "INSERT INTO weeks (plan_id, week_number) VALUES (?1, ?2)",
        params![plan_id, number + 1],
    )
    .map_err(DbError::InsertFailed)?;
    let new_week_id = conn.last_insert_rowid();

    let mut new_ids = vec![new_week_id];
    let days = load_days(conn, week_id)?;
    for day in days {
        conn.execute(
            "INSERT INTO days (week_id, day_of_week, is_rest_day, tag) VALUES (?1, ?2, ?3, ?4)",
            params![
                new_week_id,
                day.day_of_week.index() as i64,
                day.is_rest_day,
                day.tag.map(|t| t.to_string()),
            ],
        )
        .map_err(DbError::InsertFailed)?;
        let new_day_id = conn.last_insert_rowid();
        new_ids.push(new_day_id);
        for exercise in day.exercises {
            let sets: Vec<(RepRange, Option<f64>, Option<f64>)> = exercise
                .sets
                .iter()
                .map(|s| (s.reps, s.weight, s.rpe))
                .collect();
            let (new_exercise_id, new_set_ids) = create_exercise_in_day(
                conn,
                new_day_id,
                exercise.base_id,
                &exercise.name,
                exercise.order,
                &exercise.params,
                &sets,
            )?;
            new_ids.push(new_exercise_id);
            new_ids.extend(new_set_ids);
        }
    }
    Ok(new_ids)
}

/// Replaces an exercise's tuning parameters.
pub fn update_exercise_params(
    conn: &Connection,
    exercise_id: i64,
    exercise_params: &ExerciseParams,
) -> Result<(), DbError> {
    let updated = conn
        .execute(
            "UPDATE exercises SET rest_seconds = ?1, tempo = ?2, warmup_sets = ?3, instructions = ?4
             WHERE id = ?5",
            params![
                exercise_params.rest_seconds,
                exercise_params.tempo,
                exercise_params.warmup_sets,
                exercise_params.instructions,
                exercise_id,
            ],
        )
        .map_err(DbError::UpdateFailed)?;
    if updated == 0 {
        return Err(DbError::ExerciseNotFound(exercise_id));
    }
    Ok(())
}

/// Appends a set to an exercise; returns the new set id.
pub fn add_set(
    conn: &Connection,
    exercise_id: i64,
    reps: RepRange,
    weight: Option<f64>,
    rpe: Option<f64>,
) -> Result<i64, DbError> {
    let ord: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(ord), 0) + 1 FROM sets WHERE exercise_id = ?1",
            params![exercise_id],
            |row| row.get(0),
        )
        .map_err(DbError::QueryFailed)?;
    conn.execute(
        "INSERT INTO sets (exercise_id, ord, rep_min, rep_max, weight, rpe)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![exercise_id, ord, reps.min, reps.max, weight, rpe],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

pub fn remove_set(conn: &Connection, set_id: i64) -> Result<(), DbError> {
    let exercise_id: i64 = conn
        .query_row(
            "SELECT exercise_id FROM sets WHERE id = ?1",
            params![set_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::QueryFailed)?
        .ok_or(DbError::SetNotFound(set_id))?;
    conn.execute("DELETE FROM sets WHERE id = ?1", params![set_id])
        .map_err(DbError::DeleteFailed)?;
    // Close the ord gap.
    let mut stmt = conn
        .prepare("SELECT id FROM sets WHERE exercise_id = ?1 ORDER BY ord")
        .map_err(DbError::QueryFailed)?;
    let ids = stmt
        .query_map(params![exercise_id], |row| row.get::<_, i64>(0))
        .map_err(DbError::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)?;
    for (i, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE sets SET ord = ?1 WHERE id = ?2",
            params![i as i64 + 1, id],
        )
        .map_err(DbError::UpdateFailed)?;
    }
    Ok(())
}

pub fn update_set(
    conn: &Connection,
    set_id: i64,
    reps: RepRange,
    weight: Option<f64>,
    rpe: Option<f64>,
) -> Result<(), DbError> {
    let updated = conn
        .execute(
            "UPDATE sets SET rep_min = ?1, rep_max = ?2, weight = ?3, rpe = ?4 WHERE id = ?5",
            params![reps.min, reps.max, weight, rpe, set_id],
        )
        .map_err(DbError::UpdateFailed)?;
    if updated == 0 {
        return Err(DbError::SetNotFound(set_id));
    }
    Ok(())
}

// --- Internal helpers ---

fn day_exists(conn: &Connection, day_id: i64) -> Result<(), DbError> {
    conn.query_row("SELECT 1 FROM days WHERE id = ?1", params![day_id], |_| {
        Ok(())
    })
    .optional()
    .map_err(DbError::QueryFailed)?
    .ok_or(DbError::DayNotFound(day_id))
}

fn exercise_day(conn: &Connection, exercise_id: i64) -> Result<i64, DbError> {
    conn.query_row(
        "SELECT day_id FROM exercises WHERE id = ?1",
        params![exercise_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(DbError::QueryFailed)?
    .ok_or(DbError::ExerciseNotFound(exercise_id))
}

/// Rewrites a day's ord column to a dense 1..N sequence.
fn compact_day_order(conn: &Connection, day_id: i64) -> Result<(), DbError> {
    let mut stmt = conn
        .prepare("SELECT id FROM exercises WHERE day_id = ?1 ORDER BY ord")
        .map_err(DbError::QueryFailed)?;
    let ids = stmt
        .query_map(params![day_id], |row| row.get::<_, i64>(0))
        .map_err(DbError::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)?;
    for (i, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE exercises SET ord = ?1 WHERE id = ?2",
            params![i as i64 + 1, id],
        )
        .map_err(DbError::UpdateFailed)?;
    }
    Ok(())
}
