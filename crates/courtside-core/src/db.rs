// SQLite read layer for coaching schedules.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, warn};

use crate::model::{
    ActivityAssignment, BlockId, DrillId, ManualCourtAssignment, Player, PlayerId,
    ScheduleSnapshot, Session, SessionId, SkillLevel, TimeBlock,
};
use crate::source::ScheduleSource;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// SQLite-backed store for players, sessions, time blocks, court activities
/// and manual court overrides.
pub struct Database {
    conn: Mutex<Connection>,
}

/// Fields for a new session row. Dates and times are local wall-clock
/// values; they are placed in a zone only when the session is evaluated.
#[derive(Debug, Clone, Default)]
pub struct NewSession<'a> {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub planned_duration_minutes: Option<u32>,
    pub group_name: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTimeBlock<'a> {
    pub start_offset_minutes: u32,
    pub duration_minutes: u32,
    pub court_count: u32,
    pub rotation_interval_minutes: Option<u32>,
    pub focus: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct NewActivity<'a> {
    pub court_number: u32,
    pub order: u32,
    pub duration_minutes: u32,
    pub drill_id: Option<DrillId>,
    pub custom_name: &'a str,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS school_groups (
                id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS players (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name  TEXT NOT NULL,
                last_name   TEXT NOT NULL,
                skill_level TEXT
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id                       INTEGER PRIMARY KEY AUTOINCREMENT,
                session_date             TEXT,
                start_time               TEXT,
                planned_duration_minutes INTEGER,
                school_group_id          INTEGER REFERENCES school_groups(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS session_attendees (
                session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                player_id  INTEGER NOT NULL REFERENCES players(id) ON DELETE CASCADE,
                PRIMARY KEY (session_id, player_id)
            );

            CREATE TABLE IF NOT EXISTS drills (
                id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS time_blocks (
                id                        INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id                INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                start_offset_minutes      INTEGER NOT NULL DEFAULT 0,
                duration_minutes          INTEGER NOT NULL,
                number_of_courts          INTEGER NOT NULL DEFAULT 1,
                rotation_interval_minutes INTEGER,
                block_focus               TEXT
            );

            CREATE TABLE IF NOT EXISTS activity_assignments (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                time_block_id        INTEGER NOT NULL REFERENCES time_blocks(id) ON DELETE CASCADE,
                court_number         INTEGER NOT NULL DEFAULT 1,
                sequence_order       INTEGER NOT NULL DEFAULT 0,
                duration_minutes     INTEGER NOT NULL,
                drill_id             INTEGER REFERENCES drills(id) ON DELETE SET NULL,
                custom_activity_name TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS manual_court_assignments (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                time_block_id INTEGER NOT NULL REFERENCES time_blocks(id) ON DELETE CASCADE,
                player_id     INTEGER NOT NULL REFERENCES players(id) ON DELETE CASCADE,
                court_number  INTEGER NOT NULL,
                UNIQUE(time_block_id, player_id)
            );

            CREATE INDEX IF NOT EXISTS idx_time_blocks_session ON time_blocks(session_id);
            CREATE INDEX IF NOT EXISTS idx_activities_block ON activity_assignments(time_block_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // -----------------------------------------------------------------------
    // Loader helpers
    // -----------------------------------------------------------------------

    /// Insert a school group, or return the id of the existing group with
    /// the same name.
    pub fn upsert_group(&self, name: &str) -> Result<i64> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO school_groups (name) VALUES (?1)
                 ON CONFLICT(name) DO UPDATE SET name = excluded.name
                 RETURNING id",
                params![name],
                |row| row.get(0),
            )
            .context("failed to upsert school group")?;
        Ok(id)
    }

    pub fn insert_player(
        &self,
        first_name: &str,
        last_name: &str,
        skill_level: SkillLevel,
    ) -> Result<PlayerId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO players (first_name, last_name, skill_level) VALUES (?1, ?2, ?3)",
            params![first_name, last_name, skill_level.code()],
        )
        .context("failed to insert player")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_session(&self, session: &NewSession<'_>) -> Result<SessionId> {
        let group_id = session
            .group_name
            .map(|name| self.upsert_group(name))
            .transpose()?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO sessions (session_date, start_time, planned_duration_minutes, school_group_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.date.map(|d| d.format(DATE_FORMAT).to_string()),
                session.start_time.map(|t| t.format("%H:%M:%S").to_string()),
                session.planned_duration_minutes,
                group_id,
            ],
        )
        .context("failed to insert session")?;
        Ok(conn.last_insert_rowid())
    }

    /// Mark `player_id` as attending `session_id`. Re-adding is a no-op.
    pub fn add_attendee(&self, session_id: SessionId, player_id: PlayerId) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO session_attendees (session_id, player_id) VALUES (?1, ?2)",
            params![session_id, player_id],
        )
        .context("failed to add session attendee")?;
        Ok(())
    }

    pub fn insert_drill(&self, name: &str) -> Result<DrillId> {
        let conn = self.conn();
        conn.execute("INSERT INTO drills (name) VALUES (?1)", params![name])
            .context("failed to insert drill")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_time_block(
        &self,
        session_id: SessionId,
        block: &NewTimeBlock<'_>,
    ) -> Result<BlockId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO time_blocks
                (session_id, start_offset_minutes, duration_minutes, number_of_courts,
                 rotation_interval_minutes, block_focus)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id,
                block.start_offset_minutes,
                block.duration_minutes,
                block.court_count,
                block.rotation_interval_minutes,
                block.focus,
            ],
        )
        .context("failed to insert time block")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_activity(&self, block_id: BlockId, activity: &NewActivity<'_>) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO activity_assignments
                (time_block_id, court_number, sequence_order, duration_minutes, drill_id,
                 custom_activity_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                block_id,
                activity.court_number,
                activity.order,
                activity.duration_minutes,
                activity.drill_id,
                activity.custom_name,
            ],
        )
        .context("failed to insert activity assignment")?;
        Ok(conn.last_insert_rowid())
    }

    /// Pin `player_id` to `court_number` for one block, replacing any earlier
    /// override for the same player in that block.
    pub fn set_manual_assignment(
        &self,
        block_id: BlockId,
        player_id: PlayerId,
        court_number: u32,
    ) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO manual_court_assignments (time_block_id, player_id, court_number)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(time_block_id, player_id) DO UPDATE SET
                court_number = excluded.court_number",
            params![block_id, player_id, court_number],
        )
        .context("failed to set manual court assignment")?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Read the whole schedule of one session.
    ///
    /// Everything is read inside a single transaction so a concurrent edit
    /// cannot leave the snapshot half old, half new. Manual overrides for
    /// players who are not attending are dropped here.
    pub fn load_snapshot(&self, session_id: SessionId) -> Result<Option<ScheduleSnapshot>> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin snapshot transaction")?;

        let Some(session) = read_session(&tx, session_id)? else {
            return Ok(None);
        };
        let attendees = read_attendees(&tx, session_id)?;
        let attending: HashSet<PlayerId> = attendees.iter().map(|p| p.id).collect();

        let mut blocks = read_blocks(&tx, session_id)?;
        for block in &mut blocks {
            block.activities = read_activities(&tx, block.id)?;
            block.manual_assignments = read_manual_assignments(&tx, block.id)?
                .into_iter()
                .filter(|m| attending.contains(&m.player_id))
                .collect();
        }

        tx.commit().context("failed to finish snapshot transaction")?;

        debug!(
            "Loaded session {session_id}: {} attendees, {} blocks",
            attendees.len(),
            blocks.len()
        );

        Ok(Some(ScheduleSnapshot {
            session,
            attendees,
            blocks,
        }))
    }
}

impl ScheduleSource for Database {
    fn load_snapshot(&self, session_id: SessionId) -> Result<Option<ScheduleSnapshot>> {
        Database::load_snapshot(self, session_id)
    }
}

// ---------------------------------------------------------------------------
// Row readers
// ---------------------------------------------------------------------------

fn read_session(tx: &Transaction<'_>, session_id: SessionId) -> Result<Option<Session>> {
    let row = tx
        .query_row(
            "SELECT s.id, s.session_date, s.start_time, s.planned_duration_minutes, g.name
             FROM sessions s
             LEFT JOIN school_groups g ON g.id = s.school_group_id
             WHERE s.id = ?1",
            params![session_id],
            |row| {
                Ok((
                    row.get::<_, SessionId>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<u32>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()
        .context("failed to query session")?;

    Ok(row.map(|(id, date, start_time, planned_duration_minutes, group_name)| Session {
        id,
        date: date.as_deref().and_then(|raw| parse_date(id, raw)),
        start_time: start_time.as_deref().and_then(|raw| parse_time(id, raw)),
        planned_duration_minutes,
        group_name,
    }))
}

fn read_attendees(tx: &Transaction<'_>, session_id: SessionId) -> Result<Vec<Player>> {
    let mut stmt = tx
        .prepare(
            "SELECT p.id, p.first_name, p.last_name, p.skill_level
             FROM session_attendees a
             JOIN players p ON p.id = a.player_id
             WHERE a.session_id = ?1
             ORDER BY p.id",
        )
        .context("failed to prepare attendee query")?;

    let players = stmt
        .query_map(params![session_id], |row| {
            let skill: Option<String> = row.get(3)?;
            Ok(Player {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                skill_level: skill
                    .as_deref()
                    .map(SkillLevel::from_code)
                    .unwrap_or(SkillLevel::Unknown),
            })
        })
        .context("failed to query attendees")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map attendee rows")?;

    Ok(players)
}

fn read_blocks(tx: &Transaction<'_>, session_id: SessionId) -> Result<Vec<TimeBlock>> {
    let mut stmt = tx
        .prepare(
            "SELECT id, start_offset_minutes, duration_minutes, number_of_courts,
                    rotation_interval_minutes, block_focus
             FROM time_blocks
             WHERE session_id = ?1
             ORDER BY start_offset_minutes, id",
        )
        .context("failed to prepare time block query")?;

    let blocks = stmt
        .query_map(params![session_id], |row| {
            Ok(TimeBlock {
                id: row.get(0)?,
                start_offset_minutes: row.get(1)?,
                duration_minutes: row.get(2)?,
                court_count: row.get(3)?,
                rotation_interval_minutes: row.get(4)?,
                focus: row.get(5)?,
                activities: Vec::new(),
                manual_assignments: Vec::new(),
            })
        })
        .context("failed to query time blocks")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map time block rows")?;

    Ok(blocks)
}

fn read_activities(tx: &Transaction<'_>, block_id: BlockId) -> Result<Vec<ActivityAssignment>> {
    let mut stmt = tx
        .prepare(
            "SELECT a.id, a.court_number, a.sequence_order, a.duration_minutes, d.name,
                    a.custom_activity_name
             FROM activity_assignments a
             LEFT JOIN drills d ON d.id = a.drill_id
             WHERE a.time_block_id = ?1
             ORDER BY a.court_number, a.sequence_order, a.id",
        )
        .context("failed to prepare activity query")?;

    let activities = stmt
        .query_map(params![block_id], |row| {
            Ok(ActivityAssignment {
                id: row.get(0)?,
                court_number: row.get(1)?,
                order: row.get(2)?,
                duration_minutes: row.get(3)?,
                drill_name: row.get(4)?,
                custom_name: row.get(5)?,
            })
        })
        .context("failed to query activities")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map activity rows")?;

    Ok(activities)
}

fn read_manual_assignments(
    tx: &Transaction<'_>,
    block_id: BlockId,
) -> Result<Vec<ManualCourtAssignment>> {
    let mut stmt = tx
        .prepare(
            "SELECT player_id, court_number
             FROM manual_court_assignments
             WHERE time_block_id = ?1
             ORDER BY player_id",
        )
        .context("failed to prepare manual assignment query")?;

    let overrides = stmt
        .query_map(params![block_id], |row| {
            Ok(ManualCourtAssignment {
                player_id: row.get(0)?,
                court_number: row.get(1)?,
            })
        })
        .context("failed to query manual assignments")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map manual assignment rows")?;

    Ok(overrides)
}

// A malformed stored date or time is treated as missing; the engine then
// reports the session as misconfigured instead of failing the read.

fn parse_date(session_id: SessionId, raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!("Session {session_id} has unreadable date `{raw}`: {e}");
            None
        }
    }
}

fn parse_time(session_id: SessionId, raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    let parsed = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok());
    if parsed.is_none() {
        warn!("Session {session_id} has unreadable start time `{raw}`");
    }
    parsed
}
