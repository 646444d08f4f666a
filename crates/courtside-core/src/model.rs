// Read-only schedule model: sessions, time blocks, activities, players.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub type SessionId = i64;
pub type BlockId = i64;
pub type ActivityId = i64;
pub type PlayerId = i64;
pub type DrillId = i64;

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Coach-assessed playing level. Drives the order in which players are dealt
/// onto courts by the skill-priority grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    Advanced,
    Intermediate,
    Beginner,
    /// Anything the store holds that is not a recognised level. Sorts last.
    Unknown,
}

impl SkillLevel {
    /// Parse a stored level code. Accepts the short codes (`ADV`, `INT`,
    /// `BEG`) and the full labels, case-insensitively. Everything else,
    /// including the empty string, maps to `Unknown`.
    pub fn from_code(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ADV" | "ADVANCED" => SkillLevel::Advanced,
            "INT" | "INTERMEDIATE" => SkillLevel::Intermediate,
            "BEG" | "BEGINNER" => SkillLevel::Beginner,
            _ => SkillLevel::Unknown,
        }
    }

    /// Short code used in storage. `Unknown` stores as an empty string.
    pub fn code(&self) -> &'static str {
        match self {
            SkillLevel::Advanced => "ADV",
            SkillLevel::Intermediate => "INT",
            SkillLevel::Beginner => "BEG",
            SkillLevel::Unknown => "",
        }
    }

    /// Grouping priority: lower ranks are dealt first.
    pub fn rank(&self) -> u8 {
        match self {
            SkillLevel::Advanced => 0,
            SkillLevel::Intermediate => 1,
            SkillLevel::Beginner => 2,
            SkillLevel::Unknown => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub first_name: String,
    pub last_name: String,
    pub skill_level: SkillLevel,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ---------------------------------------------------------------------------
// Sessions and blocks
// ---------------------------------------------------------------------------

/// A single coaching session. Date, start time and duration are optional
/// because the authoring layer does not guarantee them; the engine reports a
/// configuration error when they cannot be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub planned_duration_minutes: Option<u32>,
    /// Label of the group being coached (e.g. "U13 Squad").
    pub group_name: Option<String>,
}

impl Session {
    /// Human-readable heading, e.g. `"U13 Squad - 01 Jan 2025"`.
    pub fn display_name(&self) -> String {
        let group = self.group_name.as_deref().unwrap_or("Session");
        match self.date {
            Some(date) => format!("{group} - {}", date.format("%d %b %Y")),
            None => group.to_string(),
        }
    }
}

/// One step of a court's drill sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityAssignment {
    pub id: ActivityId,
    pub court_number: u32,
    /// Position in the court's sequence (0 first).
    pub order: u32,
    pub duration_minutes: u32,
    /// Name of the referenced drill, when the activity uses one.
    pub drill_name: Option<String>,
    /// Free-text label used when no drill is referenced.
    pub custom_name: String,
}

impl ActivityAssignment {
    pub fn display_name(&self) -> &str {
        match self.drill_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.custom_name,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        i64::from(self.duration_minutes) * 60
    }
}

/// Coach override placing a player on a specific court for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualCourtAssignment {
    pub player_id: PlayerId,
    pub court_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: BlockId,
    /// Minutes after the session start at which this block begins.
    pub start_offset_minutes: u32,
    pub duration_minutes: u32,
    pub court_count: u32,
    /// Rotate players between courts every N minutes. `None` or `Some(0)`
    /// means no rotation.
    pub rotation_interval_minutes: Option<u32>,
    pub focus: Option<String>,
    pub activities: Vec<ActivityAssignment>,
    pub manual_assignments: Vec<ManualCourtAssignment>,
}

impl TimeBlock {
    /// Focus label with empty strings treated as absent.
    pub fn focus_label(&self) -> Option<&str> {
        self.focus.as_deref().filter(|f| !f.is_empty())
    }

    /// Rotation interval in seconds, or 0 when the block does not rotate.
    pub fn rotation_interval_seconds(&self) -> i64 {
        self.rotation_interval_minutes
            .map(|m| i64::from(m) * 60)
            .unwrap_or(0)
    }

    /// Activities scheduled on `court`, in sequence order.
    pub fn court_sequence(&self, court: u32) -> Vec<&ActivityAssignment> {
        let mut seq: Vec<&ActivityAssignment> = self
            .activities
            .iter()
            .filter(|a| a.court_number == court)
            .collect();
        seq.sort_by_key(|a| (a.order, a.id));
        seq
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the engine needs for one session, read in a single consistent
/// pass from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub session: Session,
    pub attendees: Vec<Player>,
    pub blocks: Vec<TimeBlock>,
}

impl ScheduleSnapshot {
    /// Blocks in schedule order (by start offset, ties broken by id).
    pub fn ordered_blocks(&self) -> Vec<&TimeBlock> {
        let mut blocks: Vec<&TimeBlock> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| (b.start_offset_minutes, b.id));
        blocks
    }

    /// Widest court grid any block uses; 1 when there are no blocks.
    pub fn display_court_count(&self) -> u32 {
        self.blocks
            .iter()
            .map(|b| b.court_count)
            .max()
            .unwrap_or(1)
            .max(1)
    }
}
