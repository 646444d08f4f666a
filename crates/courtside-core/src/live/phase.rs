// Session phase: where the evaluation instant falls relative to the session.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::clock::SessionBounds;

pub const IN_PROGRESS_MESSAGE: &str = "Session In Progress";
pub const FINISHED_MESSAGE: &str = "Session Finished!";

/// Session-level state. For a fixed session the resolved phase only ever
/// moves forward as the evaluation instant increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    PreStart,
    InProgress,
    Finished,
    /// The session's bounds could not be resolved. Terminal.
    ConfigError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStatus {
    pub phase: SessionPhase,
    pub message: String,
}

impl PhaseStatus {
    pub fn config_error(message: impl Into<String>) -> Self {
        PhaseStatus {
            phase: SessionPhase::ConfigError,
            message: message.into(),
        }
    }
}

/// Classify `eval` against the session bounds.
///
/// Before the start the message counts down in whole minutes (rounded down):
/// an hour or more reads `"Session starts in {h}h {m}m"`, under an hour
/// `"Session starts in {m} minutes"`, and under a minute
/// `"Session starting now!"`.
pub fn resolve_phase(bounds: &SessionBounds, eval: DateTime<Tz>) -> PhaseStatus {
    if eval < bounds.start {
        let minutes_to_start = (bounds.start - eval).num_seconds().div_euclid(60);
        let message = if minutes_to_start >= 60 {
            format!(
                "Session starts in {}h {}m",
                minutes_to_start / 60,
                minutes_to_start % 60
            )
        } else if minutes_to_start > 0 {
            format!("Session starts in {minutes_to_start} minutes")
        } else {
            "Session starting now!".to_string()
        };
        PhaseStatus {
            phase: SessionPhase::PreStart,
            message,
        }
    } else if eval >= bounds.end {
        PhaseStatus {
            phase: SessionPhase::Finished,
            message: FINISHED_MESSAGE.to_string(),
        }
    } else {
        PhaseStatus {
            phase: SessionPhase::InProgress,
            message: IN_PROGRESS_MESSAGE.to_string(),
        }
    }
}
