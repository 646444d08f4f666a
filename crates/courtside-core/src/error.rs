// Error types for time resolution.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Why a session boundary or evaluation instant could not be placed on the
/// timeline. None of these are fatal: the engine turns them into a
/// `CONFIG_ERROR` phase or a fallback to the real clock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("Session start/end time not properly defined.")]
    MissingBounds,

    #[error("local time {local} is ambiguous in {zone}")]
    AmbiguousLocalTime { local: NaiveDateTime, zone: String },

    #[error("local time {local} does not exist in {zone}")]
    NonexistentLocalTime { local: NaiveDateTime, zone: String },

    #[error("unrecognised timestamp `{input}`")]
    Unparsable { input: String },
}
