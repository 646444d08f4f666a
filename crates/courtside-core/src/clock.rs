// Timezone handling: session boundaries and the evaluation instant.
//
// All engine arithmetic happens on `DateTime<Tz>` in a single process-wide
// zone. Naive wall-clock values (session date + start time, timezone-less
// simulated instants) are placed in that zone here, and anything that cannot
// be placed unambiguously is reported as a `ClockError`.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ClockError;
use crate::model::Session;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Africa::Johannesburg;

/// Naive layouts accepted for simulated instants, tried in order after
/// RFC 3339.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Window on the time remaining until the next rotation during which the
/// "ROTATE NOW!" alert is shown. Tuned to a polling cadence of a few seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertWindow {
    /// Seconds before the boundary at which the alert switches on.
    pub lead_seconds: u32,
    /// Lower bound on the time until the next boundary, as seconds below
    /// zero. That time is always positive inside a block.
    pub lag_seconds: u32,
}

impl Default for AlertWindow {
    fn default() -> Self {
        AlertWindow {
            lead_seconds: 10,
            lag_seconds: 5,
        }
    }
}

impl AlertWindow {
    /// Whether the next boundary, `until_boundary_ms` away, falls inside the
    /// window: `-lag <= t < lead`.
    pub fn contains(&self, until_boundary_ms: i64) -> bool {
        let lag_ms = i64::from(self.lag_seconds) * 1000;
        let lead_ms = i64::from(self.lead_seconds) * 1000;
        until_boundary_ms >= -lag_ms && until_boundary_ms < lead_ms
    }
}

/// Process-wide inputs to the engine that are not part of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSettings {
    pub timezone: Tz,
    pub alert_window: AlertWindow,
}

impl Default for LiveSettings {
    fn default() -> Self {
        LiveSettings {
            timezone: DEFAULT_TIMEZONE,
            alert_window: AlertWindow::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session bounds
// ---------------------------------------------------------------------------

/// Absolute start and end of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBounds {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl SessionBounds {
    /// Place the session's local date and start time in `tz` and add the
    /// planned duration. A missing date, time or duration (or a zero
    /// duration) yields `MissingBounds`; DST gaps and folds yield the
    /// matching clock error.
    pub fn resolve(session: &Session, tz: Tz) -> Result<Self, ClockError> {
        let (Some(date), Some(time)) = (session.date, session.start_time) else {
            return Err(ClockError::MissingBounds);
        };
        let minutes = session
            .planned_duration_minutes
            .filter(|m| *m > 0)
            .ok_or(ClockError::MissingBounds)?;

        let start = localize(date.and_time(time), tz)?;
        let end = start + Duration::minutes(i64::from(minutes));
        Ok(SessionBounds { start, end })
    }
}

/// Interpret a wall-clock value in `tz`, rejecting DST-ambiguous and
/// nonexistent local times.
pub fn localize(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, ClockError> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(_, _) => Err(ClockError::AmbiguousLocalTime {
            local,
            zone: tz.name().to_string(),
        }),
        LocalResult::None => Err(ClockError::NonexistentLocalTime {
            local,
            zone: tz.name().to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Evaluation instant
// ---------------------------------------------------------------------------

/// Where the evaluation instant of a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalSource {
    /// No override was supplied; the real clock was used.
    RealClock,
    /// A simulated instant was supplied and parsed.
    Simulated,
    /// An override was supplied but could not be parsed or placed in the
    /// configured zone; the real clock was used instead.
    InvalidOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalInstant {
    pub at: DateTime<Tz>,
    pub source: EvalSource,
}

impl EvalInstant {
    pub fn simulated(at: DateTime<Tz>) -> Self {
        EvalInstant {
            at,
            source: EvalSource::Simulated,
        }
    }
}

/// Parse an ISO-8601 instant. Offset-aware input is converted into `tz`;
/// naive input is read as wall-clock time in `tz`.
pub fn parse_eval_instant(raw: &str, tz: Tz) -> Result<DateTime<Tz>, ClockError> {
    let raw = raw.trim();

    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        return Ok(aware.with_timezone(&tz));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return localize(naive, tz);
        }
    }

    Err(ClockError::Unparsable {
        input: raw.to_string(),
    })
}

/// Choose the instant a snapshot is computed for. An override that cannot be
/// used never fails the request: it is logged and the real clock (`now`) is
/// used, with the fallback recorded in the returned source.
pub fn resolve_eval_instant(override_iso: Option<&str>, now: DateTime<Utc>, tz: Tz) -> EvalInstant {
    let real = EvalInstant {
        at: now.with_timezone(&tz),
        source: EvalSource::RealClock,
    };

    let Some(raw) = override_iso.map(str::trim).filter(|s| !s.is_empty()) else {
        return real;
    };

    match parse_eval_instant(raw, tz) {
        Ok(at) => {
            debug!("Using simulated time {}", at.to_rfc3339());
            EvalInstant::simulated(at)
        }
        Err(e) => {
            warn!("Invalid simulated time `{raw}` ({e}); using real time");
            EvalInstant {
                source: EvalSource::InvalidOverride,
                ..real
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
