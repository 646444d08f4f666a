// Live state assembly: one serializable snapshot of "what is happening now".

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{EvalInstant, EvalSource, LiveSettings, SessionBounds};
use crate::model::{BlockId, ScheduleSnapshot, SessionId};

use super::activity::{resolve_court_activity, CurrentActivity, NextActivity};
use super::blocks::{locate_block, BlockPosition, BlockPreview, BlockWindow, DEFAULT_FOCUS};
use super::court_rotation::rotate_courts;
use super::grouping::initial_assignment;
use super::phase::{resolve_phase, PhaseStatus, SessionPhase};
use super::rotation::{rotation_state, RotationState};

pub const ROTATE_NOW_MESSAGE: &str = "ROTATE NOW!";

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub name_display: String,
    pub overall_start_datetime_iso: Option<String>,
    pub overall_end_datetime_iso: Option<String>,
    pub phase: SessionPhase,
    /// True only while the session is in progress.
    pub is_live: bool,
    pub status_message: String,
    /// Widest court grid used by any block of the session.
    pub display_court_count: u32,
    /// Attendee first names, filled in before the session starts.
    pub attending_players_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentBlockSummary {
    pub id: BlockId,
    pub block_focus: String,
    pub block_start_datetime_iso: String,
    pub block_end_datetime_iso: String,
    pub time_remaining_in_block_seconds: i64,
    pub rotation_interval_minutes: Option<u32>,
    pub next_rotation_due_datetime_iso: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtState {
    pub court_number: u32,
    pub current_activity: Option<CurrentActivity>,
    pub next_activity: Option<NextActivity>,
    pub assigned_player_names: Vec<String>,
}

/// The full live view of a session at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    pub session_info: SessionInfo,
    pub current_time_block: Option<CurrentBlockSummary>,
    pub next_time_block_preview: Option<BlockPreview>,
    pub courts: Vec<CourtState>,
    pub is_rotation_alert_active: bool,
    pub effective_current_time_iso: String,
    /// Whether the instant came from the real clock, a simulated override,
    /// or a fallback after an unusable override.
    pub eval_source: EvalSource,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Compute the live state of `snapshot` at `eval`.
///
/// Pure: the same snapshot, instant and settings always give the same result,
/// and nothing in the snapshot is modified. Unresolvable session bounds are
/// reported through the `CONFIG_ERROR` phase instead of an error.
pub fn compute_live_state(
    snapshot: &ScheduleSnapshot,
    eval: EvalInstant,
    settings: &LiveSettings,
) -> LiveState {
    let tz = settings.timezone;
    let at = eval.at.with_timezone(&tz);
    let session = &snapshot.session;

    let mut state = LiveState {
        session_info: SessionInfo {
            id: session.id,
            name_display: session.display_name(),
            overall_start_datetime_iso: None,
            overall_end_datetime_iso: None,
            phase: SessionPhase::ConfigError,
            is_live: false,
            status_message: String::new(),
            display_court_count: snapshot.display_court_count(),
            attending_players_names: Vec::new(),
        },
        current_time_block: None,
        next_time_block_preview: None,
        courts: Vec::new(),
        is_rotation_alert_active: false,
        effective_current_time_iso: at.to_rfc3339(),
        eval_source: eval.source,
    };

    let bounds = match SessionBounds::resolve(session, tz) {
        Ok(bounds) => bounds,
        Err(e) => {
            warn!("Session {} has unusable bounds: {e}", session.id);
            let status = PhaseStatus::config_error(e.to_string());
            state.session_info.phase = status.phase;
            state.session_info.status_message = status.message;
            return state;
        }
    };

    let info = &mut state.session_info;
    info.overall_start_datetime_iso = Some(bounds.start.to_rfc3339());
    info.overall_end_datetime_iso = Some(bounds.end.to_rfc3339());

    let phase = resolve_phase(&bounds, at);
    info.phase = phase.phase;
    info.is_live = phase.phase == SessionPhase::InProgress;
    info.status_message = phase.message;

    match phase.phase {
        SessionPhase::InProgress => {}
        SessionPhase::PreStart => {
            let mut attendees: Vec<_> = snapshot.attendees.iter().collect();
            attendees.sort_by(|a, b| {
                (&a.first_name, &a.last_name, a.id).cmp(&(&b.first_name, &b.last_name, b.id))
            });
            info.attending_players_names =
                attendees.iter().map(|p| p.first_name.clone()).collect();
            return state;
        }
        SessionPhase::Finished | SessionPhase::ConfigError => return state,
    }

    let blocks = snapshot.ordered_blocks();
    let position = locate_block(&blocks, bounds.start, at);
    info.status_message = position.status_message();

    let (window, following) = match position {
        BlockPosition::Current { window, following } => (window, following),
        BlockPosition::Upcoming { preview, .. } => {
            state.next_time_block_preview = Some(preview);
            return state;
        }
        BlockPosition::Idle => return state,
    };

    let rotation = rotation_state(&window, at, settings.alert_window);
    if rotation.alert_active {
        info.status_message = ROTATE_NOW_MESSAGE.to_string();
    }

    state.current_time_block = Some(block_summary(&window, &rotation, at));
    state.next_time_block_preview = following;
    state.is_rotation_alert_active = rotation.alert_active;
    state.courts = court_states(snapshot, &window, &rotation);

    debug!(
        "Session {} block {}: {} rotations, alert={}",
        session.id, window.block.id, rotation.rotations_occurred, rotation.alert_active
    );

    state
}

fn block_summary(
    window: &BlockWindow<'_>,
    rotation: &RotationState,
    at: DateTime<Tz>,
) -> CurrentBlockSummary {
    let block = window.block;
    CurrentBlockSummary {
        id: block.id,
        block_focus: block.focus_label().unwrap_or(DEFAULT_FOCUS).to_string(),
        block_start_datetime_iso: window.start.to_rfc3339(),
        block_end_datetime_iso: window.end.to_rfc3339(),
        time_remaining_in_block_seconds: (window.end - at).num_seconds(),
        rotation_interval_minutes: block.rotation_interval_minutes,
        next_rotation_due_datetime_iso: rotation.next_rotation.map(|t| t.to_rfc3339()),
    }
}

fn court_states(
    snapshot: &ScheduleSnapshot,
    window: &BlockWindow<'_>,
    rotation: &RotationState,
) -> Vec<CourtState> {
    let block = window.block;
    let initial = initial_assignment(
        &snapshot.attendees,
        &block.manual_assignments,
        block.court_count,
    );
    let assignment = rotate_courts(&initial, rotation.rotations_occurred);

    (1..=block.court_count)
        .map(|court| {
            let sequence = block.court_sequence(court);
            let activity =
                resolve_court_activity(&sequence, rotation.interval_ms, rotation.elapsed_ms);
            CourtState {
                court_number: court,
                current_activity: activity.current,
                next_activity: activity.next,
                assigned_player_names: assignment
                    .court(court)
                    .iter()
                    .map(|p| p.full_name())
                    .collect(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
