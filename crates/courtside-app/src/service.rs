// Request handling for live-state polls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use courtside_core::clock::{resolve_eval_instant, LiveSettings};
use courtside_core::live::{compute_live_state, LiveState};
use courtside_core::model::SessionId;
use courtside_core::source::ScheduleSource;

pub const SESSION_NOT_FOUND: &str = "Session not found.";
pub const CALCULATION_FAILED: &str = "Error calculating session state.";

/// One poll from a court-side display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollRequest {
    pub session_id: SessionId,
    /// Optional simulated instant for rehearsing a session ahead of time.
    #[serde(default)]
    pub sim_time_iso: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PollResponse {
    State(Box<LiveState>),
    Error { error: String },
}

impl PollResponse {
    pub fn error(message: impl Into<String>) -> Self {
        PollResponse::Error {
            error: message.into(),
        }
    }
}

/// Answers polls against a schedule source with fixed engine settings.
pub struct LiveService<S> {
    source: S,
    settings: LiveSettings,
}

impl<S: ScheduleSource> LiveService<S> {
    pub fn new(source: S, settings: LiveSettings) -> Self {
        LiveService { source, settings }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Compute the live state for `request`, with `now` standing in for the
    /// real clock. Lookup failures are reported in the response, never as
    /// an `Err`.
    pub fn poll(&self, request: &PollRequest, now: DateTime<Utc>) -> PollResponse {
        let snapshot = match self.source.load_snapshot(request.session_id) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("Poll for unknown session {}", request.session_id);
                return PollResponse::error(SESSION_NOT_FOUND);
            }
            Err(e) => {
                error!("Failed to load session {}: {e:#}", request.session_id);
                return PollResponse::error(CALCULATION_FAILED);
            }
        };

        let eval = resolve_eval_instant(
            request.sim_time_iso.as_deref(),
            now,
            self.settings.timezone,
        );
        let state = compute_live_state(&snapshot, eval, &self.settings);
        PollResponse::State(Box::new(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use courtside_core::clock::EvalSource;
    use courtside_core::live::SessionPhase;
    use courtside_core::model::{ScheduleSnapshot, Session};
    use courtside_core::source::InMemorySource;

    struct BrokenSource;

    impl ScheduleSource for BrokenSource {
        fn load_snapshot(&self, _: SessionId) -> anyhow::Result<Option<ScheduleSnapshot>> {
            Err(anyhow!("disk on fire"))
        }
    }

    fn snapshot() -> ScheduleSnapshot {
        ScheduleSnapshot {
            session: Session {
                id: 3,
                date: NaiveDate::from_ymd_opt(2025, 1, 1),
                start_time: NaiveTime::from_hms_opt(16, 0, 0),
                planned_duration_minutes: Some(60),
                group_name: None,
            },
            attendees: vec![],
            blocks: vec![],
        }
    }

    fn service() -> LiveService<InMemorySource> {
        LiveService::new([snapshot()].into_iter().collect(), LiveSettings::default())
    }

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn request(session_id: SessionId, sim: Option<&str>) -> PollRequest {
        PollRequest {
            session_id,
            sim_time_iso: sim.map(str::to_string),
        }
    }

    fn expect_state(response: PollResponse) -> LiveState {
        match response {
            PollResponse::State(state) => *state,
            PollResponse::Error { error } => panic!("expected state, got error {error}"),
        }
    }

    #[test]
    fn unknown_session_reports_not_found() {
        let response = service().poll(&request(9, None), noon_utc());
        assert_eq!(response, PollResponse::error(SESSION_NOT_FOUND));
    }

    #[test]
    fn source_failure_reports_generic_error() {
        let service = LiveService::new(BrokenSource, LiveSettings::default());
        let response = service.poll(&request(3, None), noon_utc());
        assert_eq!(response, PollResponse::error(CALCULATION_FAILED));
    }

    #[test]
    fn uses_supplied_now_without_override() {
        // 12:00 UTC is 14:00 in Johannesburg, two hours before the start.
        let state = expect_state(service().poll(&request(3, None), noon_utc()));
        assert_eq!(state.eval_source, EvalSource::RealClock);
        assert_eq!(state.session_info.phase, SessionPhase::PreStart);
        assert_eq!(state.session_info.status_message, "Session starts in 2h 0m");
    }

    #[test]
    fn simulated_time_drives_the_state() {
        let state = expect_state(
            service().poll(&request(3, Some("2025-01-01T16:30:00")), noon_utc()),
        );
        assert_eq!(state.eval_source, EvalSource::Simulated);
        assert_eq!(state.session_info.phase, SessionPhase::InProgress);
    }

    #[test]
    fn bad_override_falls_back_and_is_flagged() {
        let state = expect_state(service().poll(&request(3, Some("soon")), noon_utc()));
        assert_eq!(state.eval_source, EvalSource::InvalidOverride);
        assert_eq!(state.session_info.phase, SessionPhase::PreStart);
    }

    #[test]
    fn error_response_serializes_flat() {
        let json = serde_json::to_string(&PollResponse::error(SESSION_NOT_FOUND)).unwrap();
        assert_eq!(json, r#"{"error":"Session not found."}"#);
    }

    #[test]
    fn request_without_sim_time_parses() {
        let parsed: PollRequest = serde_json::from_str(r#"{"session_id": 3}"#).unwrap();
        assert_eq!(parsed, request(3, None));
    }
}
