// Per-court activity lookup within the rotation cycle.

use serde::{Deserialize, Serialize};

use crate::model::{ActivityAssignment, ActivityId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentActivity {
    pub name: String,
    pub activity_id: ActivityId,
    pub time_remaining_in_activity_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextActivity {
    pub name: String,
    pub duration_minutes: u32,
}

impl NextActivity {
    fn of(activity: &ActivityAssignment) -> Self {
        NextActivity {
            name: activity.display_name().to_string(),
            duration_minutes: activity.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourtActivity {
    pub current: Option<CurrentActivity>,
    pub next: Option<NextActivity>,
}

/// Find what a court is running `elapsed_ms` into its block.
///
/// The sequence is laid out back to back from the start of each rotation
/// cycle (or of the block, when `interval_ms` is 0). The activity whose slot
/// contains the cycle offset is current; its countdown stops at the slot end
/// or the rotation boundary, whichever is sooner. The next activity is the
/// following entry, wrapping to the first when the block rotates.
///
/// When the cycle offset is past the end of the sequence nothing is current,
/// and the first slot starting at or after the offset (if any) is reported
/// as next.
pub fn resolve_court_activity(
    sequence: &[&ActivityAssignment],
    interval_ms: i64,
    elapsed_ms: i64,
) -> CourtActivity {
    if sequence.is_empty() {
        return CourtActivity::default();
    }

    let rotates = interval_ms > 0;
    let cycle_ms = if rotates {
        elapsed_ms.rem_euclid(interval_ms)
    } else {
        elapsed_ms
    };

    let mut slot_start = 0;
    for (i, activity) in sequence.iter().enumerate() {
        let slot_end = slot_start + activity.duration_seconds() * 1000;

        if slot_start <= cycle_ms && cycle_ms < slot_end {
            let mut remaining_ms = slot_end - cycle_ms;
            if rotates {
                remaining_ms = remaining_ms.min(interval_ms - cycle_ms);
            }

            let next = match sequence.get(i + 1) {
                Some(following) => Some(NextActivity::of(following)),
                None if rotates => Some(NextActivity::of(sequence[0])),
                None => None,
            };

            return CourtActivity {
                current: Some(CurrentActivity {
                    name: activity.display_name().to_string(),
                    activity_id: activity.id,
                    time_remaining_in_activity_seconds: remaining_ms.max(0) / 1000,
                }),
                next,
            };
        }

        slot_start = slot_end;
    }

    let mut slot_start = 0;
    for activity in sequence {
        if slot_start >= cycle_ms {
            return CourtActivity {
                current: None,
                next: Some(NextActivity::of(activity)),
            };
        }
        slot_start += activity.duration_seconds() * 1000;
    }

    CourtActivity::default()
}
