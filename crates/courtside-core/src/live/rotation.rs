// Rotation clock: position within the current block's rotation cycle.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::clock::AlertWindow;

use super::blocks::BlockWindow;

/// Rotation bookkeeping for one evaluation instant inside a block.
///
/// Times are kept in milliseconds so sub-second simulated instants do not
/// drift across boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationState {
    /// Rotation period, or 0 when the block does not rotate.
    pub interval_ms: i64,
    /// Time since the block started.
    pub elapsed_ms: i64,
    /// Next boundary, when it falls before the block ends.
    pub next_rotation: Option<DateTime<Tz>>,
    pub alert_active: bool,
    /// Completed rotations; drives the court shift.
    pub rotations_occurred: u32,
}

impl RotationState {
    pub fn rotates(&self) -> bool {
        self.interval_ms > 0
    }

    /// Offset into the current rotation cycle. A block without rotation is
    /// treated as one long cycle.
    pub fn cycle_ms(&self) -> i64 {
        if self.rotates() {
            self.elapsed_ms.rem_euclid(self.interval_ms)
        } else {
            self.elapsed_ms
        }
    }
}

/// Compute the rotation state of `window` at `eval`.
///
/// The alert is judged only against the next boundary inside the block, so
/// it never fires once the last in-block boundary has passed.
pub fn rotation_state(window: &BlockWindow<'_>, eval: DateTime<Tz>, alert: AlertWindow) -> RotationState {
    let elapsed_ms = (eval - window.start).num_milliseconds();
    let interval_ms = window.block.rotation_interval_seconds() * 1000;

    if interval_ms <= 0 {
        return RotationState {
            interval_ms: 0,
            elapsed_ms,
            next_rotation: None,
            alert_active: false,
            rotations_occurred: 0,
        };
    }

    let passed = elapsed_ms.div_euclid(interval_ms);
    let next = window.start + Duration::milliseconds((passed + 1) * interval_ms);
    let next_rotation = (next < window.end).then_some(next);

    let alert_active = next_rotation
        .map(|n| alert.contains((n - eval).num_milliseconds()))
        .unwrap_or(false);

    let rotations_occurred = if elapsed_ms >= interval_ms {
        u32::try_from(passed).unwrap_or(u32::MAX)
    } else {
        0
    };

    RotationState {
        interval_ms,
        elapsed_ms,
        next_rotation,
        alert_active,
        rotations_occurred,
    }
}
