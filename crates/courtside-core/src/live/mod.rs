// Live-session engine: pure functions from a schedule snapshot and an
// evaluation instant to the state shown on the court-side display.

pub mod activity;
pub mod blocks;
pub mod court_rotation;
pub mod grouping;
pub mod phase;
pub mod rotation;
pub mod state;

pub use phase::SessionPhase;
pub use state::{compute_live_state, CourtState, CurrentBlockSummary, LiveState, SessionInfo};
