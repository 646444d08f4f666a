// Library root for the live-session engine, its data model, and the
// read layer that feeds it schedule snapshots.

pub mod clock;
pub mod db;
pub mod error;
pub mod live;
pub mod model;
pub mod source;
