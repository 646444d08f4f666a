// Where schedule snapshots come from.

use std::collections::HashMap;

use anyhow::Result;

use crate::model::{ScheduleSnapshot, SessionId};

/// Read access to stored schedules.
///
/// Implementations must return a consistent view: every part of one snapshot
/// reflects the same committed state of the store.
pub trait ScheduleSource: Send + Sync {
    /// Load the full schedule for `session_id`, or `None` if no such session
    /// exists.
    fn load_snapshot(&self, session_id: SessionId) -> Result<Option<ScheduleSnapshot>>;
}

/// Snapshots held in memory, keyed by session id.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    snapshots: HashMap<SessionId, ScheduleSnapshot>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the snapshot for its session.
    pub fn insert(&mut self, snapshot: ScheduleSnapshot) {
        self.snapshots.insert(snapshot.session.id, snapshot);
    }
}

impl FromIterator<ScheduleSnapshot> for InMemorySource {
    fn from_iter<I: IntoIterator<Item = ScheduleSnapshot>>(iter: I) -> Self {
        let mut source = InMemorySource::new();
        for snapshot in iter {
            source.insert(snapshot);
        }
        source
    }
}

impl ScheduleSource for InMemorySource {
    fn load_snapshot(&self, session_id: SessionId) -> Result<Option<ScheduleSnapshot>> {
        Ok(self.snapshots.get(&session_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Session;

    fn empty_snapshot(id: SessionId) -> ScheduleSnapshot {
        ScheduleSnapshot {
            session: Session {
                id,
                date: None,
                start_time: None,
                planned_duration_minutes: None,
                group_name: None,
            },
            attendees: vec![],
            blocks: vec![],
        }
    }

    #[test]
    fn returns_inserted_snapshot() {
        let source: InMemorySource = [empty_snapshot(1), empty_snapshot(2)].into_iter().collect();
        let loaded = source.load_snapshot(2).unwrap().unwrap();
        assert_eq!(loaded.session.id, 2);
    }

    #[test]
    fn unknown_session_is_none() {
        let source = InMemorySource::new();
        assert!(source.load_snapshot(42).unwrap().is_none());
    }

    #[test]
    fn insert_replaces_existing() {
        let mut source = InMemorySource::new();
        source.insert(empty_snapshot(1));
        let mut updated = empty_snapshot(1);
        updated.session.group_name = Some("Seniors".into());
        source.insert(updated);
        let loaded = source.load_snapshot(1).unwrap().unwrap();
        assert_eq!(loaded.session.group_name.as_deref(), Some("Seniors"));
    }
}
