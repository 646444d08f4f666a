// Player placement: skill-priority auto-grouping and manual overrides.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::warn;

use crate::model::{ManualCourtAssignment, Player, PlayerId};

/// Players per court, indexed by court number minus one. Always holds
/// exactly `court_count` rosters, so iteration order is the court order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourtAssignment<'a> {
    courts: Vec<Vec<&'a Player>>,
}

impl<'a> CourtAssignment<'a> {
    pub fn empty(court_count: u32) -> Self {
        CourtAssignment {
            courts: vec![Vec::new(); court_count as usize],
        }
    }

    pub fn court_count(&self) -> u32 {
        self.courts.len() as u32
    }

    /// Roster of `court` (1-based). Out-of-range courts are empty.
    pub fn court(&self, court: u32) -> &[&'a Player] {
        court
            .checked_sub(1)
            .and_then(|i| self.courts.get(i as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rosters in court order, paired with their 1-based court number.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[&'a Player])> + '_ {
        self.courts
            .iter()
            .enumerate()
            .map(|(i, roster)| (i as u32 + 1, roster.as_slice()))
    }

    pub fn player_count(&self) -> usize {
        self.courts.iter().map(Vec::len).sum()
    }

    /// The court `player` is on, if any.
    pub fn court_of(&self, player: PlayerId) -> Option<u32> {
        self.iter()
            .find(|(_, roster)| roster.iter().any(|p| p.id == player))
            .map(|(court, _)| court)
    }

    pub(crate) fn from_courts(courts: Vec<Vec<&'a Player>>) -> Self {
        CourtAssignment { courts }
    }

    pub(crate) fn into_courts(self) -> Vec<Vec<&'a Player>> {
        self.courts
    }

    /// Sort every roster by last name, then first name.
    pub(crate) fn sort_by_name(&mut self) {
        for roster in &mut self.courts {
            roster.sort_by(|a, b| by_name(a, b));
        }
    }
}

fn by_name(a: &Player, b: &Player) -> Ordering {
    (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
}

fn by_skill_then_name(a: &Player, b: &Player) -> Ordering {
    a.skill_level
        .rank()
        .cmp(&b.skill_level.rank())
        .then_with(|| by_name(a, b))
}

/// Deal `players` onto courts in skill-priority order.
///
/// Players are sorted by skill rank (Advanced first, Unknown last), then last
/// and first name, and the i-th player goes to court `(i mod court_count) + 1`.
/// Rosters keep the dealing order. With no courts nothing is placed.
pub fn group_by_skill<'a>(players: &[&'a Player], court_count: u32) -> CourtAssignment<'a> {
    let mut groups = CourtAssignment::empty(court_count);
    if court_count == 0 {
        return groups;
    }

    let mut sorted = players.to_vec();
    sorted.sort_by(|a, b| by_skill_then_name(a, b));

    for (i, player) in sorted.into_iter().enumerate() {
        groups.courts[i % court_count as usize].push(player);
    }
    groups
}

/// Keep only overrides that name a current attendee and a court that exists
/// in the block. Invalid courts are logged; that player falls back to
/// auto-grouping.
pub fn usable_overrides(
    overrides: &[ManualCourtAssignment],
    attendees: &[Player],
    court_count: u32,
) -> Vec<ManualCourtAssignment> {
    let attending: HashSet<PlayerId> = attendees.iter().map(|p| p.id).collect();
    let mut seen = HashSet::new();
    let mut usable: Vec<ManualCourtAssignment> = overrides
        .iter()
        .filter(|m| attending.contains(&m.player_id))
        .filter(|m| {
            let valid = (1..=court_count).contains(&m.court_number);
            if !valid {
                warn!(
                    "Ignoring manual assignment of player {} to court {} (block has {} courts)",
                    m.player_id, m.court_number, court_count
                );
            }
            valid
        })
        .filter(|m| seen.insert(m.player_id))
        .copied()
        .collect();
    usable.sort_by_key(|m| m.player_id);
    usable
}

/// Build the rotation-0 assignment for a block.
///
/// Attendees without an override are auto-grouped; each overridden player is
/// then removed from any other court and placed on their target court.
/// Every roster ends up sorted by name.
pub fn initial_assignment<'a>(
    attendees: &'a [Player],
    overrides: &[ManualCourtAssignment],
    court_count: u32,
) -> CourtAssignment<'a> {
    let overrides = usable_overrides(overrides, attendees, court_count);
    let overridden: HashSet<PlayerId> = overrides.iter().map(|m| m.player_id).collect();

    let unassigned: Vec<&Player> = attendees
        .iter()
        .filter(|p| !overridden.contains(&p.id))
        .collect();

    let auto = group_by_skill(&unassigned, court_count);
    merge_overrides(auto, &overrides, attendees)
}

/// Overlay `overrides` onto an auto-grouping. Overrides for players who are
/// not in `attendees` are skipped, and placing a player who is already on the
/// target court is a no-op.
pub fn merge_overrides<'a>(
    auto: CourtAssignment<'a>,
    overrides: &[ManualCourtAssignment],
    attendees: &'a [Player],
) -> CourtAssignment<'a> {
    let mut merged = auto;

    for m in overrides {
        let Some(player) = attendees.iter().find(|p| p.id == m.player_id) else {
            continue;
        };
        let Some(target) = m.court_number.checked_sub(1).map(|i| i as usize) else {
            continue;
        };
        if target >= merged.courts.len() {
            continue;
        }

        for (i, roster) in merged.courts.iter_mut().enumerate() {
            if i != target {
                roster.retain(|p| p.id != player.id);
            }
        }
        if !merged.courts[target].iter().any(|p| p.id == player.id) {
            merged.courts[target].push(player);
        }
    }

    merged.sort_by_name();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SkillLevel;

    fn player(id: PlayerId, first: &str, last: &str, skill: SkillLevel) -> Player {
        Player {
            id,
            first_name: first.into(),
            last_name: last.into(),
            skill_level: skill,
        }
    }

    fn ids(roster: &[&Player]) -> Vec<PlayerId> {
        roster.iter().map(|p| p.id).collect()
    }

    fn squad() -> Vec<Player> {
        vec![
            player(1, "Ava", "Botha", SkillLevel::Beginner),
            player(2, "Ben", "Adams", SkillLevel::Advanced),
            player(3, "Cara", "Nel", SkillLevel::Intermediate),
            player(4, "Dan", "Zulu", SkillLevel::Advanced),
            player(5, "Eve", "Smit", SkillLevel::Beginner),
        ]
    }

    #[test]
    fn round_robin_by_skill_then_name() {
        let players = squad();
        let refs: Vec<&Player> = players.iter().collect();
        // Sorted: Adams(A), Zulu(A), Nel(I), Botha(B), Smit(B)
        let groups = group_by_skill(&refs, 2);
        assert_eq!(ids(groups.court(1)), vec![2, 3, 5]);
        assert_eq!(ids(groups.court(2)), vec![4, 1]);
    }

    #[test]
    fn unknown_skill_dealt_last() {
        let players = vec![
            player(1, "Amy", "Abel", SkillLevel::Unknown),
            player(2, "Bob", "Zed", SkillLevel::Beginner),
        ];
        let refs: Vec<&Player> = players.iter().collect();
        let groups = group_by_skill(&refs, 1);
        assert_eq!(ids(groups.court(1)), vec![2, 1]);
    }

    #[test]
    fn zero_courts_places_nobody() {
        let players = squad();
        let refs: Vec<&Player> = players.iter().collect();
        let groups = group_by_skill(&refs, 0);
        assert_eq!(groups.court_count(), 0);
        assert_eq!(groups.player_count(), 0);
        assert!(groups.court(1).is_empty());
    }

    #[test]
    fn court_sizes_differ_by_at_most_one() {
        let players: Vec<Player> = (0..23)
            .map(|i| player(i, &format!("F{i}"), &format!("L{i:02}"), SkillLevel::Intermediate))
            .collect();
        let refs: Vec<&Player> = players.iter().collect();
        for courts in 1..=7u32 {
            let groups = group_by_skill(&refs, courts);
            let floor = players.len() / courts as usize;
            let ceil = players.len().div_ceil(courts as usize);
            for (_, roster) in groups.iter() {
                assert!(
                    roster.len() == floor || roster.len() == ceil,
                    "{} players on one of {courts} courts",
                    roster.len()
                );
            }
            assert_eq!(groups.player_count(), players.len());
        }
    }

    #[test]
    fn manual_override_beats_auto_placement() {
        let players = squad();
        // Adams would be dealt onto court 1; pin them to court 2.
        let overrides = vec![ManualCourtAssignment {
            player_id: 2,
            court_number: 2,
        }];
        let initial = initial_assignment(&players, &overrides, 2);
        assert_eq!(initial.court_of(2), Some(2));
        assert_eq!(initial.player_count(), 5);
    }

    #[test]
    fn merged_rosters_sorted_by_name() {
        let players = squad();
        let overrides = vec![ManualCourtAssignment {
            player_id: 4,
            court_number: 1,
        }];
        let initial = initial_assignment(&players, &overrides, 2);
        for (_, roster) in initial.iter() {
            let names: Vec<&str> = roster.iter().map(|p| p.last_name.as_str()).collect();
            let mut sorted = names.clone();
            sorted.sort();
            assert_eq!(names, sorted);
        }
        assert_eq!(initial.court_of(4), Some(1));
    }

    #[test]
    fn override_for_absent_player_ignored() {
        let players = squad();
        let overrides = vec![ManualCourtAssignment {
            player_id: 99,
            court_number: 1,
        }];
        let initial = initial_assignment(&players, &overrides, 2);
        assert_eq!(initial.player_count(), 5);
        assert!(initial.court_of(99).is_none());
    }

    #[test]
    fn override_to_missing_court_falls_back_to_auto() {
        let players = squad();
        let overrides = vec![ManualCourtAssignment {
            player_id: 1,
            court_number: 7,
        }];
        let initial = initial_assignment(&players, &overrides, 2);
        assert_eq!(initial.player_count(), 5);
        assert!(initial.court_of(1).is_some());
    }

    #[test]
    fn merge_is_idempotent_for_player_already_on_target() {
        let players = squad();
        let refs: Vec<&Player> = players.iter().collect();
        let auto = group_by_skill(&refs, 2);
        let overrides = vec![ManualCourtAssignment {
            player_id: 2,
            court_number: 1,
        }];
        let merged = merge_overrides(auto, &overrides, &players);
        assert_eq!(merged.court(1).iter().filter(|p| p.id == 2).count(), 1);
        assert_eq!(merged.player_count(), 5);
    }

    #[test]
    fn merge_moves_player_off_auto_court() {
        let players = squad();
        let refs: Vec<&Player> = players.iter().collect();
        let auto = group_by_skill(&refs, 2);
        assert_eq!(auto.court_of(1), Some(2));
        let overrides = vec![ManualCourtAssignment {
            player_id: 1,
            court_number: 1,
        }];
        let merged = merge_overrides(auto, &overrides, &players);
        assert_eq!(merged.court_of(1), Some(1));
        assert_eq!(merged.player_count(), 5);
    }
}
