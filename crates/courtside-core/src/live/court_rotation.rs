// Court rotation: shift the rotation-0 assignment by completed rotations.

use super::grouping::CourtAssignment;

/// Move every roster forward `rotations` courts, court `n` wrapping to 1.
///
/// One step moves the players on court `i` to court `(i mod n) + 1`; applying
/// `n` steps is the identity, so only `rotations mod n` steps are performed.
/// Rosters are re-sorted by name afterwards.
pub fn rotate_courts<'a>(initial: &CourtAssignment<'a>, rotations: u32) -> CourtAssignment<'a> {
    let court_count = initial.court_count();
    if rotations == 0 || court_count <= 1 {
        return initial.clone();
    }

    let shift = (rotations % court_count) as usize;
    let mut courts = initial.clone().into_courts();
    courts.rotate_right(shift);

    let mut rotated = CourtAssignment::from_courts(courts);
    rotated.sort_by_name();
    rotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::grouping::initial_assignment;
    use crate::model::{Player, PlayerId, SkillLevel};

    fn players(n: i64) -> Vec<Player> {
        (1..=n)
            .map(|id| Player {
                id,
                first_name: format!("P{id}"),
                last_name: format!("Surname{id:02}"),
                skill_level: SkillLevel::Intermediate,
            })
            .collect()
    }

    fn ids(a: &CourtAssignment<'_>, court: u32) -> Vec<PlayerId> {
        a.court(court).iter().map(|p| p.id).collect()
    }

    /// Apply single steps literally, without the modulo shortcut.
    fn step_once<'a>(a: &CourtAssignment<'a>) -> CourtAssignment<'a> {
        let n = a.court_count();
        let mut courts: Vec<Vec<&Player>> = vec![Vec::new(); n as usize];
        for (court, roster) in a.iter() {
            let target = (court % n) + 1;
            courts[(target - 1) as usize].extend_from_slice(roster);
        }
        let mut next = CourtAssignment::from_courts(courts);
        next.sort_by_name();
        next
    }

    #[test]
    fn zero_rotations_is_identity() {
        let roster = players(6);
        let initial = initial_assignment(&roster, &[], 3);
        assert_eq!(rotate_courts(&initial, 0), initial);
    }

    #[test]
    fn single_court_never_moves() {
        let roster = players(4);
        let initial = initial_assignment(&roster, &[], 1);
        assert_eq!(rotate_courts(&initial, 5), initial);
    }

    #[test]
    fn one_step_moves_to_next_court_and_wraps() {
        let roster = players(6);
        let initial = initial_assignment(&roster, &[], 3);
        let rotated = rotate_courts(&initial, 1);
        assert_eq!(ids(&rotated, 2), ids(&initial, 1));
        assert_eq!(ids(&rotated, 3), ids(&initial, 2));
        assert_eq!(ids(&rotated, 1), ids(&initial, 3));
    }

    #[test]
    fn full_cycle_is_identity() {
        let roster = players(7);
        for courts in 2..=5u32 {
            let initial = initial_assignment(&roster, &[], courts);
            assert_eq!(rotate_courts(&initial, courts), initial);
            assert_eq!(rotate_courts(&initial, courts * 3), initial);
        }
    }

    #[test]
    fn modulo_shortcut_matches_repeated_steps() {
        let roster = players(9);
        let initial = initial_assignment(&roster, &[], 4);
        let mut stepped = initial.clone();
        for rotations in 1..=9u32 {
            stepped = step_once(&stepped);
            assert_eq!(rotate_courts(&initial, rotations), stepped, "after {rotations} steps");
        }
    }
}
