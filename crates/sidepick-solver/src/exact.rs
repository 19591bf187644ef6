//! Exhaustive solver: enumerate every assignment of the free members.

use sidepick_protocol::Label;

use crate::score::{score, Side};
use crate::{Candidate, Trace};

/// Enumerates all `2^free` assignments, skips those splitting the
/// `same_team` bearers, and returns the first assignment reaching the
/// minimum score (ties break toward the lowest mask).
pub(crate) fn solve(
    members: &[Candidate],
    even_labels: &[Label],
    same_team: Option<Label>,
    pre: &[Option<Side>],
    trace: &mut Trace,
) -> Vec<Option<Side>> {
    let free: Vec<usize> = (0..members.len())
        .filter(|&i| pre[i].is_none())
        .collect();
    let holders: Vec<usize> = match same_team {
        Some(label) => (0..members.len())
            .filter(|&i| members[i].labels.contains(&label))
            .collect(),
        None => Vec::new(),
    };

    let mut best: Option<(u32, usize, Vec<Option<Side>>)> = None;
    for mask in 0usize..(1 << free.len()) {
        let mut sides = pre.to_vec();
        for (bit, &index) in free.iter().enumerate() {
            sides[index] = Some(if mask & (1 << bit) == 0 {
                Side::A
            } else {
                Side::B
            });
        }

        if splits_holders(&sides, &holders) {
            continue;
        }

        let candidate = score(&sides, members, even_labels);
        if best.as_ref().is_none_or(|(s, _, _)| candidate < *s) {
            best = Some((candidate, mask, sides));
        }
    }

    match best {
        Some((best_score, mask, sides)) => {
            trace.push(|| format!("best score {best_score} at mask {mask:#b}"));
            sides
        }
        // No mask satisfied the hard constraint. Only reachable if pre and
        // holders were inconsistent, which the caller never produces; keep
        // everyone free on A rather than panicking.
        None => {
            let mut sides = pre.to_vec();
            for &index in &free {
                sides[index] = Some(Side::A);
            }
            sides
        }
    }
}

/// Whether the hard-constraint bearers ended up on both sides.
fn splits_holders(sides: &[Option<Side>], holders: &[usize]) -> bool {
    let mut seen: Option<Side> = None;
    for &index in holders {
        match (seen, sides[index]) {
            (None, side) => seen = side,
            (Some(a), Some(b)) if a != b => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidepick_protocol::Label;

    fn member(labels: &[Label]) -> Candidate {
        Candidate {
            name: String::new(),
            labels: labels.to_vec(),
        }
    }

    fn solve_plain(
        members: &[Candidate],
        even: &[Label],
        same_team: Option<Label>,
    ) -> Vec<Option<Side>> {
        let pre = vec![None; members.len()];
        let mut trace = Trace::new(false);
        solve(members, even, same_team, &pre, &mut trace)
    }

    #[test]
    fn finds_the_global_minimum() {
        // Two gods and two plain members: the only score-zero splits put one
        // god and one plain member on each side.
        let members = vec![
            member(&[Label::God]),
            member(&[Label::God]),
            member(&[]),
            member(&[]),
        ];
        let sides = solve_plain(&members, &[Label::God], None);
        assert_ne!(sides[0], sides[1]);
        assert_ne!(sides[2], sides[3]);
    }

    #[test]
    fn tie_break_prefers_the_lowest_mask() {
        // Two plain members: masks 0b01 and 0b10 both score zero; the lower
        // mask sends member 0 to B.
        let members = vec![member(&[]), member(&[])];
        let sides = solve_plain(&members, &[], None);
        assert_eq!(sides, vec![Some(Side::B), Some(Side::A)]);
    }

    #[test]
    fn respects_pre_assignments() {
        let members = vec![member(&[]), member(&[]), member(&[]), member(&[])];
        let mut pre = vec![None; 4];
        pre[0] = Some(Side::B);
        pre[1] = Some(Side::B);
        let mut trace = Trace::new(false);
        let sides = solve(&members, &[], None, &pre, &mut trace);
        assert_eq!(sides[0], Some(Side::B));
        assert_eq!(sides[1], Some(Side::B));
        // Balance forces the two free members onto A.
        assert_eq!(sides[2], Some(Side::A));
        assert_eq!(sides[3], Some(Side::A));
    }

    #[test]
    fn never_splits_same_team_holders() {
        let members = vec![
            member(&[Label::Boss]),
            member(&[Label::Boss]),
            member(&[Label::Boss]),
            member(&[]),
        ];
        let sides = solve_plain(&members, &[], Some(Label::Boss));
        assert_eq!(sides[0], sides[1]);
        assert_eq!(sides[1], sides[2]);
    }
}
