//! The imbalance score both solver backends minimize.

use sidepick_protocol::Label;

use crate::Candidate;

/// Weight of a per-label count difference for `even`-ruled labels.
const LABEL_WEIGHT: u32 = 5;

/// Weight of the team-size difference.
const SIZE_WEIGHT: u32 = 3;

/// A side of the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    A,
    B,
}

/// Scores a (possibly partial) assignment; unassigned members are ignored,
/// which is what lets the greedy pass score each tentative placement.
pub(crate) fn score(
    sides: &[Option<Side>],
    members: &[Candidate],
    even_labels: &[Label],
) -> u32 {
    let mut size_a = 0u32;
    let mut size_b = 0u32;
    let mut label_imbalance = 0u32;

    for &label in even_labels {
        let mut count_a = 0u32;
        let mut count_b = 0u32;
        for (member, side) in members.iter().zip(sides) {
            if member.labels.contains(&label) {
                match side {
                    Some(Side::A) => count_a += 1,
                    Some(Side::B) => count_b += 1,
                    None => {}
                }
            }
        }
        label_imbalance += count_a.abs_diff(count_b);
    }

    for side in sides {
        match side {
            Some(Side::A) => size_a += 1,
            Some(Side::B) => size_b += 1,
            None => {}
        }
    }

    LABEL_WEIGHT * label_imbalance + SIZE_WEIGHT * size_a.abs_diff(size_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(labels: &[Label]) -> Candidate {
        Candidate {
            name: String::new(),
            labels: labels.to_vec(),
        }
    }

    #[test]
    fn balanced_assignment_scores_zero() {
        let members = vec![member(&[Label::God]), member(&[Label::God])];
        let sides = vec![Some(Side::A), Some(Side::B)];
        assert_eq!(score(&sides, &members, &[Label::God]), 0);
    }

    #[test]
    fn label_imbalance_dominates_size_imbalance() {
        // Both gods on A, one plain member on B: label diff 2, size diff 1.
        let members = vec![
            member(&[Label::God]),
            member(&[Label::God]),
            member(&[]),
        ];
        let sides = vec![Some(Side::A), Some(Side::A), Some(Side::B)];
        assert_eq!(score(&sides, &members, &[Label::God]), 5 * 2 + 3);
    }

    #[test]
    fn unassigned_members_do_not_count() {
        let members = vec![member(&[Label::God]), member(&[Label::God])];
        let sides = vec![Some(Side::A), None];
        assert_eq!(score(&sides, &members, &[Label::God]), 5 + 3);
    }

    #[test]
    fn labels_without_even_rule_are_ignored() {
        let members = vec![member(&[Label::Boss]), member(&[])];
        let sides = vec![Some(Side::A), Some(Side::B)];
        assert_eq!(score(&sides, &members, &[]), 0);
    }
}
