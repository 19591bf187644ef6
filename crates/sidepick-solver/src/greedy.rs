//! Greedy placement with 2-opt refinement, for inputs too large to
//! enumerate.

use rand::Rng;
use sidepick_protocol::Label;

use crate::score::{score, Side};
use crate::{Candidate, Trace};

/// Hard cap on 2-opt sweeps; bounds the refinement at O(n³) comparisons.
const MAX_SWEEPS: usize = 100;

/// Greedy fallback:
///
/// 1. pre-assigned members stay put;
/// 2. all `same_team` bearers go to the side one of them already occupies
///    (or a random side), and become non-swappable;
/// 3. remaining members, most constrained first (by count of `even`-ruled
///    labels), each join whichever side scores lower;
/// 4. 2-opt sweeps swap one swappable (A, B) pair at a time while doing so
///    strictly reduces the score.
///
/// The hard constraint cannot be violated by step 4 because every bearer is
/// fixed in step 2.
pub(crate) fn solve<R: Rng>(
    members: &[Candidate],
    even_labels: &[Label],
    same_team: Option<Label>,
    pre: &[Option<Side>],
    rng: &mut R,
    trace: &mut Trace,
) -> Vec<Option<Side>> {
    let mut sides = pre.to_vec();
    let mut fixed: Vec<bool> = pre.iter().map(|side| side.is_some()).collect();

    if let Some(label) = same_team {
        let holders: Vec<usize> = (0..members.len())
            .filter(|&i| members[i].labels.contains(&label))
            .collect();
        if !holders.is_empty() {
            let target = holders
                .iter()
                .find_map(|&i| sides[i])
                .unwrap_or_else(|| if rng.random::<bool>() { Side::A } else { Side::B });
            for &index in &holders {
                sides[index] = Some(target);
                fixed[index] = true;
            }
            trace.push(|| {
                format!("fixed {} {label:?} holders onto {target:?}", holders.len())
            });
        }
    }

    let mut remaining: Vec<usize> = (0..members.len())
        .filter(|&i| sides[i].is_none())
        .collect();
    remaining.sort_by_key(|&i| std::cmp::Reverse(even_label_count(&members[i], even_labels)));

    for &index in &remaining {
        sides[index] = Some(Side::A);
        let score_a = score(&sides, members, even_labels);
        sides[index] = Some(Side::B);
        let score_b = score(&sides, members, even_labels);
        sides[index] = Some(if score_a <= score_b { Side::A } else { Side::B });
    }
    trace.push(|| {
        format!(
            "greedy score {}",
            score(&sides, members, even_labels)
        )
    });

    two_opt(members, even_labels, &mut sides, &fixed, trace);
    sides
}

/// Repeated first-improvement pair swaps between the teams.
fn two_opt(
    members: &[Candidate],
    even_labels: &[Label],
    sides: &mut [Option<Side>],
    fixed: &[bool],
    trace: &mut Trace,
) {
    let mut sweeps = 0;
    'sweep: while sweeps < MAX_SWEEPS {
        sweeps += 1;
        let current = score(sides, members, even_labels);

        let team_a: Vec<usize> = swappable(sides, fixed, Side::A);
        let team_b: Vec<usize> = swappable(sides, fixed, Side::B);

        for &a in &team_a {
            for &b in &team_b {
                sides[a] = Some(Side::B);
                sides[b] = Some(Side::A);
                if score(sides, members, even_labels) < current {
                    continue 'sweep;
                }
                sides[a] = Some(Side::A);
                sides[b] = Some(Side::B);
            }
        }
        break;
    }
    trace.push(|| {
        format!(
            "2-opt done after {sweeps} sweeps, score {}",
            score(sides, members, even_labels)
        )
    });
}

fn swappable(sides: &[Option<Side>], fixed: &[bool], side: Side) -> Vec<usize> {
    (0..sides.len())
        .filter(|&i| !fixed[i] && sides[i] == Some(side))
        .collect()
}

fn even_label_count(member: &Candidate, even_labels: &[Label]) -> usize {
    member
        .labels
        .iter()
        .filter(|label| even_labels.contains(label))
        .count()
}
