// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

//! Diffs a source and a target border array for one worker into a
//! [`TransferPlan`]: ranges that stay local (copied in place), ranges to
//! receive from other workers, and ranges to send to them.

use repart_partition::BorderArray;
use repart_types::Range;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RecvOp {
    pub from: usize,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct SendOp {
    pub to: usize,
    pub range: Range,
}

/// What worker `me` must do to move its container from `src` to `dst`.
/// `local_copies` are same-worker, layout-to-layout copies; `recvs`/`sends`
/// cross a [`crate::Backend`] boundary.
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    pub local_copies: Vec<Range>,
    pub recvs: Vec<RecvOp>,
    pub sends: Vec<SendOp>,
}

const PDIM: usize = 0;

/// Builds `me`'s piece of the global plan. Every worker computes this
/// independently from the same two border arrays — by the partitioning
/// model's determinism, every worker derives the identical plan for its
/// own id without any coordination round.
pub fn plan(src: &BorderArray, dst: &BorderArray, me: usize) -> TransferPlan {
    let my_src: Vec<Range> = src.iter_for_task(me).map(|s| s.range.clone()).collect();
    let my_dst: Vec<Range> = dst.iter_for_task(me).map(|s| s.range.clone()).collect();

    let mut local_copies = Vec::new();
    for s in &my_src {
        for d in &my_dst {
            if let Some(ix) = s.intersect(d) {
                local_copies.push(ix);
            }
        }
    }

    let mut recvs = Vec::new();
    for d in &my_dst {
        for gap in subtract_all(d, &my_src) {
            let owners: Vec<(usize, Range)> = src
                .all()
                .iter()
                .filter(|s| s.task != me)
                .filter_map(|s| gap.intersect(&s.range).map(|ix| (s.task, ix)))
                .collect();
            for (winner, range) in lowest_task_wins(owners) {
                recvs.push(RecvOp { from: winner, range });
            }
        }
    }

    let mut sends = Vec::new();
    for s in &my_src {
        for gap in subtract_all(s, &my_dst) {
            // Group the destination-owned pieces of `gap` by destination
            // task, then for each piece find every source owner (any task,
            // `me` included) and only keep the sub-piece where `me` is the
            // lowest-id winner — the dual of the `recvs` tie-break, so the
            // two sides agree on who is responsible for a duplicated range.
            for dst_slice in dst.all() {
                if dst_slice.task == me {
                    continue;
                }
                if let Some(needed) = gap.intersect(&dst_slice.range) {
                    let candidates: Vec<(usize, Range)> = src
                        .all()
                        .iter()
                        .filter_map(|s2| needed.intersect(&s2.range).map(|ix| (s2.task, ix)))
                        .collect();
                    let i_am_a_candidate = candidates.iter().any(|(t, _)| *t == me);
                    let resolved = lowest_task_wins(candidates);
                    let i_won_any = resolved.iter().any(|(winner, _)| *winner == me);
                    if i_am_a_candidate && !i_won_any {
                        warn!(
                            to = dst_slice.task,
                            "dropping send for overlapping target range: a lower-task-id owner wins the tie-break"
                        );
                    }
                    for (winner, range) in resolved {
                        if winner == me {
                            sends.push(SendOp {
                                to: dst_slice.task,
                                range,
                            });
                        }
                    }
                }
            }
        }
    }

    TransferPlan {
        local_copies,
        recvs,
        sends,
    }
}

/// `range` minus the union of `others`, restricted to [`PDIM`].
fn subtract_all(range: &Range, others: &[Range]) -> Vec<Range> {
    let mut remaining = vec![range.clone()];
    for other in others {
        remaining = remaining
            .iter()
            .flat_map(|r| r.sub_1d(other, PDIM))
            .collect();
    }
    remaining
}

/// Sweeps a set of `(task, range)` candidates that may overlap on
/// [`PDIM`] and, for every point covered by more than one candidate, keeps
/// only the lowest task id — the tie-break the planner uses whenever a
/// non-disjoint partitioning lets two tasks both claim the same range.
/// Adjacent sub-ranges won by the same task are merged back together.
fn lowest_task_wins(candidates: Vec<(usize, Range)>) -> Vec<(usize, Range)> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let space = candidates[0].1.space.clone();
    let mut points: Vec<i64> = candidates
        .iter()
        .flat_map(|(_, r)| [r.from.get(PDIM), r.to.get(PDIM)])
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut result = Vec::new();
    let mut run: Option<(usize, i64, i64)> = None;
    for w in points.windows(2) {
        let (lo, hi) = (w[0], w[1]);
        if lo >= hi {
            continue;
        }
        let winner = candidates
            .iter()
            .filter(|(_, r)| r.from.get(PDIM) <= lo && hi <= r.to.get(PDIM))
            .map(|(t, _)| *t)
            .min();
        match (winner, &mut run) {
            (Some(t), Some((rt, _, rto))) if *rt == t && *rto == lo => {
                *rto = hi;
            }
            (Some(t), _) => {
                if let Some((rt, rfrom, rto)) = run.take() {
                    result.push((rt, make_range_1d(&space, rfrom, rto)));
                }
                run = Some((t, lo, hi));
            }
            (None, _) => {
                if let Some((rt, rfrom, rto)) = run.take() {
                    result.push((rt, make_range_1d(&space, rfrom, rto)));
                }
            }
        }
    }
    if let Some((rt, rfrom, rto)) = run.take() {
        result.push((rt, make_range_1d(&space, rfrom, rto)));
    }
    result
}

fn make_range_1d(space: &repart_types::Space, from: i64, to: i64) -> Range {
    Range::new(space.clone(), repart_types::Index::new_1d(from), repart_types::Index::new_1d(to))
        .expect("sub-range derived from two in-bounds ranges is always in-bounds")
}

#[cfg(test)]
mod tests {
    use super::*;
    use repart_partition::BorderArrayBuilder;
    use repart_types::{Index, Space};

    fn r(space: &Space, a: i64, b: i64) -> Range {
        Range::new(space.clone(), Index::new_1d(a), Index::new_1d(b)).unwrap()
    }

    #[test]
    fn identity_transition_is_all_local_copy_no_traffic() {
        let space = Space::new_1d(10).unwrap();
        let mut b = BorderArrayBuilder::new();
        b.push(0, r(&space, 0, 5), 0);
        b.push(1, r(&space, 5, 10), 0);
        let border = b.freeze();

        let p = plan(&border, &border, 0);
        assert_eq!(p.local_copies.len(), 1);
        assert!(p.recvs.is_empty());
        assert!(p.sends.is_empty());
    }

    #[test]
    fn growing_a_task_slice_receives_from_the_shrinking_neighbour() {
        let space = Space::new_1d(10).unwrap();
        let mut src_b = BorderArrayBuilder::new();
        src_b.push(0, r(&space, 0, 5), 0);
        src_b.push(1, r(&space, 5, 10), 0);
        let src = src_b.freeze();

        let mut dst_b = BorderArrayBuilder::new();
        dst_b.push(0, r(&space, 0, 7), 0);
        dst_b.push(1, r(&space, 7, 10), 0);
        let dst = dst_b.freeze();

        let plan0 = plan(&src, &dst, 0);
        assert_eq!(plan0.local_copies.len(), 1);
        assert_eq!(plan0.recvs.len(), 1);
        assert_eq!(plan0.recvs[0].from, 1);
        assert_eq!((plan0.recvs[0].range.from.i0(), plan0.recvs[0].range.to.i0()), (5, 7));
        assert!(plan0.sends.is_empty());

        let plan1 = plan(&src, &dst, 1);
        assert_eq!(plan1.sends.len(), 1);
        assert_eq!(plan1.sends[0].to, 0);
        assert_eq!((plan1.sends[0].range.from.i0(), plan1.sends[0].range.to.i0()), (5, 7));
        assert!(plan1.recvs.is_empty());
    }

    #[test]
    fn duplicated_target_range_recvs_only_from_the_lowest_id_owner() {
        let space = Space::new_1d(10).unwrap();
        let mut src_b = BorderArrayBuilder::new();
        src_b.push(1, r(&space, 0, 10), 0);
        src_b.push(2, r(&space, 0, 10), 0);
        let src = src_b.freeze();

        let mut dst_b = BorderArrayBuilder::new();
        dst_b.push(0, r(&space, 0, 10), 0);
        let dst = dst_b.freeze();

        let plan0 = plan(&src, &dst, 0);
        assert_eq!(plan0.recvs.len(), 1);
        assert_eq!(plan0.recvs[0].from, 1);

        let plan2 = plan(&src, &dst, 2);
        assert!(plan2.sends.is_empty(), "task 2 defers to task 1's send");

        let plan1 = plan(&src, &dst, 1);
        assert_eq!(plan1.sends.len(), 1);
        assert_eq!(plan1.sends[0].to, 0);
    }
}
