// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use crate::index::Index;
use crate::space::Space;

/// A half-open, axis-aligned sub-box of a [`Space`]. `to` is exclusive on
/// every dimension.
#[derive(Debug, Clone)]
pub struct Range {
    pub space: Space,
    pub from: Index,
    pub to: Index,
}

impl Range {
    /// Constructs a range, checking `from[d] <= to[d] <= space.size[d]`.
    pub fn new(space: Space, from: Index, to: Index) -> Result<Self> {
        let dims = space.dims();
        for d in 0..dims {
            let (f, t, s) = (from.get(d), to.get(d), space.size(d) as i64);
            if f < 0 || t < f || t > s {
                return Err(Error::invalid_argument(format!(
                    "range invalid on dim {d}: from={f} to={t} space_size={s}"
                )));
            }
        }
        Ok(Range { space, from, to })
    }

    /// `∏ (to[d] - from[d])` over live dimensions.
    pub fn size(&self) -> u64 {
        let dims = self.space.dims();
        (0..dims)
            .map(|d| (self.to.get(d) - self.from.get(d)) as u64)
            .product()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// `self ⊇ other` — every index `other` can address lies within `self`.
    pub fn contains(&self, other: &Range) -> bool {
        if !self.space.same_space(&other.space) {
            return false;
        }
        let dims = self.space.dims();
        (0..dims).all(|d| self.from.get(d) <= other.from.get(d) && other.to.get(d) <= self.to.get(d))
    }

    pub fn contains_index(&self, idx: &Index) -> bool {
        let dims = self.space.dims();
        (0..dims).all(|d| self.from.get(d) <= idx.get(d) && idx.get(d) < self.to.get(d))
    }

    /// Axis-aligned intersection; `None` if disjoint on any dimension.
    pub fn intersect(&self, other: &Range) -> Option<Range> {
        if !self.space.same_space(&other.space) {
            return None;
        }
        let dims = self.space.dims();
        let mut from = *self.from.coords();
        let mut to = *self.to.coords();
        for d in 0..dims {
            from[d] = from[d].max(other.from.get(d));
            to[d] = to[d].min(other.to.get(d));
            if from[d] >= to[d] {
                return None;
            }
        }
        let from_idx = match dims {
            1 => Index::new_1d(from[0]),
            2 => Index::new_2d(from[0], from[1]),
            _ => Index::new_3d(from[0], from[1], from[2]),
        };
        let to_idx = match dims {
            1 => Index::new_1d(to[0]),
            2 => Index::new_2d(to[0], to[1]),
            _ => Index::new_3d(to[0], to[1], to[2]),
        };
        Some(Range {
            space: self.space.clone(),
            from: from_idx,
            to: to_idx,
        })
    }

    /// Difference `self \ other` restricted to the `pdim`-th axis only,
    /// valid when `self` and `other` agree on every other axis (the only
    /// shape the transfer planner and the `block` partitioner ever need).
    pub fn sub_1d(&self, other: &Range, pdim: usize) -> Vec<Range> {
        let mut out = Vec::new();
        let (s_from, s_to) = (self.from.get(pdim), self.to.get(pdim));
        let (o_from, o_to) = (other.from.get(pdim), other.to.get(pdim));
        let lo = o_from.max(s_from);
        let hi = o_to.min(s_to);
        if lo > s_from {
            out.push(self.with_1d_bounds(pdim, s_from, lo.min(s_to)));
        }
        if hi < s_to {
            out.push(self.with_1d_bounds(pdim, hi.max(s_from), s_to));
        }
        out
    }

    fn with_1d_bounds(&self, pdim: usize, from_v: i64, to_v: i64) -> Range {
        let mut from = *self.from.coords();
        let mut to = *self.to.coords();
        from[pdim] = from_v;
        to[pdim] = to_v;
        let dims = self.space.dims();
        let from_idx = match dims {
            1 => Index::new_1d(from[0]),
            2 => Index::new_2d(from[0], from[1]),
            _ => Index::new_3d(from[0], from[1], from[2]),
        };
        let to_idx = match dims {
            1 => Index::new_1d(to[0]),
            2 => Index::new_2d(to[0], to[1]),
            _ => Index::new_3d(to[0], to[1], to[2]),
        };
        Range {
            space: self.space.clone(),
            from: from_idx,
            to: to_idx,
        }
    }
}

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        self.space.same_space(&other.space) && self.from == other.from && self.to == other.to
    }
}
