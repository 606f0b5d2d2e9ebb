// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Maximum number of dimensions an index space can have.
pub const MAX_DIMS: usize = 3;

/// A point in a 1-, 2-, or 3-D index space. Unused dimensions are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    coords: [i64; MAX_DIMS],
}

impl Index {
    pub fn new_1d(i0: i64) -> Self {
        Index { coords: [i0, 0, 0] }
    }

    pub fn new_2d(i0: i64, i1: i64) -> Self {
        Index { coords: [i0, i1, 0] }
    }

    pub fn new_3d(i0: i64, i1: i64, i2: i64) -> Self {
        Index { coords: [i0, i1, i2] }
    }

    #[inline]
    pub fn get(&self, dim: usize) -> i64 {
        self.coords[dim]
    }

    #[inline]
    pub fn i0(&self) -> i64 {
        self.coords[0]
    }

    pub fn coords(&self) -> &[i64; MAX_DIMS] {
        &self.coords
    }

    /// True iff `self == other` up to `dims` leading coordinates.
    pub fn equal(&self, other: &Index, dims: usize) -> bool {
        self.coords[..dims] == other.coords[..dims]
    }

    /// Lexicographic successor of `self` within the half-open box
    /// `[from, to)`. Returns `None` if `self` is the last index in the box
    /// (i.e. there is no successor).
    ///
    /// Only defined for 1-D boxes; higher dimensional walks are driven by
    /// the caller via nested loops instead.
    pub fn next_in_1d(&self, to: &Index) -> Option<Index> {
        let next = self.coords[0] + 1;
        if next < to.coords[0] {
            Some(Index::new_1d(next))
        } else {
            None
        }
    }
}

impl PartialOrd for Index {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Index {
    /// Lexicographic order over coordinates, matching the border array's
    /// `(task, mapping-no, range.from lexicographic)` sort key.
    fn cmp(&self, other: &Self) -> Ordering {
        self.coords.cmp(&other.coords)
    }
}
