// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use repart_types::{Error, Result};

/// A single coalesced, locally-owned interval `[from, to)` in the global
/// 1-D index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub from: i64,
    pub to: i64,
}

impl Interval {
    pub fn len(&self) -> u64 {
        (self.to - self.from) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.to == self.from
    }
}

/// A 1-D layout over a disjoint union of locally-owned intervals plus a
/// fixed-size block of appended external slots.
///
/// ```text
/// [ I0 ][ I1 ]...[ I_{m-1} ][ ext_0 ext_1 ... ext_{E-1} ]
/// ```
///
/// The external cursor is per-instance state, not a shared static — every
/// transition that will consume external values resets it explicitly via
/// [`Sparse1D::reset_external_cursor`].
#[derive(Debug, Clone)]
pub struct Sparse1D {
    local_length: u64,
    external_count: u64,
    external_cursor: u64,
    intervals: Vec<Interval>,
    lower_bound: i64,
    upper_bound: i64,
    allocated_range_count: u64,
    /// Total slots this mapping claims. Equal to `local_length +
    /// external_count` for an ordinary binding; an "external view" binding
    /// (the `copy` partitioner's target) sets this to the full extent of
    /// the space it spans, while still only being able to address the
    /// intervals inherited from the local layout it is a view over.
    count: u64,
}

impl Sparse1D {
    /// Builds the interval map from a worker's sorted, non-overlapping
    /// `(from, to)` slices (the caller's border-array entries for
    /// `my_id`), coalescing neighbours (`prev.to == cur.from`).
    pub fn calculate_mapping(sorted_ranges: &[(i64, i64)], external_count: u64) -> Result<Self> {
        if sorted_ranges.is_empty() {
            return Ok(Sparse1D {
                local_length: 0,
                external_count,
                external_cursor: 0,
                intervals: Vec::new(),
                lower_bound: 0,
                upper_bound: 0,
                allocated_range_count: external_count,
                count: external_count,
            });
        }
        let mut intervals = Vec::new();
        let (mut cur_from, mut cur_to) = sorted_ranges[0];
        if cur_to < cur_from {
            return Err(Error::invalid_argument("slice with to < from"));
        }
        for &(from, to) in &sorted_ranges[1..] {
            if to < from {
                return Err(Error::invalid_argument("slice with to < from"));
            }
            if cur_to == from {
                cur_to = to;
            } else {
                intervals.push(Interval {
                    from: cur_from,
                    to: cur_to,
                });
                cur_from = from;
                cur_to = to;
            }
        }
        intervals.push(Interval {
            from: cur_from,
            to: cur_to,
        });

        let local_length: u64 = intervals.iter().map(Interval::len).sum();
        let lower_bound = intervals[0].from;
        let upper_bound = intervals[intervals.len() - 1].to;
        let allocated_range_count = local_length + external_count;
        Ok(Sparse1D {
            local_length,
            external_count,
            external_cursor: 0,
            intervals,
            lower_bound,
            upper_bound,
            allocated_range_count,
            count: local_length + external_count,
        })
    }

    /// Declares this mapping an "external view" spanning `count` slots
    /// (e.g. the full space along the `copy` partitioner's target
    /// dimension) while still only being able to address the intervals it
    /// is a view over. Call [`Sparse1D::adopt_interval_map`] afterwards.
    pub fn as_external_view(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn is_external_view(&self) -> bool {
        self.count != self.local_length + self.external_count
    }

    pub fn local_length(&self) -> u64 {
        self.local_length
    }

    pub fn external_count(&self) -> u64 {
        self.external_count
    }

    pub fn allocated_range_count(&self) -> u64 {
        self.allocated_range_count
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn map_count(&self) -> usize {
        1
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn lower_bound(&self) -> i64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> i64 {
        self.upper_bound
    }

    /// Resets the per-transition external-value cursor. Must be called
    /// once before the unpack walk that will populate external slots for
    /// a given transition begins.
    pub fn reset_external_cursor(&mut self) {
        self.external_cursor = 0;
    }

    pub fn section(&self, _g: i64) -> usize {
        0
    }

    /// Walks the interval list to classify `g`, advancing the external
    /// cursor when `g` turns out to be an external value. See the offset
    /// rule in the layout design for the three cases this implements.
    pub fn offset(&mut self, g: i64) -> Result<u64> {
        let mut prefix = 0u64;
        for iv in &self.intervals {
            if g >= iv.from && g < iv.to {
                return Ok(prefix + (g - iv.from) as u64);
            }
            if g < iv.from {
                return self.next_external(g);
            }
            prefix += iv.len();
        }
        self.next_external(g)
    }

    fn next_external(&mut self, g: i64) -> Result<u64> {
        if self.external_count == 0 {
            return Err(Error::out_of_range(format!(
                "index {g} not locally owned and no external slots remain"
            )));
        }
        let slot = self.local_length + self.external_cursor;
        self.external_cursor += 1;
        if self.external_cursor >= self.external_count {
            self.external_cursor = 0;
        }
        Ok(slot)
    }

    /// `new.allocated_range_count <= old.allocated_range_count` and
    /// `new.local_length == old.local_length`. On success, an external
    /// view inherits the old interval map outright instead of recomputing
    /// it.
    pub fn reuse(&mut self, old: &Sparse1D) -> bool {
        let ok = self.allocated_range_count <= old.allocated_range_count
            && self.local_length == old.local_length;
        if ok && self.is_external_view() {
            self.adopt_interval_map(old);
        }
        ok
    }

    /// Adopts `old`'s interval map wholesale. Used both by a successful
    /// external-view reuse and, by the transition engine, when a reuse
    /// attempt fails for no reason other than an external/non-external
    /// switch with matching `local_length`.
    pub fn adopt_interval_map(&mut self, old: &Sparse1D) {
        self.intervals = old.intervals.clone();
        self.lower_bound = old.lower_bound;
        self.upper_bound = old.upper_bound;
        self.local_length = old.local_length;
    }

    pub fn describe(&self) -> String {
        format!(
            "Sparse1D(local_length={}, external_count={}, intervals={}, count={})",
            self.local_length,
            self.external_count,
            self.intervals.len(),
            self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_neighbouring_slices() {
        let s = Sparse1D::calculate_mapping(&[(0, 2), (2, 4), (5, 7)], 2).unwrap();
        assert_eq!(s.intervals().len(), 2);
        assert_eq!(s.intervals()[0], Interval { from: 0, to: 4 });
        assert_eq!(s.intervals()[1], Interval { from: 5, to: 7 });
        assert_eq!(s.local_length(), 6);
        assert_eq!(s.lower_bound(), 0);
        assert_eq!(s.upper_bound(), 7);
    }

    #[test]
    fn offset_local_and_external_with_wraparound() {
        let mut s = Sparse1D::calculate_mapping(&[(0, 2), (2, 4), (5, 7)], 2).unwrap();
        assert_eq!(s.offset(3).unwrap(), 3);
        assert_eq!(s.offset(6).unwrap(), 5);

        // Two external queries consume ext_0 then ext_1, a third wraps.
        assert_eq!(s.offset(4).unwrap(), 6);
        assert_eq!(s.offset(4).unwrap(), 7);
        assert_eq!(s.offset(4).unwrap(), 6);
    }

    #[test]
    fn offset_without_external_slots_is_out_of_range() {
        let mut s = Sparse1D::calculate_mapping(&[(0, 2)], 0).unwrap();
        assert!(s.offset(10).is_err());
    }

    #[test]
    fn reuse_requires_matching_local_length_and_smaller_allocation() {
        let old = Sparse1D::calculate_mapping(&[(0, 10)], 4).unwrap();
        let mut smaller_ext = Sparse1D::calculate_mapping(&[(0, 10)], 2).unwrap();
        assert!(smaller_ext.reuse(&old));

        let mut different_length = Sparse1D::calculate_mapping(&[(0, 9)], 4).unwrap();
        assert!(!different_length.reuse(&old));
    }
}
