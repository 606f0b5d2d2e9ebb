// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use crate::dense::Dense1D;
use crate::sparse::Sparse1D;
use repart_types::{Error, Index, Range, Result};

/// The memory layout abstraction: a tagged variant dispatched through a
/// method table rather than a trait object, since the capability set
/// (`section`, `offset`, `reuse`, `describe`, `pack`, `unpack`, `copy`) is
/// small, fixed, and every variant needs every method.
#[derive(Debug, Clone)]
pub enum Layout {
    Dense1D(Dense1D),
    Sparse1D(Sparse1D),
}

impl Layout {
    pub fn dims(&self) -> usize {
        1
    }

    pub fn map_count(&self) -> usize {
        match self {
            Layout::Dense1D(d) => d.map_count(),
            Layout::Sparse1D(s) => s.map_count(),
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Layout::Dense1D(d) => d.count(),
            Layout::Sparse1D(s) => s.count(),
        }
    }

    pub fn section(&self, idx: &Index) -> Result<usize> {
        match self {
            Layout::Dense1D(d) => d.section(idx.i0()),
            Layout::Sparse1D(s) => Ok(s.section(idx.i0())),
        }
    }

    /// Offset for mapping `map_no` at `idx`. Mutates sparse layouts'
    /// external cursor as a side effect, per the offset rule.
    pub fn offset(&mut self, map_no: usize, idx: &Index) -> Result<u64> {
        let off = match self {
            Layout::Dense1D(d) => d.offset(map_no, idx.i0())?,
            Layout::Sparse1D(s) => {
                if map_no != 0 {
                    return Err(Error::invalid_argument("sparse layout has a single mapping"));
                }
                s.offset(idx.i0())?
            }
        };
        if off >= self.count() {
            return Err(Error::out_of_range(format!(
                "offset {off} outside layout capacity {}",
                self.count()
            )));
        }
        Ok(off)
    }

    pub fn reset_external_cursor(&mut self) {
        if let Layout::Sparse1D(s) = self {
            s.reset_external_cursor();
        }
    }

    /// `true` iff `self` can reuse `old`'s buffer. Reuse across layout
    /// *variants* is never allowed.
    pub fn reuse(&mut self, old: &Layout) -> bool {
        match (self, old) {
            (Layout::Dense1D(new), Layout::Dense1D(old)) => new.reuse(old),
            (Layout::Sparse1D(new), Layout::Sparse1D(old)) => new.reuse(old),
            _ => false,
        }
    }

    /// Adopts `old`'s interval map even though `reuse` returned false,
    /// because the only reason it failed was an external/non-external
    /// switch with matching `local_length`. Only meaningful for sparse
    /// layouts; a no-op otherwise.
    pub fn adopt_interval_map_from(&mut self, old: &Layout) {
        if let (Layout::Sparse1D(new), Layout::Sparse1D(old)) = (self, old) {
            new.adopt_interval_map(old);
        }
    }

    /// `true` iff both layouts are sparse and report the same
    /// `local_length` — the signal that a failed `reuse` was rejected only
    /// for an external/non-external capacity mismatch, not a genuine
    /// change in locally-owned indices, and the old interval map should
    /// still be adopted even though the buffer is not.
    pub fn same_local_length(&self, old: &Layout) -> bool {
        match (self, old) {
            (Layout::Sparse1D(new), Layout::Sparse1D(old)) => new.local_length() == old.local_length(),
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Layout::Dense1D(d) => d.describe(),
            Layout::Sparse1D(s) => s.describe(),
        }
    }

    /// Walks `range` in lexicographic (here: ascending `i0`) order
    /// starting at `*start_idx`, copying `elem_size`-byte elements from
    /// `src` (addressed via `self`'s offsets) into `buf`, stopping when
    /// `buf` is full or the range is exhausted. Returns the element count
    /// packed and advances `*start_idx` in place.
    pub fn pack(
        &mut self,
        elem_size: usize,
        range: &Range,
        start_idx: &mut Index,
        src: &[u8],
        buf: &mut [u8],
    ) -> Result<usize> {
        require_1d(range)?;
        let cap = buf.len() / elem_size;
        let mut n = 0usize;
        let mut i0 = start_idx.i0();
        while i0 < range.to.i0() && n < cap {
            let idx = Index::new_1d(i0);
            let off = self.offset(0, &idx)? as usize;
            let src_off = off * elem_size;
            buf[n * elem_size..(n + 1) * elem_size]
                .copy_from_slice(&src[src_off..src_off + elem_size]);
            n += 1;
            i0 += 1;
        }
        *start_idx = Index::new_1d(i0);
        Ok(n)
    }

    /// Mirror of [`Layout::pack`]: copies `elem_size`-byte elements out of
    /// `buf` into `dst` at the offsets `self` assigns each walked index.
    pub fn unpack(
        &mut self,
        elem_size: usize,
        range: &Range,
        start_idx: &mut Index,
        buf: &[u8],
        dst: &mut [u8],
    ) -> Result<usize> {
        require_1d(range)?;
        let cap = buf.len() / elem_size;
        let mut n = 0usize;
        let mut i0 = start_idx.i0();
        while i0 < range.to.i0() && n < cap {
            let idx = Index::new_1d(i0);
            let off = self.offset(0, &idx)? as usize;
            let dst_off = off * elem_size;
            dst[dst_off..dst_off + elem_size]
                .copy_from_slice(&buf[n * elem_size..(n + 1) * elem_size]);
            n += 1;
            i0 += 1;
        }
        *start_idx = Index::new_1d(i0);
        Ok(n)
    }

    /// Copies every index in `range` from `(from, from_buf)` to
    /// `(to, to_buf)`, element-wise, routed through each layout's own
    /// `offset`. The two layouts may be different variants (e.g. local
    /// in-place copy from an old dense layout into a new sparse one);
    /// what matters is that both are 1-D vector layouts over the same
    /// space, which `range` already pins down.
    pub fn copy(
        elem_size: usize,
        range: &Range,
        from: &mut Layout,
        from_buf: &[u8],
        to: &mut Layout,
        to_buf: &mut [u8],
    ) -> Result<()> {
        require_1d(range)?;
        let mut i0 = range.from.i0();
        while i0 < range.to.i0() {
            let idx = Index::new_1d(i0);
            let src_off = from.offset(0, &idx)? as usize * elem_size;
            let dst_off = to.offset(0, &idx)? as usize * elem_size;
            to_buf[dst_off..dst_off + elem_size]
                .copy_from_slice(&from_buf[src_off..src_off + elem_size]);
            i0 += 1;
        }
        Ok(())
    }
}

fn require_1d(range: &Range) -> Result<()> {
    if range.space.dims() != 1 {
        return Err(Error::invalid_argument(
            "dense/sparse 1-D layouts only support 1-D spaces",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use repart_types::Space;

    fn one_d(n: u64) -> Space {
        Space::new_1d(n).unwrap()
    }

    #[test]
    fn pack_then_unpack_round_trips_on_disjoint_buffers() {
        let space = one_d(8);
        let range = Range::new(space, Index::new_1d(0), Index::new_1d(8)).unwrap();
        let mut src = Layout::Dense1D(Dense1D::new(8));
        let mut dst = Layout::Dense1D(Dense1D::new(8));

        let src_buf: Vec<u8> = (0u8..8).collect();
        let mut wire = vec![0u8; 8];
        let mut start = range.from;
        let n = src.pack(1, &range, &mut start, &src_buf, &mut wire).unwrap();
        assert_eq!(n, 8);

        let mut dst_buf = vec![0u8; 8];
        let mut start2 = range.from;
        dst.unpack(1, &range, &mut start2, &wire, &mut dst_buf).unwrap();
        assert_eq!(dst_buf, src_buf);
    }

    #[test]
    fn reuse_never_crosses_variants() {
        let mut new_dense = Layout::Dense1D(Dense1D::new(10));
        let old_sparse = Layout::Sparse1D(Sparse1D::calculate_mapping(&[(0, 10)], 0).unwrap());
        assert!(!new_dense.reuse(&old_sparse));
    }

    #[test]
    fn failed_reuse_with_matching_local_length_still_adopts_interval_map() {
        // Same owned interval, but the new binding wants more external
        // slots than the old allocation has room for: `reuse` fails
        // (allocated_range_count grew) even though `local_length` matches.
        let old = Layout::Sparse1D(Sparse1D::calculate_mapping(&[(0, 4), (6, 8)], 1).unwrap());
        let mut candidate = Layout::Sparse1D(Sparse1D::calculate_mapping(&[(0, 6)], 3).unwrap());

        assert!(candidate.same_local_length(&old));
        assert!(!candidate.reuse(&old));

        candidate.adopt_interval_map_from(&old);
        if let Layout::Sparse1D(s) = &candidate {
            assert_eq!(s.intervals().len(), 2);
            assert_eq!(s.lower_bound(), 0);
            assert_eq!(s.upper_bound(), 8);
        } else {
            panic!("expected Sparse1D");
        }
    }
}
