// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use repart_types::{Error, Result};

/// A contiguous buffer of `count` uniformly-sized elements.
///
/// `map_count` is always 1: a dense layout addresses exactly one
/// contiguous block, so there is only one mapping-no to classify into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dense1D {
    count: u64,
}

impl Dense1D {
    pub fn new(count: u64) -> Self {
        Dense1D { count }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn map_count(&self) -> usize {
        1
    }

    /// Classifies `i0` into mapping 0, or errors. The upper bound is
    /// deliberately not checked here — callers validate against the
    /// mapping's `required_range` instead.
    pub fn section(&self, i0: i64) -> Result<usize> {
        if i0 >= 0 {
            Ok(0)
        } else {
            Err(Error::out_of_range(format!("negative index {i0}")))
        }
    }

    pub fn offset(&self, map_no: usize, i0: i64) -> Result<u64> {
        if map_no != 0 {
            return Err(Error::invalid_argument("dense layout has a single mapping"));
        }
        self.section(i0)?;
        Ok(i0 as u64)
    }

    /// `new.count <= old.count` — on success the caller keeps reading
    /// `old.count` elements worth of buffer rather than reallocating.
    pub fn reuse(&mut self, old: &Dense1D) -> bool {
        if self.count <= old.count {
            self.count = old.count;
            true
        } else {
            false
        }
    }

    pub fn describe(&self) -> String {
        format!("Dense1D(count={})", self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_grows_buffer_only_when_shrinking_or_equal() {
        let old = Dense1D::new(1000);
        let mut smaller = Dense1D::new(400);
        assert!(smaller.reuse(&old));
        assert_eq!(smaller.count(), 1000);

        let mut bigger = Dense1D::new(1000);
        assert!(bigger.reuse(&old));

        let old2 = Dense1D::new(400);
        let mut too_big = Dense1D::new(1000);
        assert!(!too_big.reuse(&old2));
    }

    #[test]
    fn offset_is_identity_on_i0() {
        let d = Dense1D::new(100);
        assert_eq!(d.offset(0, 42).unwrap(), 42);
        assert!(d.offset(0, -1).is_err());
    }
}
