// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use crate::index::MAX_DIMS;
use std::sync::Arc;

#[derive(Debug)]
struct SpaceInner {
    dims: usize,
    size: [u64; MAX_DIMS],
}

/// An immutable 1-, 2-, or 3-D index space.
///
/// Spaces are cheap to clone (an `Arc` bump) and are shared by every
/// partitioning and container built over them. Identity, not value,
/// is what callers usually care about (e.g. "is this the same space the
/// base partitioning was built on"), so equality is reference equality.
#[derive(Debug, Clone)]
pub struct Space {
    inner: Arc<SpaceInner>,
}

impl Space {
    pub fn new_1d(size0: u64) -> Result<Self> {
        Self::new(&[size0])
    }

    pub fn new_2d(size0: u64, size1: u64) -> Result<Self> {
        Self::new(&[size0, size1])
    }

    pub fn new_3d(size0: u64, size1: u64, size2: u64) -> Result<Self> {
        Self::new(&[size0, size1, size2])
    }

    fn new(sizes: &[u64]) -> Result<Self> {
        if sizes.is_empty() || sizes.len() > MAX_DIMS {
            return Err(Error::invalid_argument(format!(
                "space dims must be in 1..={MAX_DIMS}, got {}",
                sizes.len()
            )));
        }
        if sizes.iter().any(|&s| s == 0) {
            return Err(Error::invalid_argument(
                "space extents must be non-zero".to_string(),
            ));
        }
        let mut size = [1u64; MAX_DIMS];
        size[..sizes.len()].copy_from_slice(sizes);
        Ok(Space {
            inner: Arc::new(SpaceInner {
                dims: sizes.len(),
                size,
            }),
        })
    }

    pub fn dims(&self) -> usize {
        self.inner.dims
    }

    pub fn size(&self, dim: usize) -> u64 {
        self.inner.size[dim]
    }

    pub fn sizes(&self) -> &[u64; MAX_DIMS] {
        &self.inner.size
    }

    /// Total number of indices in the space.
    pub fn element_count(&self) -> u64 {
        self.inner.size[..self.inner.dims].iter().product()
    }

    pub fn same_space(&self, other: &Space) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Space {
    fn eq(&self, other: &Self) -> bool {
        self.same_space(other)
    }
}
impl Eq for Space {}
