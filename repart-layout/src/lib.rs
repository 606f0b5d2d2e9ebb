// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

//! The memory layout abstraction: dense and sparse 1-D vector layouts,
//! dispatched through a tagged [`Layout`] enum.

mod dense;
mod layout;
mod sparse;

pub use dense::Dense1D;
pub use layout::Layout;
pub use sparse::{Interval, Sparse1D};
