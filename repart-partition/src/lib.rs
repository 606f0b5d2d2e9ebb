// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

//! Border arrays, the built-in partitioner registry, and partitioning
//! objects that bind a `(group, space, partitioner, base?)` tuple to a
//! computed border array.

mod border;
mod partitioner;
mod partitioning;

pub use border::{BorderArray, BorderArrayBuilder, TaskSlice};
pub use partitioner::{
    new_all, new_block_1d, new_copy, new_master, IndexWeight, Partitioner, PartitionerContext,
    Registry, TaskWeight,
};
pub use partitioning::{Partitioning, WeakPartitioning};
