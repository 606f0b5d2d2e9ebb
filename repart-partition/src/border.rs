// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use repart_types::{Index, Range};

/// One entry of a [`BorderArray`]: the range a `task` owns under a given
/// `mapping_no`.
#[derive(Debug, Clone)]
pub struct TaskSlice {
    pub task: usize,
    pub range: Range,
    pub mapping_no: usize,
}

/// Append-only accumulator a [`crate::Partitioner`] writes into while it
/// runs. Frozen into a [`BorderArray`] once the partitioner returns.
#[derive(Debug, Default)]
pub struct BorderArrayBuilder {
    slices: Vec<TaskSlice>,
}

impl BorderArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: usize, range: Range, mapping_no: usize) {
        self.slices.push(TaskSlice {
            task,
            range,
            mapping_no,
        });
    }

    /// Sorts stably by `(task, mapping_no, range.from lexicographic)` and
    /// freezes the result. Stable sort preserves insertion order among
    /// slices that tie on the sort key.
    pub fn freeze(mut self) -> BorderArray {
        self.slices.sort_by(|a, b| {
            a.task
                .cmp(&b.task)
                .then(a.mapping_no.cmp(&b.mapping_no))
                .then(a.range.from.cmp(&b.range.from))
        });
        BorderArray {
            slices: self.slices,
        }
    }
}

/// The sorted, immutable outcome of running a partitioner: for a given
/// `(group, space, partitioner, base?)`, a list of `(task, range,
/// mapping-no)` entries.
#[derive(Debug, Clone, Default)]
pub struct BorderArray {
    slices: Vec<TaskSlice>,
}

impl BorderArray {
    pub fn count(&self) -> usize {
        self.slices.len()
    }

    pub fn get(&self, i: usize) -> &TaskSlice {
        &self.slices[i]
    }

    pub fn get_range(&self, i: usize) -> &Range {
        &self.slices[i].range
    }

    pub fn get_task(&self, i: usize) -> usize {
        self.slices[i].task
    }

    pub fn iter_for_task(&self, task: usize) -> impl Iterator<Item = &TaskSlice> {
        // Entries are grouped by task after freezing, so a linear scan
        // restricted to the matching run is exact, not just a filter.
        self.slices.iter().filter(move |s| s.task == task)
    }

    pub fn all(&self) -> &[TaskSlice] {
        &self.slices
    }

    /// The `(from, to)` 1-D bounds of each slice for `task`, coalesced
    /// across the task's slices when they are contiguous. Assumes `pdim`
    /// is 1-D-addressable (all other axes span the whole space), which is
    /// the shape every built-in partitioner in this crate produces.
    pub fn task_bounds_1d(&self, task: usize, pdim: usize) -> Vec<(i64, i64)> {
        self.iter_for_task(task)
            .map(|s| (s.range.from.get(pdim), s.range.to.get(pdim)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repart_types::Space;

    #[test]
    fn freeze_sorts_by_task_then_mapping_then_from() {
        let space = Space::new_1d(100).unwrap();
        let r = |a: i64, b: i64| Range::new(space.clone(), Index::new_1d(a), Index::new_1d(b)).unwrap();
        let mut b = BorderArrayBuilder::new();
        b.push(1, r(0, 10), 0);
        b.push(0, r(50, 60), 0);
        b.push(0, r(0, 10), 0);
        let frozen = b.freeze();
        assert_eq!(frozen.get_task(0), 0);
        assert_eq!(frozen.get_range(0).from.i0(), 0);
        assert_eq!(frozen.get_task(1), 0);
        assert_eq!(frozen.get_range(1).from.i0(), 50);
        assert_eq!(frozen.get_task(2), 1);
    }
}
