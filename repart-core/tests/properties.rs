// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use proptest::prelude::*;
use repart_core::{thread_backend_mesh, Data, DataFlow, ElementKind};
use repart_partition::{new_block_1d, Partitioning};
use repart_types::{Space, StaticGroup};
use std::sync::Arc;

proptest! {
    /// Every block-partitioner slice lies within the space it partitions,
    /// and every task's owned length is within one of the mean share —
    /// the balance property the distribution loop is built to guarantee.
    #[test]
    fn block_partitioner_slices_are_in_bounds_and_balanced(size in 1u64..200, tasks in 1usize..16) {
        let space = Space::new_1d(size).unwrap();
        let group: Arc<dyn repart_types::Group> = StaticGroup::new(tasks, 0).into_arc();
        let p = Partitioning::new("block", group, space, new_block_1d(0, 1, None, None), None);
        let border = p.border_array().unwrap();

        let mut total = 0u64;
        let mut lens = Vec::new();
        for t in 0..tasks {
            let bounds = border.task_bounds_1d(t, 0);
            let len: u64 = bounds.iter().map(|(f, to)| (to - f) as u64).sum();
            for (f, to) in &bounds {
                prop_assert!(*f >= 0 && *to as u64 <= size);
            }
            total += len;
            lens.push(len);
        }
        prop_assert_eq!(total, size);
        if let (Some(max), Some(min)) = (lens.iter().max(), lens.iter().min()) {
            prop_assert!(max - min <= 1);
        }
    }

    /// A CopyIn round trip through the identical partitioning is the
    /// identity: every owned value comes back unchanged.
    #[test]
    fn copy_in_identity_transition_round_trips(size in 1u64..64, value in -1000.0f64..1000.0) {
        let mesh = thread_backend_mesh(1);
        let backend = mesh.into_iter().next().unwrap();
        let group: Arc<dyn repart_types::Group> = StaticGroup::new(1, 0).into_arc();
        let space = Space::new_1d(size).unwrap();
        let data = Data::new("v", group.clone(), space.clone(), ElementKind::Double);
        let p = Partitioning::new("block", group, space, new_block_1d(0, 1, None, None), None);

        data.switch_to(&backend, &p, DataFlow::Init(value)).unwrap();
        for i in 0..size {
            data.write_local(i, i as f64).unwrap();
        }
        data.switch_to(&backend, &p, DataFlow::CopyIn).unwrap();
        for i in 0..size {
            prop_assert_eq!(data.read_local(i).unwrap(), i as f64);
        }
    }
}
