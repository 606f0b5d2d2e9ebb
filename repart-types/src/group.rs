// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::Arc;

/// An ordered set of workers with ids `[0, size())`. Groups are owned by
/// the backend; the core only ever reads `size`/`my_id` through this
/// trait and treats group identity opaquely.
pub trait Group: fmt::Debug + Send + Sync {
    fn size(&self) -> usize;
    fn my_id(&self) -> usize;
}

/// A trivial [`Group`] with a fixed size and a fixed local id, sufficient
/// for the reference backends and for tests that don't need a real
/// transport.
#[derive(Debug, Clone)]
pub struct StaticGroup {
    size: usize,
    my_id: usize,
}

impl StaticGroup {
    pub fn new(size: usize, my_id: usize) -> Self {
        assert!(my_id < size, "my_id {my_id} out of bounds for size {size}");
        StaticGroup { size, my_id }
    }

    pub fn into_arc(self) -> Arc<dyn Group> {
        Arc::new(self)
    }
}

impl Group for StaticGroup {
    fn size(&self) -> usize {
        self.size
    }

    fn my_id(&self) -> usize {
        self.my_id
    }
}
