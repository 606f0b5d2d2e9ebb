// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use crate::border::{BorderArray, BorderArrayBuilder};
use crate::partitioner::{Partitioner, PartitionerContext};
use repart_types::{Error, Group, Result, Space};
use std::sync::{Arc, Mutex, Weak};

struct Inner {
    name: String,
    group: Arc<dyn Group>,
    space: Space,
    partitioner: Partitioner,
    base: Option<Weak<Mutex<Inner>>>,
    border_array: Option<BorderArray>,
    valid: bool,
}

/// A named binding of `(group, space, partitioner, base?)` to a computed
/// border array.
///
/// Constructed invalid; [`Partitioning::validate`] runs the partitioner
/// and fills the border array. The base, when present, is held weakly —
/// per the design notes, partitionings reference their base as a
/// back-reference rather than an owning link, so a partitioning never
/// keeps its base alive on its own.
#[derive(Clone)]
pub struct Partitioning {
    inner: Arc<Mutex<Inner>>,
}

/// A non-owning handle to a [`Partitioning`], the form containers hold so
/// that partitionings stay shared rather than container-owned.
#[derive(Clone)]
pub struct WeakPartitioning {
    inner: Weak<Mutex<Inner>>,
}

impl Partitioning {
    pub fn new(
        name: impl Into<String>,
        group: Arc<dyn Group>,
        space: Space,
        partitioner: Partitioner,
        base: Option<&Partitioning>,
    ) -> Self {
        Partitioning {
            inner: Arc::new(Mutex::new(Inner {
                name: name.into(),
                group,
                space,
                partitioner,
                base: base.map(|b| Arc::downgrade(&b.inner)),
                border_array: None,
                valid: false,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.lock().unwrap().name.clone()
    }

    pub fn space(&self) -> Space {
        self.inner.lock().unwrap().space.clone()
    }

    pub fn group(&self) -> Arc<dyn Group> {
        self.inner.lock().unwrap().group.clone()
    }

    pub fn downgrade(&self) -> WeakPartitioning {
        WeakPartitioning {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.lock().unwrap().valid
    }

    /// Drops the border array and marks the partitioning invalid. Called
    /// externally when the group or the base partitioning changes.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.valid = false;
        inner.border_array = None;
    }

    /// Runs the partitioner and fills the border array. Idempotent while
    /// the group, space, partitioner and base are unchanged.
    pub fn validate(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.valid {
            return Ok(());
        }

        let base_border = if inner.partitioner.requires_base() || inner.base.is_some() {
            let base_strong = inner
                .base
                .as_ref()
                .and_then(Weak::upgrade)
                .ok_or_else(|| {
                    Error::precondition_failed(format!(
                        "partitioning {:?} requires a base partitioning that no longer exists",
                        inner.name
                    ))
                })?;
            let base_inner = base_strong.lock().unwrap();
            if !base_inner.space.same_space(&inner.space) {
                return Err(Error::invalid_argument(
                    "base partitioning is over a different space",
                ));
            }
            if !Arc::ptr_eq(
                &(base_inner.group.clone() as Arc<dyn Group>),
                &(inner.group.clone() as Arc<dyn Group>),
            ) {
                return Err(Error::precondition_failed(
                    "base partitioning belongs to a different group",
                ));
            }
            if !base_inner.valid {
                return Err(Error::precondition_failed(
                    "base partitioning must be validated before its dependent",
                ));
            }
            base_inner.border_array.clone()
        } else {
            None
        };

        let mut builder = BorderArrayBuilder::new();
        {
            let mut ctx = PartitionerContext {
                group_size: inner.group.size(),
                space: &inner.space,
                border: &mut builder,
                base: base_border.as_ref(),
            };
            inner.partitioner.run(&mut ctx)?;
        }
        inner.border_array = Some(builder.freeze());
        inner.valid = true;
        Ok(())
    }

    /// Validates if necessary and returns a clone of the border array.
    pub fn border_array(&self) -> Result<BorderArray> {
        self.validate()?;
        Ok(self.inner.lock().unwrap().border_array.clone().unwrap())
    }

    /// The bounding `[from, to)` on `dim` for the caller's task, coalesced
    /// across the task's slices when they are contiguous (a true union
    /// when contiguous, otherwise the smallest box containing them all).
    pub fn my_slice_1d(&self, dim: usize) -> Result<(i64, i64)> {
        let my_id = self.inner.lock().unwrap().group.my_id();
        let border = self.border_array()?;
        let bounds = border.task_bounds_1d(my_id, dim);
        if bounds.is_empty() {
            return Ok((0, 0));
        }
        let from = bounds.iter().map(|(f, _)| *f).min().unwrap();
        let to = bounds.iter().map(|(_, t)| *t).max().unwrap();
        Ok((from, to))
    }
}

impl WeakPartitioning {
    pub fn upgrade(&self) -> Option<Partitioning> {
        self.inner.upgrade().map(|inner| Partitioning { inner })
    }
}

impl std::fmt::Debug for Partitioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("Partitioning")
            .field("name", &inner.name)
            .field("valid", &inner.valid)
            .finish()
    }
}
