// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

//! The data container: a buffer bound to a [`Partitioning`] through a
//! [`Layout`], plus the `switch_to` transition engine that moves it to a
//! new partitioning by planning and executing a [`TransferPlan`].

use crate::backend::Backend;
use crate::{metrics, transfer};
use repart_layout::Layout;
use repart_partition::{Partitioning, WeakPartitioning};
use repart_types::{Error, Group, Result, Space};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, instrument};

/// The element type a container holds. `Double` is the only kind the
/// built-in pack/unpack walk and `Init` support; richer element kinds are
/// future work, not something the current transfer engine round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Double,
}

impl ElementKind {
    pub fn size(&self) -> usize {
        match self {
            ElementKind::Double => std::mem::size_of::<f64>(),
        }
    }
}

/// What `switch_to` should do with the data already bound to a container,
/// if any, as it moves to a new partitioning.
#[derive(Debug, Clone)]
pub enum DataFlow {
    /// Move existing values to their new homes; don't touch anything not
    /// already bound (the container must already be [`Bound`]).
    ///
    /// [`Bound`]: DataState::Bound
    CopyIn,
    /// The caller is about to overwrite every element it owns, so prior
    /// contents need not be preserved: allocate (or reuse) the new layout's
    /// buffer without diffing the old and new border arrays or moving any
    /// bytes. Valid from `Unbound`, unlike `CopyIn`/`CopyInOut`.
    CopyOut,
    /// Both directions of `CopyIn`: move existing values to their new
    /// homes so reads see them, and the caller may also overwrite.
    CopyInOut,
    /// The container was `Unbound`, or its previous contents should be
    /// discarded: fill every newly-owned element with this constant.
    Init(f64),
}

struct Binding {
    partitioning: WeakPartitioning,
    layout: Layout,
    buffer: Vec<u8>,
    /// Start element offset and length of this worker's owned region
    /// within `buffer` — `(0, local_length)` for sparse layouts, which
    /// compact their intervals, and `(lower_bound, upper_bound -
    /// lower_bound)` for dense layouts, which address by raw global index.
    owned_start: u64,
    owned_len: u64,
}

enum DataState {
    Unbound,
    Bound(Binding),
}

/// A named container bound to one partitioning at a time. `switch_to`
/// drives it through a sequence of bindings; between transitions it sits
/// in [`DataState::Bound`] or, before the first bind, [`DataState::Unbound`].
///
/// Internally guarded by a [`Mutex`] rather than requiring `&mut self`, so
/// a handle can be shared the way an opaque container handle is in the
/// systems this crate's design is modelled on; a `switch_to` that finds
/// the mutex already held (i.e. called reentrantly, e.g. from within a
/// partitioner callback running on the same container) fails fast with
/// [`Error::Busy`] instead of deadlocking.
pub struct Data {
    name: String,
    group: Arc<dyn Group>,
    space: Space,
    element_kind: ElementKind,
    layout_factory: LayoutFactory,
    state: Mutex<DataState>,
}

/// Builds a [`Layout`] for this worker from its sorted, coalesced
/// `(from, to)` slices on dimension 0. Given directly to [`Data::new`], or
/// via [`dense_layout_factory`]/[`sparse_layout_factory`].
pub type LayoutFactory = Arc<dyn Fn(&[(i64, i64)]) -> Layout + Send + Sync>;

/// The default: a dense buffer sized to the upper bound of the worker's
/// slices, addressed by raw global index (see [`repart_layout::Dense1D`]).
/// Wastes space for a worker whose slice doesn't start at zero, but needs
/// no knowledge of the rest of the border array to build.
pub fn dense_layout_factory() -> LayoutFactory {
    Arc::new(|slices: &[(i64, i64)]| {
        let hi = slices.iter().map(|(_, t)| *t).max().unwrap_or(0);
        Layout::Dense1D(repart_layout::Dense1D::new(hi.max(0) as u64))
    })
}

/// A sparse layout with `external_count` appended ghost/halo slots,
/// compacting the worker's owned intervals so no space is wasted on gaps.
pub fn sparse_layout_factory(external_count: u64) -> LayoutFactory {
    Arc::new(move |slices: &[(i64, i64)]| {
        Layout::Sparse1D(
            repart_layout::Sparse1D::calculate_mapping(slices, external_count)
                .expect("slices come from a validated border array and are always well-formed"),
        )
    })
}

impl Data {
    pub fn new(name: impl Into<String>, group: Arc<dyn Group>, space: Space, element_kind: ElementKind) -> Self {
        Data {
            name: name.into(),
            group,
            space,
            element_kind,
            layout_factory: dense_layout_factory(),
            state: Mutex::new(DataState::Unbound),
        }
    }

    pub fn with_layout_factory(mut self, factory: LayoutFactory) -> Self {
        self.layout_factory = factory;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        matches!(*self.state.lock().unwrap(), DataState::Bound(_))
    }

    /// The `(pointer-equivalent, count)` view of this worker's owned
    /// region: a byte slice covering exactly `owned_len` elements,
    /// starting at `owned_start`. `None` if unbound.
    pub fn map_default(&self) -> Option<Vec<u8>> {
        let guard = self.state.lock().unwrap();
        match &*guard {
            DataState::Unbound => None,
            DataState::Bound(b) => {
                let elem = self.element_kind.size();
                let start = b.owned_start as usize * elem;
                let len = b.owned_len as usize * elem;
                Some(b.buffer[start..start + len].to_vec())
            }
        }
    }

    /// Writes `value` into the worker's owned region's `local_index`-th
    /// element (0-based within the owned region, not a global index).
    pub fn write_local(&self, local_index: u64, value: f64) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        match &mut *guard {
            DataState::Unbound => Err(Error::precondition_failed("container is unbound")),
            DataState::Bound(b) => {
                if local_index >= b.owned_len {
                    return Err(Error::out_of_range(format!(
                        "local index {local_index} outside owned length {}",
                        b.owned_len
                    )));
                }
                let elem = self.element_kind.size();
                let off = (b.owned_start + local_index) as usize * elem;
                b.buffer[off..off + elem].copy_from_slice(&value.to_ne_bytes());
                Ok(())
            }
        }
    }

    pub fn read_local(&self, local_index: u64) -> Result<f64> {
        let guard = self.state.lock().unwrap();
        match &*guard {
            DataState::Unbound => Err(Error::precondition_failed("container is unbound")),
            DataState::Bound(b) => {
                if local_index >= b.owned_len {
                    return Err(Error::out_of_range(format!(
                        "local index {local_index} outside owned length {}",
                        b.owned_len
                    )));
                }
                let elem = self.element_kind.size();
                let off = (b.owned_start + local_index) as usize * elem;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&b.buffer[off..off + elem]);
                Ok(f64::from_ne_bytes(bytes))
            }
        }
    }

    /// Translates a global index to a local element offset within the
    /// owned region, or `None` if `g` is not locally owned. Never consumes
    /// a sparse layout's external-value cursor; that cursor is purely a
    /// pack/unpack walk concern.
    pub fn global_to_local(&self, g: i64) -> Option<u64> {
        let guard = self.state.lock().unwrap();
        match &*guard {
            DataState::Unbound => None,
            DataState::Bound(b) => match &b.layout {
                Layout::Dense1D(_) => {
                    if g >= 0 && (g as u64) >= b.owned_start && (g as u64) < b.owned_start + b.owned_len {
                        Some(g as u64 - b.owned_start)
                    } else {
                        None
                    }
                }
                Layout::Sparse1D(s) => s.intervals().iter().find(|iv| g >= iv.from && g < iv.to).map(|_| {
                    // local_length compaction is exact; recompute the prefix.
                    let mut prefix = 0u64;
                    for iv in s.intervals() {
                        if g >= iv.from && g < iv.to {
                            return prefix + (g - iv.from) as u64;
                        }
                        prefix += iv.len();
                    }
                    unreachable!("g was found in an earlier pass over the same interval list")
                }),
            },
        }
    }

    /// Translates a local element offset within the worker's owned region
    /// back to a global index. Inverse of [`Data::global_to_local`]; `None`
    /// if `local_index` is outside the owned region.
    pub fn local_to_global(&self, local_index: u64) -> Option<i64> {
        let guard = self.state.lock().unwrap();
        match &*guard {
            DataState::Unbound => None,
            DataState::Bound(b) => {
                if local_index >= b.owned_len {
                    return None;
                }
                match &b.layout {
                    Layout::Dense1D(_) => Some((b.owned_start + local_index) as i64),
                    Layout::Sparse1D(s) => {
                        let mut remaining = local_index;
                        for iv in s.intervals() {
                            let len = iv.len();
                            if remaining < len {
                                return Some(iv.from + remaining as i64);
                            }
                            remaining -= len;
                        }
                        unreachable!("local_index was bounds-checked against owned_len above")
                    }
                }
            }
        }
    }

    /// Moves this container from its current binding (or no binding) to
    /// `target`, executing the [`transfer::plan`] this worker computes
    /// against `backend`. `target` is validated as a side effect if it
    /// wasn't already.
    #[instrument(skip(self, backend, target), fields(container = %self.name))]
    pub fn switch_to(&self, backend: &dyn Backend, target: &Partitioning, flow: DataFlow) -> Result<()> {
        let start = std::time::Instant::now();
        let mut guard = self.state.try_lock().map_err(|_| Error::Busy)?;

        if !target.space().same_space(&self.space) {
            return Err(Error::invalid_argument(
                "target partitioning is over a different space than this container",
            ));
        }
        target.validate()?;
        let dst_border = target.border_array()?;
        let my_id = self.group.my_id();
        let my_slices = dst_border.task_bounds_1d(my_id, 0);

        let new_layout = (self.layout_factory)(&my_slices);
        let elem = self.element_kind.size();

        let (reused, mut new_layout, mut new_buffer, mut old_binding) = match std::mem::replace(&mut *guard, DataState::Unbound) {
            DataState::Unbound => {
                if matches!(flow, DataFlow::CopyIn | DataFlow::CopyInOut) {
                    return Err(Error::precondition_failed(
                        "switch_to with a data-flow that reads prior contents requires an already-bound container",
                    ));
                }
                let buf = vec![0u8; new_layout.count() as usize * elem];
                (false, new_layout, buf, None)
            }
            DataState::Bound(mut old) => {
                let mut candidate = new_layout;
                if candidate.reuse(&old.layout) {
                    metrics::LAYOUT_REUSE_TOTAL.inc();
                    let buf = std::mem::take(&mut old.buffer);
                    (true, candidate, buf, Some(old))
                } else {
                    // Reuse failing doesn't always mean the worker's owned
                    // indices genuinely changed: an external/non-external
                    // switch with the same local_length fails the buffer
                    // reuse check (allocated_range_count differs) but the
                    // new layout should still address local values the way
                    // the old one did, so the external view stays correct.
                    if candidate.same_local_length(&old.layout) {
                        candidate.adopt_interval_map_from(&old.layout);
                    }
                    let buf = vec![0u8; candidate.count() as usize * elem];
                    (false, candidate, buf, Some(old))
                }
            }
        };

        let wants_transfer = matches!(flow, DataFlow::CopyIn | DataFlow::CopyInOut);

        if let DataFlow::Init(value) = flow {
            // Init discards whatever was bound before, so no border-array
            // diffing or cross-worker traffic runs below for this flow.
            let bytes = value.to_ne_bytes();
            for chunk in new_buffer.chunks_exact_mut(elem) {
                chunk.copy_from_slice(&bytes);
            }
        } else if wants_transfer {
            let old = old_binding
                .as_mut()
                .expect("CopyIn/CopyInOut from Unbound already rejected above");
            let src_partitioning = old
                .partitioning
                .upgrade()
                .ok_or_else(|| Error::precondition_failed("source partitioning no longer exists"))?;
            let src_border = src_partitioning.border_array()?;
            let txn = transfer::plan(&src_border, &dst_border, my_id);

            new_layout.reset_external_cursor();
            old.layout.reset_external_cursor();

            // When the layout was reused, `new_buffer` *is* `old.buffer`
            // (moved out below) and `old`/`new` address every jointly-owned
            // index identically, so the local-copy walk would just copy
            // bytes onto themselves — skip it, and read already-resident
            // send data out of `new_buffer` instead of the now-empty
            // `old.buffer`.
            if !reused {
                for range in &txn.local_copies {
                    Layout::copy(elem, range, &mut old.layout, &old.buffer, &mut new_layout, &mut new_buffer)?;
                }
            }

            for send in &txn.sends {
                let mut wire = vec![0u8; send.range.size() as usize * elem];
                let mut cursor = send.range.from;
                let send_source: &[u8] = if reused { &new_buffer } else { &old.buffer };
                old.layout.pack(elem, &send.range, &mut cursor, send_source, &mut wire)?;
                backend.send(send.to, &wire).map_err(|e| {
                    error!(to = send.to, error = %e, "backend send failed, leaving pre-transition binding intact");
                    e
                })?;
                metrics::BYTES_SENT_TOTAL.inc_by(wire.len() as u64);
            }

            for recv in &txn.recvs {
                let mut wire = vec![0u8; recv.range.size() as usize * elem];
                backend.recv(recv.from, &mut wire).map_err(|e| {
                    error!(from = recv.from, error = %e, "backend recv failed, leaving pre-transition binding intact");
                    e
                })?;
                metrics::BYTES_RECEIVED_TOTAL.inc_by(wire.len() as u64);
                let mut cursor = recv.range.from;
                new_layout.unpack(elem, &recv.range, &mut cursor, &wire, &mut new_buffer)?;
            }

            debug!(
                local_copies = txn.local_copies.len(),
                sends = txn.sends.len(),
                recvs = txn.recvs.len(),
                reused,
                "transition executed"
            );
        }

        // Every worker reaches this point regardless of flow — a barrier
        // here, not just after a transfer, is what keeps `ThreadBackend`'s
        // per-(src,dst) channels from letting a fast worker's next
        // transition interleave with a slow peer's recvs of this one.
        backend.barrier().map_err(|e| {
            error!(error = %e, "backend barrier failed, leaving pre-transition binding intact");
            e
        })?;

        let (owned_start, owned_len) = owned_region(&new_layout, &my_slices);
        *guard = DataState::Bound(Binding {
            partitioning: target.downgrade(),
            layout: new_layout,
            buffer: new_buffer,
            owned_start,
            owned_len,
        });

        metrics::TRANSITIONS_TOTAL.inc();
        metrics::TRANSITION_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());
        Ok(())
    }
}

fn owned_region(layout: &Layout, my_slices: &[(i64, i64)]) -> (u64, u64) {
    match layout {
        Layout::Dense1D(_) => {
            let lo = my_slices.iter().map(|(f, _)| *f).min().unwrap_or(0).max(0) as u64;
            let hi = my_slices.iter().map(|(_, t)| *t).max().unwrap_or(0).max(0) as u64;
            (lo, hi.saturating_sub(lo))
        }
        Layout::Sparse1D(s) => (0, s.local_length()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use repart_partition::{new_block_1d, new_master};
    use repart_types::StaticGroup;

    #[test]
    fn init_on_unbound_container_fills_owned_region() {
        let group = StaticGroup::new(1, 0).into_arc();
        let space = Space::new_1d(8).unwrap();
        let data = Data::new("d", group.clone(), space.clone(), ElementKind::Double);
        let backend = LocalBackend::init();
        let target = Partitioning::new("p", group, space, new_block_1d(0, 1, None, None), None);

        data.switch_to(&backend, &target, DataFlow::Init(7.0)).unwrap();
        for i in 0..8 {
            assert_eq!(data.read_local(i).unwrap(), 7.0);
        }
    }

    #[test]
    fn copy_in_without_prior_binding_is_precondition_failed() {
        let group = StaticGroup::new(1, 0).into_arc();
        let space = Space::new_1d(8).unwrap();
        let data = Data::new("d", group.clone(), space.clone(), ElementKind::Double);
        let backend = LocalBackend::init();
        let target = Partitioning::new("p", group, space, new_master(), None);
        assert!(data.switch_to(&backend, &target, DataFlow::CopyIn).is_err());
    }

    #[test]
    fn copy_out_is_allowed_from_unbound_and_touches_no_prior_data() {
        let group = StaticGroup::new(1, 0).into_arc();
        let space = Space::new_1d(8).unwrap();
        let data = Data::new("d", group.clone(), space.clone(), ElementKind::Double);
        let backend = LocalBackend::init();
        let target = Partitioning::new("p", group, space, new_block_1d(0, 1, None, None), None);
        data.switch_to(&backend, &target, DataFlow::CopyOut).unwrap();
        assert!(data.is_bound());
    }

    #[test]
    fn copy_out_from_bound_runs_no_transfer() {
        // A backend whose send/recv always fail (LocalBackend): if CopyOut
        // mistakenly ran a transfer that needed cross-worker traffic this
        // would surface as a BackendError instead of succeeding.
        let group = StaticGroup::new(1, 0).into_arc();
        let space = Space::new_1d(8).unwrap();
        let data = Data::new("d", group.clone(), space.clone(), ElementKind::Double);
        let backend = LocalBackend::init();
        let block = Partitioning::new("block", group.clone(), space.clone(), new_block_1d(0, 1, None, None), None);
        data.switch_to(&backend, &block, DataFlow::Init(5.0)).unwrap();

        let master = Partitioning::new("master", group, space, new_master(), None);
        data.switch_to(&backend, &master, DataFlow::CopyOut).unwrap();
        assert!(data.is_bound());
    }

    #[test]
    fn global_to_local_reports_ownership_within_bound() {
        let group = StaticGroup::new(1, 0).into_arc();
        let space = Space::new_1d(8).unwrap();
        let data = Data::new("d", group.clone(), space.clone(), ElementKind::Double);
        let backend = LocalBackend::init();
        let target = Partitioning::new("p", group, space, new_block_1d(0, 1, None, None), None);
        data.switch_to(&backend, &target, DataFlow::Init(0.0)).unwrap();
        assert_eq!(data.global_to_local(0), Some(0));
        assert_eq!(data.global_to_local(7), Some(7));
        assert_eq!(data.global_to_local(8), None);
        assert_eq!(data.global_to_local(-1), None);
    }

    #[test]
    fn local_to_global_inverts_global_to_local() {
        let group = StaticGroup::new(1, 0).into_arc();
        let space = Space::new_1d(8).unwrap();
        let data = Data::new("d", group.clone(), space.clone(), ElementKind::Double);
        let backend = LocalBackend::init();
        let target = Partitioning::new("p", group, space, new_block_1d(0, 1, None, None), None);
        data.switch_to(&backend, &target, DataFlow::Init(0.0)).unwrap();

        for g in 0..8i64 {
            let l = data.global_to_local(g).unwrap();
            assert_eq!(data.local_to_global(l), Some(g));
        }
        assert_eq!(data.local_to_global(8), None);
    }
}
