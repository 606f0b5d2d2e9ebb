// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use repart_types::{BackendError, Error, Group, Result, StaticGroup};
use std::collections::VecDeque;
use std::sync::{Arc, Barrier, Mutex};

/// The transport a [`crate::data::Data`] container talks through to move
/// bytes between workers during a transition. Every method is a blocking
/// point-to-point or collective primitive; a concrete backend owns whatever
/// connection state it needs to implement them.
pub trait Backend: Send + Sync {
    /// Joins the process group, returning the [`Group`] this backend's
    /// workers share.
    fn world(&self) -> Arc<dyn Group>;

    fn size(&self) -> usize {
        self.world().size()
    }

    fn my_id(&self) -> usize {
        self.world().my_id()
    }

    /// Blocking send of `buf` to `to`. Errors are wrapped in
    /// [`Error::BackendError`]; the container leaves its pre-transition
    /// binding untouched when this returns an error.
    fn send(&self, to: usize, buf: &[u8]) -> Result<()>;

    /// Blocking receive of exactly `buf.len()` bytes from `from`.
    fn recv(&self, from: usize, buf: &mut [u8]) -> Result<()>;

    /// Collective barrier across every worker in [`Backend::world`].
    fn barrier(&self) -> Result<()>;

    /// Releases transport resources. Backends that own no resources beyond
    /// what `Drop` already reclaims can leave this as a no-op.
    fn finalize(&self) -> Result<()> {
        Ok(())
    }
}

/// A single-worker backend: `world().size() == 1`. Per §6, a single-process
/// backend collapses a send/recv between `my_id` and itself to a memcpy;
/// sending to or receiving from any other id fails, since there is never a
/// peer to talk to. The memcpy is realized as a FIFO queue of pending
/// self-sent buffers rather than a single slot, so a caller that issues
/// several self-directed sends before draining them with matching recvs
/// (e.g. a transfer plan with more than one same-worker "send") still
/// gets each buffer back in the order it was sent.
#[derive(Debug)]
pub struct LocalBackend {
    group: Arc<dyn Group>,
    self_mailbox: Mutex<VecDeque<Vec<u8>>>,
}

impl LocalBackend {
    pub fn init() -> Self {
        LocalBackend {
            group: StaticGroup::new(1, 0).into_arc(),
            self_mailbox: Mutex::new(VecDeque::new()),
        }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::init()
    }
}

impl Backend for LocalBackend {
    fn world(&self) -> Arc<dyn Group> {
        self.group.clone()
    }

    fn send(&self, to: usize, buf: &[u8]) -> Result<()> {
        if to != self.my_id() {
            return Err(Error::BackendError(BackendError(format!(
                "LocalBackend has a single worker; cannot send to task {to}"
            ))));
        }
        self.self_mailbox.lock().unwrap().push_back(buf.to_vec());
        Ok(())
    }

    fn recv(&self, from: usize, buf: &mut [u8]) -> Result<()> {
        if from != self.my_id() {
            return Err(Error::BackendError(BackendError(format!(
                "LocalBackend has a single worker; cannot recv from task {from}"
            ))));
        }
        let received = self.self_mailbox.lock().unwrap().pop_front().ok_or_else(|| {
            Error::BackendError(BackendError(
                "LocalBackend recv from self with no matching send pending".to_string(),
            ))
        })?;
        if received.len() != buf.len() {
            return Err(Error::BackendError(BackendError(format!(
                "self recv: expected {} bytes, got {}",
                buf.len(),
                received.len()
            ))));
        }
        buf.copy_from_slice(&received);
        Ok(())
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }
}

/// A reference multi-worker backend built on OS threads sharing a process:
/// one [`ThreadWorker`] handle per spawned thread, rendezvousing through
/// per-pair [`crossbeam_channel`] rendezvous channels and a shared
/// [`std::sync::Barrier`]. Intended for tests and examples, not production
/// transport — real deployments plug in a network-backed [`Backend`]
/// instead.
pub struct ThreadBackend {
    group: Arc<dyn Group>,
    senders: Vec<Vec<crossbeam_channel::Sender<Vec<u8>>>>,
    receivers: Vec<crossbeam_channel::Receiver<Vec<u8>>>,
    barrier: Arc<Barrier>,
}

/// Builds the full mesh of channels for a `worker_count`-way
/// [`ThreadBackend`] group and returns one handle per worker, ready to be
/// moved into that worker's thread.
pub fn thread_backend_mesh(worker_count: usize) -> Vec<ThreadBackend> {
    assert!(worker_count >= 1, "worker_count must be >= 1");
    let barrier = Arc::new(Barrier::new(worker_count));

    // channels[i][j] carries messages from i to j.
    let mut channels: Vec<Vec<(crossbeam_channel::Sender<Vec<u8>>, crossbeam_channel::Receiver<Vec<u8>>)>> =
        Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let mut row = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            row.push(crossbeam_channel::unbounded());
        }
        channels.push(row);
    }

    let mut backends = Vec::with_capacity(worker_count);
    for me in 0..worker_count {
        let senders = (0..worker_count)
            .map(|j| channels[me][j].0.clone())
            .collect::<Vec<_>>();
        // group_backends[i]'s receivers[j] listens on channels[j][i] — the
        // channel that worker j writes to when it targets me.
        let receivers = (0..worker_count)
            .map(|j| channels[j][me].1.clone())
            .collect::<Vec<_>>();
        backends.push(ThreadBackend {
            group: StaticGroup::new(worker_count, me).into_arc(),
            senders,
            receivers,
            barrier: barrier.clone(),
        });
    }
    backends
}

impl Backend for ThreadBackend {
    fn world(&self) -> Arc<dyn Group> {
        self.group.clone()
    }

    fn send(&self, to: usize, buf: &[u8]) -> Result<()> {
        self.senders
            .get(to)
            .ok_or_else(|| Error::invalid_argument(format!("no such task {to}")))?
            .send(buf.to_vec())
            .map_err(|e| Error::BackendError(BackendError(e.to_string())))
    }

    fn recv(&self, from: usize, buf: &mut [u8]) -> Result<()> {
        let received = self
            .receivers
            .get(from)
            .ok_or_else(|| Error::invalid_argument(format!("no such task {from}")))?
            .recv()
            .map_err(|e| Error::BackendError(BackendError(e.to_string())))?;
        if received.len() != buf.len() {
            return Err(Error::BackendError(BackendError(format!(
                "recv from {from}: expected {} bytes, got {}",
                buf.len(),
                received.len()
            ))));
        }
        buf.copy_from_slice(&received);
        Ok(())
    }

    fn barrier(&self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }
}
