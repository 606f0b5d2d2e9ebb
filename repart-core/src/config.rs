// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

//! Process-level configuration for choosing a [`crate::Backend`]. Plain
//! data, `serde`-capable like the rest of this crate family's config
//! structs, so it can be loaded from a TOML/YAML file or built up in code.

use serde::{Deserialize, Serialize};

/// Which [`crate::Backend`] implementation a process should stand up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendKind {
    /// A single worker, no transport. See [`crate::backend::LocalBackend`].
    SingleProcess,
    /// `worker_count` OS threads in this process, wired together by
    /// [`crate::backend::thread_backend_mesh`].
    Threaded { worker_count: usize },
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::SingleProcess
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub backend: BackendKind,
    /// Number of external (ghost/halo) slots a sparse layout should
    /// allocate by default when a container doesn't request its own.
    #[serde(default)]
    pub default_external_slots: u64,
}
