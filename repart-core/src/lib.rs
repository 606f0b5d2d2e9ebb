// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

//! The data container, its `switch_to` transition engine, the transfer
//! planner that drives a transition's traffic, reference backends, and the
//! ambient configuration/metrics glue that ties them together.

pub mod backend;
pub mod config;
pub mod data;
pub mod metrics;
pub mod transfer;

pub use backend::{thread_backend_mesh, Backend, LocalBackend, ThreadBackend};
pub use config::{BackendKind, Config};
pub use data::{Data, DataFlow, ElementKind};
pub use transfer::{RecvOp, SendOp, TransferPlan};
