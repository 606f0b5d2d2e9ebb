// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by the library, per the error handling design.
///
/// `OutOfMemory` is deliberately not a variant here: an allocation
/// failure is fatal and aborts the process at the call site rather than
/// being propagated, matching the source's `panic` path.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("index out of range: {0}")]
    OutOfRange(String),

    #[error("container is busy with another transition")]
    Busy,

    #[error("backend error: {0}")]
    BackendError(#[from] BackendError),

    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),
}

/// Opaque wrapper around a transport-layer failure.
///
/// The concrete backend crate that produced the failure is free to stash
/// whatever context it wants behind this string; the core never inspects
/// it beyond surfacing it to the caller and leaving the container's
/// pre-transition binding intact.
#[derive(Debug)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn precondition_failed(msg: impl Into<String>) -> Self {
        Error::PreconditionFailed(msg.into())
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Error::OutOfRange(msg.into())
    }

    pub fn layout_mismatch(msg: impl Into<String>) -> Self {
        Error::LayoutMismatch(msg.into())
    }
}
