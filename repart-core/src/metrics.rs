// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide transition metrics, registered against the default
//! [`prometheus`] registry the way `aptos-metrics-core` consumers do.

use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};

pub static TRANSITIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "repart_transitions_total",
        "Number of completed switch_to transitions across every container"
    )
    .unwrap()
});

pub static TRANSITION_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "repart_transition_duration_seconds",
        "Wall-clock time spent inside switch_to, end to end"
    )
    .unwrap()
});

pub static LAYOUT_REUSE_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "repart_layout_reuse_total",
        "Number of transitions that reused the prior binding's buffer instead of reallocating"
    )
    .unwrap()
});

pub static BYTES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "repart_bytes_sent_total",
        "Bytes handed to Backend::send across every transition"
    )
    .unwrap()
});

pub static BYTES_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "repart_bytes_received_total",
        "Bytes pulled out of Backend::recv across every transition"
    )
    .unwrap()
});
