//! `metrics` facade instrumentation for ML states.
//!
//! The crate only records; installing a recorder/exporter is up to the host.

use ::metrics::{counter, histogram};

/// Record one record accepted by `write`.
pub fn record_write() {
    counter!("ml_state_records_written_total").increment(1);
}

/// Record a batch handed to the model's `fit` through the write path.
pub fn record_batch_trained(batch_size: usize) {
    counter!("ml_state_batches_trained_total").increment(1);
    histogram!("ml_state_batch_size").record(batch_size as f64);
}

pub fn record_training_failure() {
    counter!("ml_state_training_failures_total").increment(1);
}

pub fn record_snapshot_saved() {
    counter!("ml_state_snapshots_saved_total").increment(1);
}

/// Record a successfully loaded snapshot, labelled by format version.
pub fn record_snapshot_loaded(version: u8) {
    counter!("ml_state_snapshots_loaded_total", "format_version" => version.to_string())
        .increment(1);
}
