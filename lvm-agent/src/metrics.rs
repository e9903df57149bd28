//! Metrics for volume lifecycle operations
//!
//! Recorded through the `metrics` facade; nothing is exported until the
//! embedding process installs a recorder.

use std::time::Instant;

use metrics::{counter, gauge, histogram};

/// Metric names
pub mod names {
    /// Counter: Total volume operations by type and status
    pub const OPERATIONS_TOTAL: &str = "lvm_operations_total";
    /// Histogram: Duration of volume operations in seconds
    pub const OPERATION_DURATION_SECONDS: &str = "lvm_operation_duration_seconds";
    /// Gauge: Number of logical volumes seen by the last listing
    pub const VOLUMES_TOTAL: &str = "lvm_volumes_total";
}

/// Record a volume operation with its result
pub fn record_operation(operation: &str, status: &str, duration_secs: f64) {
    counter!(names::OPERATIONS_TOTAL, "operation" => operation.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(names::OPERATION_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration_secs);
}

/// Set the number of logical volumes in the group
pub fn set_volumes_count(count: usize) {
    gauge!(names::VOLUMES_TOTAL).set(count as f64);
}

/// Helper for timing operations
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing an operation
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Complete the operation with success
    pub fn success(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_operation(self.operation, "success", duration);
    }

    /// Complete the operation with failure
    pub fn failure(self, status: &str) {
        let duration = self.start.elapsed().as_secs_f64();
        record_operation(self.operation, status, duration);
    }

    /// Complete the operation according to its result
    pub fn finish<T, E>(self, result: &Result<T, E>, status: impl FnOnce(&E) -> &'static str) {
        match result {
            Ok(_) => self.success(),
            Err(e) => self.failure(status(e)),
        }
    }
}
