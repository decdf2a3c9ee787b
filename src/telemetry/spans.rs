//! Span utilities and extension traits for ML state tracing.

use tracing::{info_span, Span};

/// Extension trait for filling in operation span fields.
pub trait SpanExt {
    /// Record the outcome of the operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;

    /// Record how many records the operation handed to the model.
    fn record_records(&self, count: usize);
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }

    fn record_records(&self, count: usize) {
        self.record("records", count as u64);
    }
}

/// Factory for state operation spans.
pub struct OperationSpan;

impl OperationSpan {
    /// Create a span for one state operation.
    ///
    /// `op` is one of `write`, `fit`, `save`, `load`, `terminate`. The
    /// `records`, `status` and `error.message` fields start empty and are
    /// filled through [`SpanExt`].
    pub fn new(op: &'static str) -> Span {
        info_span!(
            "ml_state_op",
            op = op,
            records = tracing::field::Empty,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    }
}
