//! Telemetry module for ML states.
//!
//! Provides structured logging, per-operation spans, and metrics recording.

mod logging;
pub(crate) mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use spans::{OperationSpan, SpanExt};
