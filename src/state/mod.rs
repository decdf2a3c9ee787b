//! ML state: batch buffering, lifecycle, diagnostics and snapshot framing.

mod buffer;
mod diagnostics;
mod lifecycle;
mod ml_state;
pub mod persist;

pub use buffer::BatchBuffer;
pub use diagnostics::{extract_diagnostics, Diagnostics};
pub use lifecycle::Lifecycle;
pub use ml_state::MlState;
pub use persist::{FormatVersion, SnapshotHeader, CURRENT_FORMAT_VERSION};
