//! Delegated model handle contract.
//!
//! The state never trains or predicts on its own. It forwards batches and
//! inputs to a [`ModelHandle`] and frames the handle's snapshot payload.
//!
//! # Concurrency contract
//!
//! [`ModelHandle::call`] takes `&self` and is invoked while the owning state
//! holds only a shared lock, so several `fit`/`predict` calls may reach the
//! handle at once. Implementations must serialize their own mutation (for
//! example behind an internal mutex or an interpreter-wide execution lock).
//! A handle that cannot do this must add its own serialization internally;
//! the state's lock discipline is not weakened to compensate.

use std::io::{Read, Write};

use serde_json::Value;

use crate::error::ModelError;

/// Dynamically typed parameter map passed through to the model.
pub type Params = serde_json::Map<String, Value>;

/// Operation name used for training.
pub const OP_FIT: &str = "fit";

/// Operation name used for inference.
pub const OP_PREDICT: &str = "predict";

/// An opaque trainable/predictable component owned by exactly one state.
pub trait ModelHandle: Send + Sync {
    /// Invoke a named operation. Must be internally thread-safe.
    fn call(&self, op: &str, arg: &Value) -> Result<Value, ModelError>;

    /// Write the model's own payload to `writer`.
    fn save(&self, writer: &mut dyn Write, params: &Params) -> Result<(), ModelError>;

    /// Replace the model's state from the remainder of `reader`.
    fn load(&mut self, reader: &mut dyn Read, params: &Params) -> Result<(), ModelError>;

    /// Release model resources. The handle is never used afterwards.
    fn terminate(&mut self) -> Result<(), ModelError>;
}

/// Constructs model handles from model construction parameters.
pub trait ModelFactory: Send + Sync {
    fn create(&self, params: &Params) -> Result<Box<dyn ModelHandle>, ModelError>;
}

impl<F> ModelFactory for F
where
    F: Fn(&Params) -> Result<Box<dyn ModelHandle>, ModelError> + Send + Sync,
{
    fn create(&self, params: &Params) -> Result<Box<dyn ModelHandle>, ModelError> {
        self(params)
    }
}
