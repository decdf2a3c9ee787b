//! Lifecycle of an ML state and ownership of its model handle.

use crate::error::{ModelError, StateError};
use crate::model::ModelHandle;

/// Lifecycle state machine. Transitions only move forward:
/// `Active -> Terminating -> Terminated`.
///
/// The model handle lives inside `Active`, so a handle can only be reached
/// while the state is usable.
pub enum Lifecycle {
    Active(Box<dyn ModelHandle>),
    /// The model's terminate is running, or panicked part way through.
    Terminating,
    Terminated,
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn is_terminated(&self) -> bool {
        !self.is_active()
    }

    /// Borrow the model, failing fast once termination has begun.
    pub fn model(&self) -> Result<&dyn ModelHandle, StateError> {
        match self {
            Self::Active(model) => Ok(model.as_ref()),
            Self::Terminating | Self::Terminated => Err(StateError::Terminated),
        }
    }

    pub fn model_mut(&mut self) -> Result<&mut (dyn ModelHandle + 'static), StateError> {
        match self {
            Self::Active(model) => Ok(model.as_mut()),
            Self::Terminating | Self::Terminated => Err(StateError::Terminated),
        }
    }

    /// Release the model. The handle is dropped and never used again, even
    /// when its own terminate reports an error.
    pub fn terminate(&mut self) -> Result<(), StateError> {
        let mut model = match std::mem::replace(self, Self::Terminating) {
            Self::Active(model) => model,
            previous => {
                *self = previous;
                return Err(StateError::Terminated);
            }
        };

        let result: Result<(), ModelError> = model.terminate();
        drop(model);
        *self = Self::Terminated;
        result.map_err(StateError::Delegate)
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active(_) => f.write_str("Active"),
            Self::Terminating => f.write_str("Terminating"),
            Self::Terminated => f.write_str("Terminated"),
        }
    }
}
