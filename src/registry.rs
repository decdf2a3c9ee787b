//! Named lookup of shared states.
//!
//! The engine hands a [`StateLookup`] to call sites instead of exposing a
//! process-wide registry. [`StateRegistry`] is the in-memory implementation.

use std::any::Any;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::StateError;
use crate::model::Params;
use crate::state::MlState;

/// Operations every named state supports, whatever its concrete type.
pub trait SharedState: Send + Sync + 'static {
    /// Human-readable type name used in lookup errors.
    fn type_name(&self) -> &'static str;

    fn write(&self, record: Value) -> Result<(), StateError>;

    fn terminate(&self) -> Result<(), StateError>;

    /// Upcast for downcasting to the concrete state type.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl SharedState for MlState {
    fn type_name(&self) -> &'static str {
        "ml_state"
    }

    fn write(&self, record: Value) -> Result<(), StateError> {
        MlState::write(self, record)
    }

    fn terminate(&self) -> Result<(), StateError> {
        MlState::terminate(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Resolves a state by name.
pub trait StateLookup: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<dyn SharedState>>;
}

/// Thread-safe registry of named states.
pub struct StateRegistry {
    states: DashMap<String, Arc<dyn SharedState>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self { states: DashMap::new() }
    }

    /// Register a state under a new name.
    pub fn add(&self, name: impl Into<String>, state: Arc<dyn SharedState>) -> Result<(), StateError> {
        match self.states.entry(name.into()) {
            Entry::Occupied(entry) => Err(StateError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(name = %entry.key(), kind = state.type_name(), "state registered");
                entry.insert(state);
                Ok(())
            }
        }
    }

    /// Remove a state without terminating it.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn SharedState>> {
        self.states.remove(name).map(|(_, state)| state)
    }

    /// Remove a state and terminate it.
    pub fn drop_state(&self, name: &str) -> Result<(), StateError> {
        let state = self
            .remove(name)
            .ok_or_else(|| StateError::NotFound(name.to_string()))?;
        state.terminate()
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.states.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StateLookup for StateRegistry {
    fn get(&self, name: &str) -> Option<Arc<dyn SharedState>> {
        self.states.get(name).map(|e| e.value().clone())
    }
}

/// Resolve `name` to an ML state.
pub fn lookup_ml_state(lookup: &dyn StateLookup, name: &str) -> Result<Arc<MlState>, StateError> {
    let state = lookup
        .get(name)
        .ok_or_else(|| StateError::NotFound(name.to_string()))?;
    let found = state.type_name();
    state
        .into_any()
        .downcast::<MlState>()
        .map_err(|_| StateError::WrongType { name: name.to_string(), found })
}

/// Train the named state on an explicit batch of maps.
pub fn fit(lookup: &dyn StateLookup, name: &str, batch: Vec<Params>) -> Result<Value, StateError> {
    lookup_ml_state(lookup, name)?.fit_maps(batch)
}

/// Run inference on the named state.
pub fn predict(lookup: &dyn StateLookup, name: &str, input: &Value) -> Result<Value, StateError> {
    lookup_ml_state(lookup, name)?.predict(input)
}
