//! ML State
//!
//! A named, concurrently accessed piece of stream-engine state that buffers
//! incoming records, trains a delegated model once per full batch, and saves
//! or restores itself as a versioned snapshot.
//!
//! # Design Principles
//!
//! - **Opaque model**: training and inference are delegated to a [`ModelHandle`];
//!   no learning algorithm lives here.
//! - **One lock per state**: writes, loads and termination are exclusive;
//!   fits, predictions and saves share the lock.
//! - **At-most-once batches**: a batch whose training fails is dropped, never
//!   replayed.
//! - **Versioned snapshots**: a small header leads every snapshot so new
//!   layouts can be added without reinterpreting old ones.

pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod state;
pub mod telemetry;

pub use config::{MlConfig, RuntimeConfig, DEFAULT_BATCH_TRAIN_SIZE};
pub use error::{ModelError, StateError};
pub use model::{ModelFactory, ModelHandle, Params};
pub use registry::{lookup_ml_state, SharedState, StateLookup, StateRegistry};
pub use state::{extract_diagnostics, Diagnostics, MlState};
