//! Batch-training shared state.

use std::io::{Read, Write};

use parking_lot::RwLock;
use serde_json::Value;

use super::buffer::BatchBuffer;
use super::diagnostics::extract_diagnostics;
use super::lifecycle::Lifecycle;
use super::persist::{self, SnapshotHeader};
use crate::config::{MlConfig, BATCH_TRAIN_SIZE_KEY};
use crate::error::StateError;
use crate::model::{ModelFactory, ModelHandle, Params, OP_FIT, OP_PREDICT};
use crate::telemetry::metrics;
use crate::telemetry::{OperationSpan, SpanExt};

struct Inner {
    lifecycle: Lifecycle,
    config: MlConfig,
    buffer: BatchBuffer,
}

/// A named piece of engine state that trains its model in fixed-size batches.
///
/// Lock discipline:
/// - exclusive: [`write`](Self::write), [`load`](Self::load), [`terminate`](Self::terminate)
/// - shared: [`fit`](Self::fit), [`predict`](Self::predict), [`save`](Self::save)
///
/// Shared operations still reach the model concurrently; see
/// [`ModelHandle`] for the serialization the model must provide.
pub struct MlState {
    inner: RwLock<Inner>,
}

impl MlState {
    /// Create a state whose model is built by `factory` from `model_params`.
    pub fn new(
        factory: &dyn ModelFactory,
        model_params: &Params,
        config: MlConfig,
    ) -> Result<Self, StateError> {
        config
            .validate()
            .map_err(|e| StateError::Construction(e.to_string()))?;
        let model = factory
            .create(model_params)
            .map_err(|e| StateError::Construction(e.to_string()))?;
        Self::with_model(model, config)
    }

    /// Create a state from a full creation clause. `batch_train_size` is
    /// consumed here and the remaining parameters go to the factory.
    pub fn create(factory: &dyn ModelFactory, mut params: Params) -> Result<Self, StateError> {
        let config =
            MlConfig::from_params(&params).map_err(|e| StateError::Construction(e.to_string()))?;
        params.remove(BATCH_TRAIN_SIZE_KEY);
        Self::new(factory, &params, config)
    }

    /// Wrap an already constructed model handle.
    pub fn with_model(model: Box<dyn ModelHandle>, config: MlConfig) -> Result<Self, StateError> {
        config
            .validate()
            .map_err(|e| StateError::Construction(e.to_string()))?;
        tracing::debug!(batch_train_size = config.batch_train_size, "ml state created");
        Ok(Self {
            inner: RwLock::new(Inner {
                lifecycle: Lifecycle::Active(model),
                config,
                buffer: BatchBuffer::new(config.batch_train_size),
            }),
        })
    }

    /// Buffer one record, training the model once a full batch is buffered.
    ///
    /// A batch whose `fit` fails is dropped, not retried; the error carries
    /// the size of the lost batch.
    pub fn write(&self, record: Value) -> Result<(), StateError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let model = inner.lifecycle.model()?;

        metrics::record_write();
        if !inner.buffer.push(record) {
            return Ok(());
        }
        train_batch(&mut inner.buffer, model, "write")
    }

    /// Train on an explicit batch, bypassing the write buffer.
    pub fn fit(&self, batch: Vec<Value>) -> Result<Value, StateError> {
        let guard = self.inner.read();
        let model = guard.lifecycle.model()?;
        let span = OperationSpan::new("fit");
        let _entered = span.enter();
        span.record_records(batch.len());
        let result = model.call(OP_FIT, &Value::Array(batch)).map_err(StateError::Delegate);
        span.record_result(&result);
        result
    }

    /// Train on a batch of maps, bypassing the write buffer.
    pub fn fit_maps(&self, batch: Vec<Params>) -> Result<Value, StateError> {
        self.fit(batch.into_iter().map(Value::Object).collect())
    }

    /// Run inference. The model's result is returned verbatim.
    pub fn predict(&self, input: &Value) -> Result<Value, StateError> {
        let guard = self.inner.read();
        let model = guard.lifecycle.model()?;
        model.call(OP_PREDICT, input).map_err(StateError::Delegate)
    }

    /// Write a snapshot: the configuration header followed by the model payload.
    pub fn save(&self, writer: &mut dyn Write, params: &Params) -> Result<(), StateError> {
        let guard = self.inner.read();
        let model = guard.lifecycle.model()?;
        let span = OperationSpan::new("save");
        let _entered = span.enter();

        let result = persist::write_header(writer, &guard.config)
            .and_then(|()| model.save(writer, params).map_err(StateError::Delegate));
        span.record_result(&result);
        if result.is_ok() {
            metrics::record_snapshot_saved();
        }
        result
    }

    /// Restore a snapshot written by [`save`](Self::save).
    ///
    /// The live configuration is replaced only after the model has loaded its
    /// payload successfully. Buffered records are kept. If the loaded batch
    /// size is small enough that they already fill a batch, the loaded model
    /// is trained on every full batch before returning; a failed batch is
    /// dropped and logged, and the load itself still succeeds.
    pub fn load(&self, reader: &mut dyn Read, params: &Params) -> Result<(), StateError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let model = inner.lifecycle.model_mut()?;
        let span = OperationSpan::new("load");
        let entered = span.enter();

        let result = persist::read_header(reader).and_then(|header| {
            model.load(reader, params).map_err(StateError::Delegate)?;
            Ok(header)
        });
        span.record_result(&result);
        let SnapshotHeader { version, config } = result?;

        inner.buffer.resize(config.batch_train_size);
        inner.config = config;
        metrics::record_snapshot_loaded(version.as_byte());
        drop(entered);

        while inner.buffer.is_full() {
            // Already logged and counted; the snapshot stays applied.
            let _ = train_batch(&mut inner.buffer, &*model, "load");
        }
        Ok(())
    }

    /// Release the model and discard buffered records.
    ///
    /// Every later call, including another `terminate`, fails with
    /// [`StateError::Terminated`].
    pub fn terminate(&self) -> Result<(), StateError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if inner.lifecycle.is_terminated() {
            return Err(StateError::Terminated);
        }

        let span = OperationSpan::new("terminate");
        let _entered = span.enter();
        inner.buffer.discard();
        let result = inner.lifecycle.terminate();
        span.record_result(&result);
        result
    }

    /// Current configuration.
    pub fn config(&self) -> MlConfig {
        self.inner.read().config
    }

    /// Number of records waiting for the next batch.
    pub fn buffered(&self) -> usize {
        self.inner.read().buffer.len()
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.read().lifecycle.is_terminated()
    }
}

/// Hand the oldest full batch in `buffer` to the model's `fit`.
///
/// The batch leaves the buffer whatever the outcome.
fn train_batch(
    buffer: &mut BatchBuffer,
    model: &dyn ModelHandle,
    op: &'static str,
) -> Result<(), StateError> {
    let span = OperationSpan::new(op);
    let _entered = span.enter();

    let (batch_size, result) = buffer.flush(|batch| model.call(OP_FIT, batch));
    span.record_records(batch_size);
    let trained = match result {
        Ok(trained) => trained,
        Err(source) => {
            metrics::record_training_failure();
            tracing::error!(batch_size, error = %source, "training failed, batch dropped");
            let err = StateError::TrainingFailed { batch_size, source };
            span.record_result::<(), _>(&Err(&err));
            return Err(err);
        }
    };
    metrics::record_batch_trained(batch_size);
    span.record_result::<(), StateError>(&Ok(()));

    match extract_diagnostics(&trained) {
        Some(diagnostics) => {
            let d = diagnostics.per_record(buffer.batch_size());
            tracing::debug!(loss = d.loss, accuracy = d.accuracy, batch_size, "batch trained");
        }
        None => tracing::trace!(batch_size, "fit result carries no loss/accuracy"),
    }
    Ok(())
}

impl std::fmt::Debug for MlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MlState")
            .field("lifecycle", &inner.lifecycle)
            .field("config", &inner.config)
            .field("buffered", &inner.buffer.len())
            .finish()
    }
}
