//! Shared model test double for integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use ml_state::{ModelError, ModelFactory, ModelHandle, Params};
use serde_json::{json, Value};

/// Payload prefix written by `RecordingModel::save`.
pub const PAYLOAD_MAGIC: &[u8] = b"RECMODEL";

/// Observations shared between a test and the model it handed to a state.
#[derive(Default)]
pub struct Recorder {
    pub fits: Mutex<Vec<Value>>,
    pub predicts: Mutex<Vec<Value>>,
    pub saves: AtomicU32,
    pub loaded_payloads: Mutex<Vec<Vec<u8>>>,
    pub terminations: AtomicU32,
    pub created_with: Mutex<Vec<Params>>,
    pub fail_fit: AtomicBool,
    pub fail_load: AtomicBool,
    pub fail_create: AtomicBool,
    pub fit_result: Mutex<Option<Value>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fit_count(&self) -> usize {
        self.fits.lock().unwrap().len()
    }

    pub fn fit_batches(&self) -> Vec<Vec<Value>> {
        self.fits
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.as_array().cloned().unwrap_or_default())
            .collect()
    }

    pub fn set_fit_result(&self, value: Value) {
        *self.fit_result.lock().unwrap() = Some(value);
    }
}

/// Model double that records every call it receives.
pub struct RecordingModel {
    recorder: Arc<Recorder>,
    weights: Vec<u8>,
}

impl RecordingModel {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder, weights: b"w0".to_vec() }
    }

    pub fn boxed(recorder: &Arc<Recorder>) -> Box<dyn ModelHandle> {
        Box::new(Self::new(recorder.clone()))
    }
}

impl ModelHandle for RecordingModel {
    fn call(&self, op: &str, arg: &Value) -> Result<Value, ModelError> {
        match op {
            "fit" => {
                self.recorder.fits.lock().unwrap().push(arg.clone());
                if self.recorder.fail_fit.load(Ordering::SeqCst) {
                    return Err(ModelError::call("fit", "injected failure"));
                }
                let result = self.recorder.fit_result.lock().unwrap().clone();
                Ok(result.unwrap_or(Value::Null))
            }
            "predict" => {
                self.recorder.predicts.lock().unwrap().push(arg.clone());
                Ok(json!({ "prediction": arg }))
            }
            other => Err(ModelError::call(other, "unknown operation")),
        }
    }

    fn save(&self, writer: &mut dyn Write, _params: &Params) -> Result<(), ModelError> {
        self.recorder.saves.fetch_add(1, Ordering::SeqCst);
        writer.write_all(PAYLOAD_MAGIC)?;
        writer.write_all(&self.weights)?;
        Ok(())
    }

    fn load(&mut self, reader: &mut dyn Read, _params: &Params) -> Result<(), ModelError> {
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        self.recorder.loaded_payloads.lock().unwrap().push(payload.clone());
        if self.recorder.fail_load.load(Ordering::SeqCst) {
            return Err(ModelError::Other("injected load failure".into()));
        }
        match payload.strip_prefix(PAYLOAD_MAGIC) {
            Some(weights) => {
                self.weights = weights.to_vec();
                Ok(())
            }
            None => Err(ModelError::Other("payload magic missing".into())),
        }
    }

    fn terminate(&mut self) -> Result<(), ModelError> {
        self.recorder.terminations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory producing recording models that share `recorder`.
pub fn factory(recorder: Arc<Recorder>) -> impl ModelFactory {
    move |params: &Params| -> Result<Box<dyn ModelHandle>, ModelError> {
        recorder.created_with.lock().unwrap().push(params.clone());
        if recorder.fail_create.load(Ordering::SeqCst) {
            return Err(ModelError::Construction("injected create failure".into()));
        }
        Ok(RecordingModel::boxed(&recorder))
    }
}

/// Build a params map from a JSON object literal.
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
